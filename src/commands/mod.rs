pub mod health;
pub mod queue;
pub mod rebuild;
pub mod record;
pub mod signal;
pub mod status;
pub mod watch;

use serde::Serialize;

use crate::error::TrackerErrorCode;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    #[serde(skip)]
    pub code: Option<TrackerErrorCode>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
            code: None,
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    /// Attach an operator-facing code without marking the report failed;
    /// used for expected conditions (lock contention, degraded evidence)
    /// that still need a distinguishing exit code.
    pub fn note_code(&mut self, code: TrackerErrorCode) {
        self.code = Some(code);
        self.detail(format!("code={}", code.as_str()));
    }

    /// Attach a code and mark the report failed; used for fatal outcomes.
    pub fn fail_with(&mut self, code: TrackerErrorCode, text: impl Into<String>) {
        self.code = Some(code);
        self.issue(format!("{} ({})", text.into(), code.as_str()));
    }

    pub fn exit_code(&self) -> i32 {
        match self.code {
            Some(code) => code.exit_code(),
            None if self.ok => 0,
            None => 1,
        }
    }
}
