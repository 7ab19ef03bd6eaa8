#![allow(dead_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("atomic index replace failed: {0}")]
    ReplaceFailed(String),
    #[error("rebuild would shrink the index ({prior} -> {merged}); prior index kept")]
    Regression { prior: usize, merged: usize },
    #[error("runtime directory unavailable: {0}")]
    RuntimeDirUnavailable(String),
}

/// Operator-facing error codes. Each maps to a stable process exit code so
/// wrapper scripts can branch on contention vs. degraded vs. fatal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerErrorCode {
    E301LockBusy,
    E302EvidenceDegraded,
    E303ReplaceFailed,
    E304Regression,
    E305RuntimeDirUnavailable,
}

impl TrackerErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E301LockBusy => "E301_LOCK_BUSY",
            Self::E302EvidenceDegraded => "E302_EVIDENCE_DEGRADED",
            Self::E303ReplaceFailed => "E303_REPLACE_FAILED",
            Self::E304Regression => "E304_REGRESSION",
            Self::E305RuntimeDirUnavailable => "E305_RUNTIME_DIR_UNAVAILABLE",
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::E301LockBusy => 3,
            Self::E302EvidenceDegraded => 4,
            Self::E303ReplaceFailed => 5,
            Self::E304Regression => 6,
            Self::E305RuntimeDirUnavailable => 7,
        }
    }

    /// Lock contention and degraded evidence are expected operational
    /// states; the caller retries on its own schedule.
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::E301LockBusy | Self::E302EvidenceDegraded)
    }
}

#[cfg(test)]
mod tests {
    use super::TrackerErrorCode;

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let codes = [
            TrackerErrorCode::E301LockBusy,
            TrackerErrorCode::E302EvidenceDegraded,
            TrackerErrorCode::E303ReplaceFailed,
            TrackerErrorCode::E304Regression,
            TrackerErrorCode::E305RuntimeDirUnavailable,
        ];
        let mut seen = std::collections::BTreeSet::new();
        for code in codes {
            assert!(code.exit_code() > 0);
            assert!(seen.insert(code.exit_code()));
        }
    }

    #[test]
    fn contention_and_degraded_are_non_fatal() {
        assert!(!TrackerErrorCode::E301LockBusy.is_fatal());
        assert!(!TrackerErrorCode::E302EvidenceDegraded.is_fatal());
        assert!(TrackerErrorCode::E304Regression.is_fatal());
    }
}
