use anyhow::Result;

use crate::commands::CommandReport;
use crate::tracker::config::load_config;
use crate::tracker::paths::resolve_paths;
use crate::tracker::queue::build_work_queue;

#[derive(Debug, Clone, Default)]
pub struct QueueOptions {
    pub limit: Option<usize>,
    pub json: bool,
}

pub fn run(opts: &QueueOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("queue");
    let paths = resolve_paths()?;
    let cfg = load_config()?;

    let mut entries = build_work_queue(&paths, &cfg.evidence.noise_tokens)?;
    let total = entries.len();
    if let Some(limit) = opts.limit {
        entries.truncate(limit);
    }

    report.detail(format!("queue.total={total}"));
    report.detail(format!("queue.listed={}", entries.len()));

    for entry in &entries {
        if opts.json {
            report.detail(serde_json::to_string(entry)?);
        } else {
            report.detail(format!(
                "entry path={} title={} asin={} enqueued_at={}",
                entry.item.path.display(),
                entry.item.title,
                entry.item.asin.as_deref().unwrap_or("-"),
                entry.enqueued_at
            ));
        }
    }

    Ok(report)
}
