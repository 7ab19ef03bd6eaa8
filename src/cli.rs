use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "ABTRACK",
    about = "Audiobook conversion pipeline bookkeeping: rebuild, record, queue, and cross-daemon signaling",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild the converted index from all evidence sources
    Rebuild {
        /// Compute the merge and report counts without replacing the index
        #[arg(long)]
        dry_run: bool,
    },
    /// Record one newly converted ASIN in the index
    Record {
        /// Identifier of the converted item (ten uppercase alphanumerics)
        asin: String,
    },
    /// List pending conversions by diffing the source scan against the index
    Queue {
        /// Maximum number of entries to list
        #[arg(long)]
        limit: Option<usize>,
        /// Emit entries as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Run the periodic rebuilder poll cycle
    Watch {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
        /// Poll forever at the configured interval
        #[arg(long)]
        daemon: bool,
    },
    /// Emit or drain an ephemeral trigger signal
    Signal {
        /// library-changed, rebuild-requested or converted-added
        kind: String,
        /// Consume pending markers of this kind instead of emitting one
        #[arg(long)]
        drain: bool,
    },
    /// Report index, daemon state and pending signals
    Status,
    /// Provision runtime dirs and check paths, locks and collaborators
    Health,
}

fn print_report(report: &CommandReport) {
    for line in &report.details {
        println!("{line}");
    }
    for line in &report.issues {
        eprintln!("issue: {line}");
    }
}

pub fn run() -> Result<i32> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Rebuild { dry_run } => {
            commands::rebuild::run(&commands::rebuild::RebuildOptions { dry_run })?
        }
        Command::Record { asin } => {
            commands::record::run(&commands::record::RecordOptions { asin })?
        }
        Command::Queue { limit, json } => {
            commands::queue::run(&commands::queue::QueueOptions { limit, json })?
        }
        Command::Watch { once, daemon } => {
            commands::watch::run(&commands::watch::WatchOptions { once, daemon })?
        }
        Command::Signal { kind, drain } => {
            commands::signal::run(&commands::signal::SignalOptions { kind, drain })?
        }
        Command::Status => commands::status::run()?,
        Command::Health => commands::health::run()?,
    };

    print_report(&report);
    Ok(report.exit_code())
}
