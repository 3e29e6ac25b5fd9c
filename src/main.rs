use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use agent_sessions_core::session::status_sort_priority;
use agent_sessions_core::{init_logging, load_config, spawn_poller, ProcessBackend, SessionMonitor};

/// Watch running AI coding-assistant sessions.
#[derive(Debug, Parser)]
#[command(name = "agent-sessions", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.agent-sessions/config.json).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Session-log root (defaults to ~/.claude/projects).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Process listing backend.
    #[arg(long, global = true, value_enum)]
    backend: Option<ProcessBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print active sessions as a JSON array, most recent activity first.
    Sessions {
        /// Group active sessions first, then waiting, then idle.
        #[arg(long)]
        by_status: bool,
    },

    /// Print project directories as a JSON array, newest first.
    Projects,

    /// Scan periodically, printing one JSON line per scan.
    Watch {
        /// Seconds between scans.
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { "warn" });

    let mut config = load_config(cli.config.as_deref());
    if let Some(root) = cli.root {
        config.projects_root = Some(root);
    }
    if let Some(backend) = cli.backend {
        config.process_backend = backend;
    }

    let monitor = SessionMonitor::from_config(&config);

    match cli.command {
        Commands::Sessions { by_status } => {
            let mut sessions = monitor.get_active_sessions();
            if by_status {
                // Stable sort keeps recency order within each group
                sessions.sort_by_key(|s| status_sort_priority(&s.status));
            }
            let json = serde_json::to_string_pretty(&sessions).context("serializing sessions")?;
            println!("{json}");
        }
        Commands::Projects => {
            let projects = monitor.get_recent_projects();
            let json = serde_json::to_string_pretty(&projects).context("serializing projects")?;
            println!("{json}");
        }
        Commands::Watch { interval } => {
            if let Some(secs) = interval {
                config.poll_interval_secs = secs;
            }
            let (tx, rx) = mpsc::channel();
            let _poller = spawn_poller(Arc::new(monitor), config.poll_interval(), move |sessions| {
                let _ = tx.send(sessions);
            });

            let stdout = std::io::stdout();
            for sessions in rx {
                let line = serde_json::to_string(&sessions).context("serializing sessions")?;
                let mut out = stdout.lock();
                writeln!(out, "{line}").context("writing to stdout")?;
                out.flush().context("flushing stdout")?;
            }
        }
    }

    Ok(())
}
