use anyhow::Context;
use clap::{Parser, Subcommand};
use loam_engine::Identity;
use loam_engine::config::{ConfigLoader, LoamConfig};
use loam_engine::retention::RetentionPurger;
use loam_engine::session::PersistenceHooks;
use loam_vfs::{EntryKind, MemoryFs};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loam", version, about = "Per-identity command journals for ephemeral shells")]
struct Args {
    /// Config file (defaults to ./loam.yaml, then ~/.loam/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Journal an identity's latest session from the activity log
    Record {
        #[arg(long)]
        identity: String,
        /// Activity log to scan instead of the configured one
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Replay an identity's journal into a fresh in-memory filesystem
    Replay {
        #[arg(long)]
        identity: String,
    },
    /// Show or clear an identity's command history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Delete journal and history files past the retention window
    Purge {
        #[arg(long)]
        max_age_days: Option<u64>,
    },
    /// Print the effective configuration
    ShowConfig,
}

#[derive(Subcommand)]
enum HistoryAction {
    Show {
        #[arg(long)]
        identity: String,
    },
    Clear {
        #[arg(long)]
        identity: String,
    },
}

fn identity(raw: &str) -> anyhow::Result<Identity> {
    Identity::new(raw).with_context(|| format!("invalid identity '{}'", raw))
}

async fn record(mut config: LoamConfig, raw: &str, log: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(log) = log {
        config.activity_log.path = log;
    }
    let id = identity(raw)?;
    let hooks = PersistenceHooks::new(&config);
    let written = hooks.on_disconnect(&id).await;
    println!("{} new journal entries for {}", written, id);
    Ok(())
}

async fn replay(config: LoamConfig, raw: &str) -> anyhow::Result<()> {
    let id = identity(raw)?;
    let hooks = PersistenceHooks::new(&config);
    let mut fs = MemoryFs::new(hooks.replayer().home());
    let report = hooks.on_connect(&id, &mut fs).await;

    for (path, stat) in fs.tree() {
        let marker = match stat.kind {
            EntryKind::Directory => "d",
            EntryKind::File => "-",
        };
        println!("{} {} {}", marker, stat.mtime.format("%Y-%m-%d %H:%M"), path);
    }
    println!();
    println!(
        "lines={} executed={} failed={} skipped={} ignored={} returned_home={}",
        report.lines,
        report.executed,
        report.failed,
        report.skipped,
        report.ignored,
        report.returned_home
    );
    Ok(())
}

fn history(config: LoamConfig, action: HistoryAction) -> anyhow::Result<()> {
    let hooks = PersistenceHooks::new(&config);
    match action {
        HistoryAction::Show { identity: raw } => {
            for line in hooks.history().read_all(&identity(&raw)?) {
                println!("{}", line);
            }
        }
        HistoryAction::Clear { identity: raw } => {
            hooks.history().clear(&identity(&raw)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries command output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ConfigLoader::load(args.config.as_deref())
        .await
        .context("failed to load configuration")?;

    match args.command {
        Command::Record { identity, log } => record(config, &identity, log).await?,
        Command::Replay { identity } => replay(config, &identity).await?,
        Command::History { action } => history(config, action)?,
        Command::Purge { max_age_days } => {
            let days = max_age_days.unwrap_or(config.retention.max_age_days);
            let removed = RetentionPurger::new(days).purge(&config.storage.dir);
            info!(removed = removed.len(), "purge finished");
            for path in removed {
                println!("removed {}", path.display());
            }
        }
        Command::ShowConfig => {
            print!("{}", serde_yaml::to_string(&config)?);
        }
    }
    Ok(())
}
