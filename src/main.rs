//! # Daftar Reminder Daemon
//!
//! Runs the debt reminder scheduler: periodic sweeps over outstanding
//! obligations, notification records, best-effort live delivery.
//!
//! Usage:
//!   daftar                         # run with ~/.daftar/config.toml (or defaults)
//!   daftar --tick-secs 60          # faster sweep cadence
//!   daftar --once                  # single sweep, then exit
//!   daftar --db /tmp/daftar.db     # custom database path

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use daftar_channels::InAppBus;
use daftar_core::DaftarConfig;
use daftar_core::traits::{DebtStore, NotificationStore};
use daftar_scheduler::{Dispatcher, ReminderScheduler};
use daftar_store::SqliteDb;

#[derive(Parser)]
#[command(
    name = "daftar",
    version,
    about = "📒 Daftar — debt reminder daemon"
)]
struct Cli {
    /// Path to config file (default: ~/.daftar/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Seconds between reminder sweeps (overrides config)
    #[arg(long)]
    tick_secs: Option<u64>,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "daftar=debug,daftar_scheduler=debug,daftar_store=debug"
    } else {
        "daftar=info,daftar_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => DaftarConfig::load_from(path)?,
        None => DaftarConfig::load()?,
    };
    if let Some(db) = cli.db {
        config.store.db_path = db;
    }
    if let Some(tick) = cli.tick_secs {
        config.scheduler.tick_secs = tick;
    }

    let db = SqliteDb::open(&config.store.db_path)?;
    let debts: Arc<dyn DebtStore> = Arc::new(db.debts());
    let notifications: Arc<dyn NotificationStore> = Arc::new(db.notifications());
    let bus = Arc::new(InAppBus::new());
    let dispatcher = Dispatcher::new(bus, notifications.clone());
    let mut scheduler = ReminderScheduler::new(
        debts,
        notifications,
        dispatcher,
        Duration::from_secs(config.scheduler.tick_secs.max(1)),
    );

    if cli.once {
        let stats = scheduler.run_once().await?;
        println!(
            "📒 sweep done: {} evaluated, {} fired, {} dispatched, {} failures",
            stats.evaluated, stats.fired, stats.dispatched, stats.failures
        );
        return Ok(());
    }

    if !config.scheduler.enabled {
        tracing::warn!("scheduler disabled in config, nothing to do");
        return Ok(());
    }

    println!("📒 Daftar v{}", env!("CARGO_PKG_VERSION"));
    println!("   🗄️  Database: {}", config.store.db_path.display());
    println!("   ⏱️  Sweep every {}s", config.scheduler.tick_secs);
    println!();

    // degraded mode: keep the process alive and retry until the store comes up
    let retry = Duration::from_secs(config.scheduler.start_retry_secs.max(1));
    loop {
        match scheduler.start().await {
            Ok(()) => break,
            Err(e) => {
                tracing::warn!(error = %e, retry_secs = retry.as_secs(), "scheduler start failed, retrying");
                tokio::time::sleep(retry).await;
            }
        }
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    scheduler.stop().await;

    Ok(())
}
