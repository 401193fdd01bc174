use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use rand::Rng;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};

use crate::alerts;
use crate::config::Config;
use crate::models::{CHECK_ID_LEN, CheckRecord};
use crate::monitoring::{CheckValidator, HttpChecker, MonitoringExecutor, MonitoringScheduler};
use crate::store::{CHECKS, FileStore, RecordStore};

/// Synthetic uptime monitoring: probe registered checks and alert their
/// owners when a check goes up or down.
#[derive(Debug, Parser)]
#[command(name = "pingwatch", version, about)]
pub struct Cli {
    /// Path to the config file (defaults to ~/.config/pingwatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monitoring engine until interrupted (default)
    Run,
    /// Run a single cycle and print its summary
    Once,
    /// Register a new check
    Add(AddArgs),
    /// Show every registered check and its last known state
    List,
    /// Unregister a check
    Remove {
        /// Id printed by `add`
        id: String,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Owner phone number alerts are sent to
    #[arg(long)]
    pub phone: String,

    /// http or https
    #[arg(long, default_value = "https")]
    pub protocol: String,

    /// Host and path to probe, without the scheme
    #[arg(long)]
    pub url: String,

    /// get, post, put or delete
    #[arg(long, default_value = "get")]
    pub method: String,

    /// Status codes considered healthy
    #[arg(long = "success-code", value_delimiter = ',', required = true)]
    pub success_codes: Vec<u16>,

    /// Seconds to wait for a response
    #[arg(long, default_value_t = 3)]
    pub timeout: u64,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

pub async fn dispatch(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Run => run(config).await,
        Command::Once => once(config).await,
        Command::Add(args) => add(config, args).await,
        Command::List => list(config).await,
        Command::Remove { id } => remove(config, &id).await,
        Command::Config => {
            print!("{config}");
            Ok(())
        }
    }
}

fn build_executor(config: &Config) -> Result<Arc<MonitoringExecutor>> {
    let store = Arc::new(FileStore::new(&config.storage.data_dir));
    let alerts = alerts::build_transport(&config.alerts).context("failed to set up alerts")?;
    let checker = Arc::new(HttpChecker::new().context("failed to build HTTP client")?);

    Ok(Arc::new(MonitoringExecutor::new(store, alerts, checker, &config.engine)))
}

async fn run(config: Config) -> Result<()> {
    let executor = build_executor(&config)?;
    info!(
        data_dir = %config.storage.data_dir.display(),
        alerts = %config.alerts.provider,
        "Monitoring engine ready"
    );

    let scheduler =
        MonitoringScheduler::new(executor, Duration::from_secs(config.engine.interval_seconds));
    let handle = scheduler.start();

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("Interrupted, stopping scheduler");
    handle.abort();
    Ok(())
}

async fn once(config: Config) -> Result<()> {
    let report = build_executor(&config)?.run_cycle().await;
    println!("{report}");
    Ok(())
}

/// Random lowercase alphanumeric check id.
fn generate_id() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..CHECK_ID_LEN).map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char).collect()
}

async fn add(config: Config, args: AddArgs) -> Result<()> {
    let store = FileStore::new(&config.storage.data_dir);
    let validator = CheckValidator::new(config.engine.max_timeout_seconds);

    let raw = json!({
        "id": generate_id(),
        "userPhone": args.phone,
        "protocol": args.protocol,
        "url": args.url,
        "method": args.method,
        "successCodes": args.success_codes,
        "timeoutSeconds": args.timeout,
    });
    let check = validator.validate_new(&raw).context("check rejected")?;

    store.create(CHECKS, &check.id, &serde_json::to_value(&check)?).await?;
    println!("{}", check.id);
    Ok(())
}

fn describe(check: &CheckRecord) -> String {
    let last = check
        .last_checked_at
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());

    format!(
        "{}  {:<6} {}://{}  {}  last checked {}",
        check.id,
        check.http_method.as_str().to_uppercase(),
        check.protocol,
        check.url,
        check.state,
        last
    )
}

async fn list(config: Config) -> Result<()> {
    let store = FileStore::new(&config.storage.data_dir);
    let validator = CheckValidator::new(config.engine.max_timeout_seconds);

    for id in store.list(CHECKS).await? {
        match store.read(CHECKS, &id).await {
            Ok(raw) => match validator.validate(&raw) {
                Ok(check) => println!("{}", describe(&check)),
                Err(e) => println!("{id}  invalid: {e}"),
            },
            Err(e) => warn!(check_id = %id, error = %e, "Could not read check"),
        }
    }
    Ok(())
}

async fn remove(config: Config, id: &str) -> Result<()> {
    FileStore::new(&config.storage.data_dir)
        .delete(CHECKS, id)
        .await
        .with_context(|| format!("failed to remove check {id}"))?;
    info!(check_id = id, "Check removed");
    Ok(())
}
