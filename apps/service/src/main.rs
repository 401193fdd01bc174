mod alerts;
mod cli;
mod config;
mod models;
mod monitoring;
mod store;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logger::init_tracing_with_level(cli.log_level());

    let mut config = Config::from_config(cli.config.as_deref())?;
    config.apply_env_overrides();
    config.validate()?;

    cli::dispatch(cli.command.unwrap_or(Command::Run), config).await
}
