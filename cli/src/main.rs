// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # FleetFlow CLI
//!
//! The `fleetflow` binary runs the workflow HTTP service and its
//! maintenance tasks.
//!
//! ## Commands
//!
//! - `fleetflow serve` - Run the HTTP API until Ctrl+C / SIGTERM
//! - `fleetflow migrate` - Apply embedded SQL migrations to PostgreSQL
//! - `fleetflow statuses <domain>` - Print a domain's status registry
//! - `fleetflow config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use fleetflow_core::domain::config::ServiceConfigManifest;

mod commands;

use commands::ConfigCommand;

/// FleetFlow - fleet booking and driver license approval workflows
#[derive(Parser)]
#[command(name = "fleetflow")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "FLEETFLOW_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides spec.observability.logging.level)
    #[arg(long, global = true, env = "FLEETFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format: text or json (overrides spec.observability.logging.format)
    #[arg(long, global = true, env = "FLEETFLOW_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    #[command(name = "serve")]
    Serve {
        /// Override spec.network.port
        #[arg(long, env = "FLEETFLOW_PORT")]
        port: Option<u16>,
    },

    /// Apply database migrations
    #[command(name = "migrate")]
    Migrate,

    /// Print the status registry of a workflow domain
    #[command(name = "statuses")]
    Statuses {
        /// booking or license-annual
        domain: String,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Config discovery logs through a scoped subscriber built from the CLI
    // flags; the process-wide one needs the config's logging section.
    let bootstrap = build_subscriber(
        cli.log_level.as_deref().unwrap_or("info"),
        cli.log_format.as_deref().unwrap_or("text"),
        std::io::stdout,
    )?;
    let loaded = load_config(cli.config.clone(), bootstrap);

    let logging = loaded
        .as_ref()
        .map(|c| c.spec.observability.logging.clone())
        .unwrap_or_default();
    build_subscriber(
        cli.log_level.as_deref().unwrap_or(&logging.level),
        cli.log_format.as_deref().unwrap_or(&logging.format),
        std::io::stdout,
    )?
    .try_init()
    .context("Failed to install log subscriber")?;

    match cli.command {
        Some(Commands::Serve { port }) => commands::serve::run(loaded?, port).await,
        Some(Commands::Migrate) => commands::migrate::run(loaded?).await,
        Some(Commands::Statuses { domain }) => commands::statuses::run(&domain),
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

type BoxedSubscriber = Box<dyn tracing::Subscriber + Send + Sync>;

/// Build the tracing subscriber for a level directive and output format.
fn build_subscriber<W>(level: &str, format: &str, writer: W) -> Result<BoxedSubscriber>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        Ok(Box::new(builder.json().finish()))
    } else {
        Ok(Box::new(builder.compact().finish()))
    }
}

/// Load the configuration with `subscriber` receiving its log events.
fn load_config(path: Option<PathBuf>, subscriber: BoxedSubscriber) -> Result<ServiceConfigManifest> {
    tracing::subscriber::with_default(subscriber, || ServiceConfigManifest::load_or_default(path))
        .context("Failed to load configuration")
}
