// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use fleetflow_core::domain::config::{ServiceConfigManifest, StorageKind};

const ANNOTATED_TEMPLATE: &str = include_str!("../../templates/config-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./fleetflow-config.yaml)
        #[arg(short, long, default_value = "./fleetflow-config.yaml")]
        output: PathBuf,

        /// Include comments and examples
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(&output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. FLEETFLOW_CONFIG_PATH: {}",
            std::env::var("FLEETFLOW_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./fleetflow-config.yaml");
        println!("  4. ~/.fleetflow/config.yaml");
        println!("  5. /etc/fleetflow/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();
    println!("  Name: {}", config.metadata.name);

    let spec = &config.spec;
    println!("{}", "Storage:".bold());
    match spec.storage.backend {
        StorageKind::Memory => println!("  Backend: memory {}", "(data is lost on restart)".yellow()),
        StorageKind::Postgres => {
            println!("  Backend: postgres");
            println!("  Database URL: {}", redact(spec.storage.database_url.as_deref().unwrap_or("(none)")));
            println!("  Max connections: {}", spec.storage.max_connections);
        }
    }
    println!("{}", "Network:".bold());
    println!("  Listen: {}:{}", spec.network.bind_address, spec.network.port);
    println!("{}", "Uploads:".bold());
    println!("  Directory: {}", spec.uploads.directory);
    println!("  Public base URL: {}", spec.uploads.public_base_url);
    println!("  Max bytes: {}", spec.uploads.max_bytes);
    println!("{}", "Workflow:".bold());
    println!("  Precondition detail: {}", spec.workflow.precondition_detail);
    println!("  Page size: {} (max {})", spec.workflow.default_page_size, spec.workflow.max_page_size);
    println!("{}", "Observability:".bold());
    println!("  Logging: {} ({})", spec.observability.logging.level, spec.observability.logging.format);
    if spec.observability.metrics.enabled {
        println!("  Metrics: enabled on port {}", spec.observability.metrics.port);
    } else {
        println!("  Metrics: {}", "disabled".dimmed());
    }

    Ok(())
}

/// Hide the password of a connection URL; `env:` references are shown as is.
fn redact(url: &str) -> String {
    if url.starts_with("env:") {
        return url.to_string();
    }
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &url[scheme_end + 3..at];
            match credentials.find(':') {
                Some(colon) => format!("{}{}:****{}", &url[..scheme_end + 3], &credentials[..colon], &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;
    config.storage_backend().context("Storage configuration is not usable")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: &Path, with_examples: bool) -> Result<()> {
    if with_examples {
        std::fs::write(output, ANNOTATED_TEMPLATE).with_context(|| format!("Failed to write config to {:?}", output))?;
    } else {
        ServiceConfigManifest::default()
            .to_yaml_file(output)
            .with_context(|| format!("Failed to write config to {:?}", output))?;
    }

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_password_only() {
        assert_eq!(redact("postgres://fleet:secret@db:5432/fleet"), "postgres://fleet:****@db:5432/fleet");
        assert_eq!(redact("postgres://db/fleet"), "postgres://db/fleet");
        assert_eq!(redact("env:DATABASE_URL"), "env:DATABASE_URL");
    }

    #[test]
    fn generated_configs_load_and_validate() {
        let dir = tempfile::tempdir().unwrap();

        let minimal = dir.path().join("minimal.yaml");
        generate(&minimal, false).unwrap();
        ServiceConfigManifest::from_yaml_file(&minimal).unwrap().validate().unwrap();

        let annotated = dir.path().join("annotated.yaml");
        generate(&annotated, true).unwrap();
        let config = ServiceConfigManifest::from_yaml_file(&annotated).unwrap();
        config.validate().unwrap();
        assert_eq!(config.spec.uploads.public_base_url, "/uploads");
        assert_eq!(config.metadata.labels.unwrap().get("environment").map(String::as_str), Some("development"));
    }
}
