// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `fleetflow migrate`: apply the embedded schema migrations.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use fleetflow_core::domain::config::ServiceConfigManifest;
use fleetflow_core::domain::repository::StorageBackend;
use fleetflow_core::infrastructure::db::{embedded_migration_count, Database};

pub async fn run(config: ServiceConfigManifest) -> Result<()> {
    config.validate().context("Configuration validation failed")?;

    let postgres = match config.storage_backend()? {
        StorageBackend::PostgreSQL(postgres) => postgres,
        StorageBackend::InMemory => {
            println!("{}", "Storage backend is 'memory'; nothing to migrate.".yellow());
            return Ok(());
        }
    };

    let database = Database::new(&postgres).await?;
    database.migrate().await?;

    info!(migrations = embedded_migration_count(), "Database schema is up to date");
    println!(
        "{}",
        format!("✓ Applied schema ({} embedded migrations)", embedded_migration_count()).green()
    );
    Ok(())
}
