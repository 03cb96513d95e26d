// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `fleetflow serve`: HTTP daemon

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use fleetflow_core::application::repository_factory::connect_stores;
use fleetflow_core::application::{EngineSettings, StandardWorkflowService};
use fleetflow_core::domain::config::ServiceConfigManifest;
use fleetflow_core::infrastructure::uploads::LocalUploadStore;
use fleetflow_core::presentation::api::{app, AppState};

pub async fn run(config: ServiceConfigManifest, port_override: Option<u16>) -> Result<()> {
    config.validate().context("Configuration validation failed")?;
    info!(name = %config.metadata.name, backend = ?config.spec.storage.backend, "Configuration loaded");

    let metrics = &config.spec.observability.metrics;
    if metrics.enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], metrics.port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics listening on {}", addr);
    }

    let backend = config.storage_backend()?;
    let stores = connect_stores(&backend).await.context("Failed to initialize storage")?;

    let settings = EngineSettings::from(&config.spec.workflow);
    let service = StandardWorkflowService::new(stores.records, stores.audit_log, stores.references, settings);

    let uploads = LocalUploadStore::new(&config.spec.uploads);
    tokio::fs::create_dir_all(uploads.directory())
        .await
        .with_context(|| format!("Failed to create upload directory {:?}", uploads.directory()))?;

    let router = app(AppState {
        workflow_service: Arc::new(service),
        uploads,
        paging: settings.paging,
        start_time: Instant::now(),
    });

    let network = &config.spec.network;
    let addr = format!("{}:{}", network.bind_address, port_override.unwrap_or(network.port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("FleetFlow listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("FleetFlow shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
