// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on the storage backend
//! configuration, keeping the domain layer free of infrastructure types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wire repository trait objects for the configured backend

use std::sync::Arc;
use sqlx::PgPool;

use crate::domain::reference::ReferenceDirectory;
use crate::domain::repository::{AuditLogRepository, StorageBackend, WorkflowRecordRepository};
use crate::infrastructure::db::Database;
use crate::infrastructure::reference::{InMemoryReferenceDirectory, PostgresReferenceDirectory};
use crate::infrastructure::repositories::postgres_audit::PostgresAuditLogRepository;
use crate::infrastructure::repositories::postgres_record::PostgresWorkflowRecordRepository;
use crate::infrastructure::repositories::{InMemoryAuditLogRepository, InMemoryWorkflowRecordRepository};

/// Repository handles for one running service.
#[derive(Clone)]
pub struct WorkflowStores {
    pub records: Arc<dyn WorkflowRecordRepository>,
    pub audit_log: Arc<dyn AuditLogRepository>,
    pub references: Arc<dyn ReferenceDirectory>,
}

/// Creates a WorkflowRecordRepository implementation based on the configured backend
pub fn create_record_repository(backend: &StorageBackend, pool: Option<PgPool>) -> anyhow::Result<Arc<dyn WorkflowRecordRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryWorkflowRecordRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresWorkflowRecordRepository::new(require_pool(pool)?)),
    })
}

/// Creates an AuditLogRepository implementation based on the configured backend
pub fn create_audit_log_repository(backend: &StorageBackend, pool: Option<PgPool>) -> anyhow::Result<Arc<dyn AuditLogRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryAuditLogRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresAuditLogRepository::new(require_pool(pool)?)),
    })
}

/// Creates a ReferenceDirectory implementation based on the configured backend
pub fn create_reference_directory(backend: &StorageBackend, pool: Option<PgPool>) -> anyhow::Result<Arc<dyn ReferenceDirectory>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryReferenceDirectory::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresReferenceDirectory::new(require_pool(pool)?)),
    })
}

/// Connect (and migrate, for PostgreSQL) and build every store.
///
/// The in-memory record repository shares the reference directory so plate
/// searches resolve assigned vehicles.
pub async fn connect_stores(backend: &StorageBackend) -> anyhow::Result<WorkflowStores> {
    match backend {
        StorageBackend::InMemory => {
            let directory = InMemoryReferenceDirectory::new();
            Ok(WorkflowStores {
                records: Arc::new(InMemoryWorkflowRecordRepository::with_reference_directory(directory.clone())),
                audit_log: Arc::new(InMemoryAuditLogRepository::new()),
                references: Arc::new(directory),
            })
        }
        StorageBackend::PostgreSQL(config) => {
            let database = Database::new(config).await?;
            database.migrate().await?;
            let pool = database.get_pool().clone();
            Ok(WorkflowStores {
                records: create_record_repository(backend, Some(pool.clone()))?,
                audit_log: create_audit_log_repository(backend, Some(pool.clone()))?,
                references: create_reference_directory(backend, Some(pool))?,
            })
        }
    }
}

fn require_pool(pool: Option<PgPool>) -> anyhow::Result<PgPool> {
    pool.ok_or_else(|| anyhow::anyhow!("PostgreSQL backend selected but no connection pool was provided"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_backend_needs_no_pool() {
        let stores = connect_stores(&StorageBackend::InMemory).await.unwrap();
        assert!(stores.records.find_by_id(crate::domain::record::RecordId::new()).await.unwrap().is_none());
    }

    #[test]
    fn postgres_backend_without_pool_is_rejected() {
        let backend = StorageBackend::PostgreSQL(crate::domain::repository::PostgresConfig {
            connection_string: "postgres://localhost/fleet".into(),
            max_connections: 1,
        });
        assert!(create_record_repository(&backend, None).is_err());
    }
}
