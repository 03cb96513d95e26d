// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the workflow engine, one per aggregate:
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `WorkflowRecordRepository` | `WorkflowRecord` | `InMemoryWorkflowRecordRepository`, `PostgresWorkflowRecordRepository` |
//! | `AuditLogRepository` | `AuditLogEntry` | `InMemoryAuditLogRepository`, `PostgresAuditLogRepository` |
//!
//! ## Conditional updates
//!
//! Every mutating call is conditional on the status the caller observed
//! (`UPDATE ... WHERE id = $1 AND status = $2 AND NOT is_deleted`) and returns
//! the number of affected rows. Zero rows means the record changed underneath
//! the caller; the engine turns that into a `Conflict`. Repositories never
//! decide whether a transition is legal; they only enforce the condition.
//!
//! Concrete implementations are selected at startup from the configured
//! [`StorageBackend`] (see `crate::application::repository_factory`).

use async_trait::async_trait;

use crate::domain::audit::AuditLogEntry;
use crate::domain::record::{RecordId, TransitionUpdate, WorkflowRecord};
use crate::domain::scope::Scope;
use crate::domain::search::{PageRequest, RecordFilter, RecordSort};
use crate::domain::status::StatusCode;
use crate::domain::workflow::WorkflowDomain;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[async_trait]
pub trait WorkflowRecordRepository: Send + Sync {
    /// Persist a freshly submitted record.
    async fn insert(&self, record: &WorkflowRecord) -> Result<(), RepositoryError>;

    /// Fetch by id regardless of scope, status or soft-delete flag.
    async fn find_by_id(&self, id: RecordId) -> Result<Option<WorkflowRecord>, RepositoryError>;

    /// Fetch a live record only if it is inside `scope` and its status is one
    /// of `statuses`. An empty `statuses` slice means any status.
    async fn find_guarded(
        &self,
        domain: WorkflowDomain,
        id: RecordId,
        scope: &Scope,
        statuses: &[&str],
    ) -> Result<Option<WorkflowRecord>, RepositoryError>;

    /// Conditional single-row transition update. Returns affected rows.
    async fn apply_transition(&self, update: &TransitionUpdate) -> Result<u64, RepositoryError>;

    /// Overwrite the editable detail fields of `record` while its status is
    /// still `expected_status`. Returns affected rows.
    async fn update_details(&self, record: &WorkflowRecord, expected_status: &StatusCode) -> Result<u64, RepositoryError>;

    /// Set the soft-delete flag while the status is still `expected_status`.
    async fn soft_delete(&self, id: RecordId, expected_status: &StatusCode, actor_id: &str) -> Result<u64, RepositoryError>;

    /// One sorted page of records matching `filter`.
    async fn search(&self, filter: &RecordFilter, sort: RecordSort, page: PageRequest) -> Result<Vec<WorkflowRecord>, RepositoryError>;

    /// Number of records matching `filter`.
    async fn count(&self, filter: &RecordFilter) -> Result<u64, RepositoryError>;

    /// Per-status counts of records matching `filter`. Absent codes are omitted.
    async fn count_by_status(&self, filter: &RecordFilter) -> Result<Vec<(StatusCode, u64)>, RepositoryError>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one entry. Entries are never updated or removed.
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError>;

    /// Entries for a record ascending by timestamp, plus the total count.
    async fn list(&self, record_id: RecordId, page: PageRequest) -> Result<(Vec<AuditLogEntry>, u64), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
