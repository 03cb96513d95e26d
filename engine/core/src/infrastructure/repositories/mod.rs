// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve workflow records and audit entries
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresWorkflowRecordRepository** - Record state, snapshots, search
//! - **PostgresAuditLogRepository** - Append-only action log
//!
//! ## In-Memory Repositories
//!
//! Lightweight implementations for tests and single-process development.
//! The record repository can share an [`InMemoryReferenceDirectory`] so that
//! plate searches see assigned vehicles, as the SQL backend does.
//! Conditional updates take the write lock for the whole check-and-apply, so
//! they give the same "exactly one winner" guarantee as the SQL backend.

pub mod postgres_audit;
pub mod postgres_record;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::audit::AuditLogEntry;
use crate::domain::record::{RecordId, TransitionUpdate, WorkflowRecord};
use crate::domain::repository::{AuditLogRepository, RepositoryError, WorkflowRecordRepository};
use crate::domain::scope::Scope;
use crate::domain::search::{PageRequest, RecordFilter, RecordSort};
use crate::domain::status::StatusCode;
use crate::domain::workflow::WorkflowDomain;
use crate::infrastructure::reference::InMemoryReferenceDirectory;

#[derive(Clone, Default)]
pub struct InMemoryWorkflowRecordRepository {
    records: Arc<RwLock<HashMap<RecordId, WorkflowRecord>>>,
    directory: Option<InMemoryReferenceDirectory>,
}

impl InMemoryWorkflowRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository whose plate search resolves `vehicle_id` through `directory`.
    pub fn with_reference_directory(directory: InMemoryReferenceDirectory) -> Self {
        Self {
            records: Arc::default(),
            directory: Some(directory),
        }
    }

    fn matches(&self, filter: &RecordFilter, record: &WorkflowRecord) -> bool {
        let assigned = self
            .directory
            .as_ref()
            .zip(record.vehicle_id.as_deref())
            .and_then(|(directory, vehicle_id)| directory.vehicle_plate(vehicle_id));
        filter.matches_with_plate(record, assigned.as_deref().or(record.vehicle_plate.as_deref()))
    }

    fn live_in_status<'a>(
        records: &'a mut HashMap<RecordId, WorkflowRecord>,
        id: RecordId,
        expected_status: &StatusCode,
    ) -> Option<&'a mut WorkflowRecord> {
        records
            .get_mut(&id)
            .filter(|record| !record.is_deleted && &record.status == expected_status)
    }
}

#[async_trait]
impl WorkflowRecordRepository for InMemoryWorkflowRecordRepository {
    async fn insert(&self, record: &WorkflowRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(RepositoryError::Database(format!("duplicate record id {}", record.id)));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<WorkflowRecord>, RepositoryError> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_guarded(
        &self,
        domain: WorkflowDomain,
        id: RecordId,
        scope: &Scope,
        statuses: &[&str],
    ) -> Result<Option<WorkflowRecord>, RepositoryError> {
        let records = self.records.read();
        Ok(records
            .get(&id)
            .filter(|record| {
                record.domain == domain
                    && !record.is_deleted
                    && scope.matches(record)
                    && (statuses.is_empty() || statuses.contains(&record.status.as_str()))
            })
            .cloned())
    }

    async fn apply_transition(&self, update: &TransitionUpdate) -> Result<u64, RepositoryError> {
        let mut records = self.records.write();
        match records.get_mut(&update.record_id) {
            Some(record) if update.applies_to(record) => {
                update.apply(record);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn update_details(&self, record: &WorkflowRecord, expected_status: &StatusCode) -> Result<u64, RepositoryError> {
        let mut records = self.records.write();
        let Some(stored) = Self::live_in_status(&mut records, record.id, expected_status) else {
            return Ok(0);
        };
        stored.work_place = record.work_place.clone();
        stored.purpose = record.purpose.clone();
        stored.start_at = record.start_at;
        stored.end_at = record.end_at;
        stored.vehicle_plate = record.vehicle_plate.clone();
        stored.updated_at = record.updated_at;
        stored.updated_by = record.updated_by.clone();
        Ok(1)
    }

    async fn soft_delete(&self, id: RecordId, expected_status: &StatusCode, actor_id: &str) -> Result<u64, RepositoryError> {
        let mut records = self.records.write();
        let Some(stored) = Self::live_in_status(&mut records, id, expected_status) else {
            return Ok(0);
        };
        stored.is_deleted = true;
        stored.updated_at = Utc::now();
        stored.updated_by = actor_id.to_string();
        Ok(1)
    }

    async fn search(&self, filter: &RecordFilter, sort: RecordSort, page: PageRequest) -> Result<Vec<WorkflowRecord>, RepositoryError> {
        let records = self.records.read();
        let mut matching: Vec<&WorkflowRecord> = records.values().filter(|r| self.matches(filter, r)).collect();
        matching.sort_by(|a, b| sort.compare(a, b));
        Ok(matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64, RepositoryError> {
        let records = self.records.read();
        Ok(records.values().filter(|r| self.matches(filter, r)).count() as u64)
    }

    async fn count_by_status(&self, filter: &RecordFilter) -> Result<Vec<(StatusCode, u64)>, RepositoryError> {
        let records = self.records.read();
        let mut counts: BTreeMap<StatusCode, u64> = BTreeMap::new();
        for record in records.values().filter(|r| self.matches(filter, r)) {
            *counts.entry(record.status.clone()).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAuditLogRepository {
    entries: Arc<RwLock<Vec<AuditLogEntry>>>,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn list(&self, record_id: RecordId, page: PageRequest) -> Result<(Vec<AuditLogEntry>, u64), RepositoryError> {
        let entries = self.entries.read();
        // Append order already breaks timestamp ties.
        let mut matching: Vec<&AuditLogEntry> = entries.iter().filter(|e| e.record_id == record_id).collect();
        matching.sort_by_key(|e| e.created_at);
        let total = matching.len() as u64;
        let page_entries = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok((page_entries, total))
    }
}
