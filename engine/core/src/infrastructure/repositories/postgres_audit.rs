// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL implementation of AuditLogRepository
//!
//! Append-only: rows in `workflow_audit_logs` are inserted once and never
//! updated or deleted. `seq` breaks ties between entries written within the
//! same timestamp.

use crate::domain::actor::ActorRole;
use crate::domain::audit::AuditLogEntry;
use crate::domain::record::RecordId;
use crate::domain::repository::{AuditLogRepository, RepositoryError};
use crate::domain::search::PageRequest;
use crate::domain::status::StatusCode;
use crate::domain::workflow::WorkflowDomain;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn deserialize_row(row: &sqlx::postgres::PgRow) -> Result<AuditLogEntry, RepositoryError> {
        let domain: String = row.try_get("domain")
            .map_err(|e| RepositoryError::Database(format!("Missing domain: {}", e)))?;
        let actor_role: String = row.try_get("actor_role")
            .map_err(|e| RepositoryError::Database(format!("Missing actor_role: {}", e)))?;
        let status_code: String = row.try_get("status_code")
            .map_err(|e| RepositoryError::Database(format!("Missing status_code: {}", e)))?;
        let created_at: DateTime<Utc> = row.try_get("created_at")
            .map_err(|e| RepositoryError::Database(format!("Missing created_at: {}", e)))?;

        Ok(AuditLogEntry {
            id: row.try_get::<Uuid, _>("id")?,
            record_id: RecordId(row.try_get::<Uuid, _>("record_id")?),
            domain: domain
                .parse::<WorkflowDomain>()
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
            status_code: StatusCode::new(status_code),
            actor_id: row.try_get("actor_id")?,
            actor_role: actor_role
                .parse::<ActorRole>()
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
            reason: row.try_get("reason")?,
            created_at,
        })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO workflow_audit_logs (
                id, record_id, domain, status_code, actor_id, actor_role, reason, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.record_id.0)
        .bind(entry.domain.slug())
        .bind(entry.status_code.as_str())
        .bind(&entry.actor_id)
        .bind(entry.actor_role.as_tag())
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        debug!(record_id = %entry.record_id, status = %entry.status_code, "Persisted audit entry");
        Ok(())
    }

    async fn list(&self, record_id: RecordId, page: PageRequest) -> Result<(Vec<AuditLogEntry>, u64), RepositoryError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM workflow_audit_logs WHERE record_id = $1")
            .bind(record_id.0)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let rows = sqlx::query(
            r#"
            SELECT id, record_id, domain, status_code, actor_id, actor_role, reason, created_at
            FROM workflow_audit_logs
            WHERE record_id = $1
            ORDER BY created_at ASC, seq ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(record_id.0)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .map(Self::deserialize_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((entries, total.max(0) as u64))
    }
}
