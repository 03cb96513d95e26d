// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL Workflow Record Repository
//!
//! # Schema
//!
//! The `workflow_records` table stores one row per record of every domain:
//! - Identity and domain (`id`, `domain`, `request_no`)
//! - Current `status` and the `is_deleted` flag
//! - Requester snapshot (JSONB) with `requester_id` / `requester_name`
//!   denormalised for scoping and search
//! - Transition snapshots (`stamps`, JSONB keyed by slot) and `attachments`
//!
//! # Conditional updates
//!
//! Transition, revise and soft-delete statements all carry
//! `AND status = $observed AND NOT is_deleted`; callers compare
//! `rows_affected()` to detect a lost race.
//!
//! Listing and counting share one filter renderer built on
//! `sqlx::QueryBuilder`, so the page, the total and the per-status summary
//! always see the same predicate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

use crate::domain::actor::ActorSnapshot;
use crate::domain::record::{RecordId, TransitionUpdate, WorkflowRecord};
use crate::domain::repository::{RepositoryError, WorkflowRecordRepository};
use crate::domain::scope::Scope;
use crate::domain::search::{PageRequest, RecordFilter, RecordSort};
use crate::domain::status::StatusCode;
use crate::domain::workflow::{SortDirection, WorkflowDomain};

const RECORD_COLUMNS: &str = "id, domain, request_no, status, requester, department_id, carpool_id, \
     driver_id, vehicle_id, vehicle_plate, work_place, purpose, start_at, end_at, stamps, attachments, \
     created_at, created_by, updated_at, updated_by, is_deleted";

pub struct PostgresWorkflowRecordRepository {
    pool: PgPool,
}

impl PostgresWorkflowRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &PgRow) -> Result<WorkflowRecord, RepositoryError> {
        let domain_slug: String = row.try_get("domain")?;
        let domain = domain_slug
            .parse::<WorkflowDomain>()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let requester: ActorSnapshot = serde_json::from_value(row.try_get("requester")?)?;
        let stamps = serde_json::from_value(row.try_get("stamps")?)?;
        let attachments = serde_json::from_value(row.try_get("attachments")?)?;

        Ok(WorkflowRecord {
            id: RecordId(row.try_get::<Uuid, _>("id")?),
            domain,
            request_no: row.try_get("request_no")?,
            status: StatusCode::new(row.try_get::<String, _>("status")?),
            requester,
            department_id: row.try_get("department_id")?,
            carpool_id: row.try_get("carpool_id")?,
            driver_id: row.try_get("driver_id")?,
            vehicle_id: row.try_get("vehicle_id")?,
            vehicle_plate: row.try_get("vehicle_plate")?,
            work_place: row.try_get("work_place")?,
            purpose: row.try_get("purpose")?,
            start_at: row.try_get::<Option<DateTime<Utc>>, _>("start_at")?,
            end_at: row.try_get::<Option<DateTime<Utc>>, _>("end_at")?,
            stamps,
            attachments,
            created_at: row.try_get("created_at")?,
            created_by: row.try_get("created_by")?,
            updated_at: row.try_get("updated_at")?,
            updated_by: row.try_get("updated_by")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}

/// Append the role's visibility predicate.
fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, scope: &Scope) {
    match scope {
        Scope::Unscoped => {}
        Scope::Requester { actor_id } => {
            builder.push(" AND requester_id = ").push_bind(actor_id.clone());
        }
        Scope::Department { department_id: Some(department_id) } => {
            builder.push(" AND department_id = ").push_bind(department_id.clone());
        }
        Scope::Department { department_id: None } => {
            builder.push(" AND FALSE");
        }
        Scope::Driver { actor_id } => {
            builder.push(" AND driver_id = ").push_bind(actor_id.clone());
        }
        Scope::Ownership { department_id, carpool_ids } => {
            builder
                .push(" AND (carpool_id = ANY(")
                .push_bind(carpool_ids.clone())
                .push(") OR department_id = ")
                .push_bind(department_id.clone())
                .push(")");
        }
    }
}

fn push_statuses(builder: &mut QueryBuilder<'_, Postgres>, statuses: Vec<String>) {
    if statuses.is_empty() {
        builder.push(" AND FALSE");
    } else {
        builder.push(" AND status = ANY(").push_bind(statuses).push(")");
    }
}

/// Escape `ILIKE` wildcards so the term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Append `WHERE` for every predicate of `filter`.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    let descriptor = filter.domain.descriptor();

    builder
        .push(" WHERE domain = ")
        .push_bind(descriptor.slug)
        .push(" AND NOT is_deleted");
    push_scope(builder, &filter.scope);

    if let Some(statuses) = &filter.statuses {
        push_statuses(builder, statuses.iter().map(|s| s.as_str().to_string()).collect());
    }

    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        builder.push(" AND (");
        for (i, column) in descriptor.search_columns.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder.push(column.column_expr()).push(" ILIKE ").push_bind(pattern.clone());
        }
        builder.push(")");
    }

    let date_expr = format!("({} AT TIME ZONE 'UTC')::date", descriptor.date_column.column_name());
    if let Some(from) = filter.date_from {
        builder.push(" AND ").push(&date_expr).push(" >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND ").push(&date_expr).push(" <= ").push_bind(to);
    }
}

#[async_trait]
impl WorkflowRecordRepository for PostgresWorkflowRecordRepository {
    async fn insert(&self, record: &WorkflowRecord) -> Result<(), RepositoryError> {
        let requester_json = serde_json::to_value(&record.requester)?;
        let stamps_json = serde_json::to_value(&record.stamps)?;
        let attachments_json = serde_json::to_value(&record.attachments)?;

        sqlx::query(
            r#"
            INSERT INTO workflow_records (
                id, domain, request_no, status,
                requester_id, requester_name, requester, department_id,
                carpool_id, driver_id, vehicle_id, vehicle_plate, work_place, purpose,
                start_at, end_at, stamps, attachments,
                created_at, created_by, updated_at, updated_by, is_deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23)
            "#,
        )
        .bind(record.id.0)
        .bind(record.domain.slug())
        .bind(&record.request_no)
        .bind(record.status.as_str())
        .bind(&record.requester.id)
        .bind(&record.requester.name)
        .bind(requester_json)
        .bind(&record.department_id)
        .bind(&record.carpool_id)
        .bind(&record.driver_id)
        .bind(&record.vehicle_id)
        .bind(&record.vehicle_plate)
        .bind(&record.work_place)
        .bind(&record.purpose)
        .bind(record.start_at)
        .bind(record.end_at)
        .bind(stamps_json)
        .bind(attachments_json)
        .bind(record.created_at)
        .bind(&record.created_by)
        .bind(record.updated_at)
        .bind(&record.updated_by)
        .bind(record.is_deleted)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<WorkflowRecord>, RepositoryError> {
        let query = format!("SELECT {} FROM workflow_records WHERE id = $1", RECORD_COLUMNS);
        let row = sqlx::query(&query).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn find_guarded(
        &self,
        domain: WorkflowDomain,
        id: RecordId,
        scope: &Scope,
        statuses: &[&str],
    ) -> Result<Option<WorkflowRecord>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder
            .push(RECORD_COLUMNS)
            .push(" FROM workflow_records WHERE id = ")
            .push_bind(id.0)
            .push(" AND domain = ")
            .push_bind(domain.slug())
            .push(" AND NOT is_deleted");
        push_scope(&mut builder, scope);
        if !statuses.is_empty() {
            push_statuses(&mut builder, statuses.iter().map(|s| s.to_string()).collect());
        }

        let row = builder.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn apply_transition(&self, update: &TransitionUpdate) -> Result<u64, RepositoryError> {
        let slot_key = serde_json::to_value(update.slot)?;
        let slot_key = slot_key
            .as_str()
            .ok_or_else(|| RepositoryError::Serialization("snapshot slot is not a string".to_string()))?
            .to_string();
        let stamp_json = serde_json::to_value(&update.stamp)?;
        let attachments_json = serde_json::to_value(&update.attachments)?;

        let result = sqlx::query(
            r#"
            UPDATE workflow_records
            SET status = $1,
                stamps = stamps || jsonb_build_object($2::text, $3::jsonb),
                attachments = attachments || $4::jsonb,
                updated_at = $5,
                updated_by = $6
            WHERE id = $7 AND status = $8 AND NOT is_deleted
            "#,
        )
        .bind(update.target_status.as_str())
        .bind(slot_key)
        .bind(stamp_json)
        .bind(attachments_json)
        .bind(update.stamp.at)
        .bind(&update.updated_by)
        .bind(update.record_id.0)
        .bind(update.expected_status.as_str())
        .execute(&self.pool)
        .await?;

        debug!(
            record_id = %update.record_id,
            rows = result.rows_affected(),
            "Applied conditional transition update"
        );
        Ok(result.rows_affected())
    }

    async fn update_details(&self, record: &WorkflowRecord, expected_status: &StatusCode) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_records
            SET work_place = $1, purpose = $2, start_at = $3, end_at = $4, vehicle_plate = $5,
                updated_at = $6, updated_by = $7
            WHERE id = $8 AND status = $9 AND NOT is_deleted
            "#,
        )
        .bind(&record.work_place)
        .bind(&record.purpose)
        .bind(record.start_at)
        .bind(record.end_at)
        .bind(&record.vehicle_plate)
        .bind(record.updated_at)
        .bind(&record.updated_by)
        .bind(record.id.0)
        .bind(expected_status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, id: RecordId, expected_status: &StatusCode, actor_id: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_records
            SET is_deleted = TRUE, updated_at = NOW(), updated_by = $1
            WHERE id = $2 AND status = $3 AND NOT is_deleted
            "#,
        )
        .bind(actor_id)
        .bind(id.0)
        .bind(expected_status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn search(&self, filter: &RecordFilter, sort: RecordSort, page: PageRequest) -> Result<Vec<WorkflowRecord>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(RECORD_COLUMNS).push(" FROM workflow_records");
        push_filter(&mut builder, filter);

        // ASC sorts NULLs last and DESC first, matching the in-memory order.
        let direction = match sort.direction {
            SortDirection::Asc => " ASC",
            SortDirection::Desc => " DESC",
        };
        builder
            .push(" ORDER BY ")
            .push(sort.key.column())
            .push(direction)
            .push(", id ASC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        debug!(domain = %filter.domain, sql = builder.sql(), "Searching workflow records");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_record).collect()
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM workflow_records");
        push_filter(&mut builder, filter);

        let row = builder.build().fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    async fn count_by_status(&self, filter: &RecordFilter) -> Result<Vec<(StatusCode, u64)>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT status, COUNT(*) AS total FROM workflow_records");
        push_filter(&mut builder, filter);
        builder.push(" GROUP BY status ORDER BY status");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<(StatusCode, u64), RepositoryError> {
                let status: String = row.try_get("status")?;
                let total: i64 = row.try_get("total")?;
                Ok((StatusCode::new(status), total.max(0) as u64))
            })
            .collect()
    }
}
