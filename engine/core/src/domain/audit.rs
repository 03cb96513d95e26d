// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Append-only action log for workflow records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::ActorRole;
use crate::domain::record::RecordId;
use crate::domain::status::StatusCode;
use crate::domain::workflow::WorkflowDomain;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub record_id: RecordId,
    pub domain: WorkflowDomain,
    /// Status the record entered with this action.
    pub status_code: StatusCode,
    pub actor_id: String,
    pub actor_role: ActorRole,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        record_id: RecordId,
        domain: WorkflowDomain,
        status_code: StatusCode,
        actor_id: impl Into<String>,
        actor_role: ActorRole,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id,
            domain,
            status_code,
            actor_id: actor_id.into(),
            actor_role,
            reason,
            created_at: Utc::now(),
        }
    }
}

/// Audit entry enriched at read time for display.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogView {
    #[serde(flatten)]
    pub entry: AuditLogEntry,
    pub role_label: &'static str,
    pub status_name: Option<&'static str>,
}

impl From<AuditLogEntry> for AuditLogView {
    fn from(entry: AuditLogEntry) -> Self {
        let role_label = entry.actor_role.label();
        let status_name = entry.domain.registry().name_of(entry.status_code.as_str());
        Self { entry, role_label, status_name }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogPage {
    pub pagination: Pagination,
    pub entries: Vec<AuditLogView>,
}

/// Pagination envelope shared by search and audit listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(u64::from(limit)) as u32;
        Self { total, page: page.max(1), limit, total_pages }
    }

    /// Zero-based offset of the first row on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_carries_role_label_and_status_name() {
        let entry = AuditLogEntry::new(
            RecordId::new(),
            WorkflowDomain::Booking,
            StatusCode::from("90"),
            "u-9",
            ActorRole::Admin,
            Some("vehicle broke down".to_string()),
        );
        let view = AuditLogView::from(entry);
        assert_eq!(view.role_label, "Fleet administrator");
        assert_eq!(view.status_name, Some("Canceled"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["actor_role"], "admin");
        assert_eq!(json["reason"], "vehicle broke down");
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let p = Pagination::new(21, 3, 10);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset(), 20);
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
        assert_eq!(Pagination::new(5, 0, 0).limit, 1);
    }
}
