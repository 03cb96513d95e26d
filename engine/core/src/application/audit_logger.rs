// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Audit Logger
//!
//! Appends one immutable entry per successful action and reads a record's
//! history back, enriched with the actor's role label and the status name.

use std::sync::Arc;
use tracing::debug;

use crate::domain::actor::ActorRole;
use crate::domain::audit::{AuditLogEntry, AuditLogPage, AuditLogView, Pagination};
use crate::domain::record::RecordId;
use crate::domain::repository::{AuditLogRepository, RepositoryError};
use crate::domain::search::PageRequest;
use crate::domain::status::StatusCode;
use crate::domain::workflow::WorkflowDomain;

pub struct AuditLogger {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogger {
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    pub async fn append(
        &self,
        record_id: RecordId,
        domain: WorkflowDomain,
        status_code: StatusCode,
        actor_id: &str,
        actor_role: ActorRole,
        reason: Option<String>,
    ) -> Result<AuditLogEntry, RepositoryError> {
        let entry = AuditLogEntry::new(record_id, domain, status_code, actor_id, actor_role, reason);
        self.repository.append(&entry).await?;
        debug!(record_id = %record_id, status = %entry.status_code, role = %actor_role, "Audit entry appended");
        Ok(entry)
    }

    /// One page of a record's history, oldest first.
    pub async fn list(&self, record_id: RecordId, page: PageRequest) -> Result<AuditLogPage, RepositoryError> {
        let (entries, total) = self.repository.list(record_id, page).await?;
        Ok(AuditLogPage {
            pagination: Pagination::new(total, page.page, page.limit),
            entries: entries.into_iter().map(AuditLogView::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryAuditLogRepository;

    #[tokio::test]
    async fn history_is_enriched_with_labels() {
        let logger = AuditLogger::new(Arc::new(InMemoryAuditLogRepository::new()));
        let record_id = RecordId::new();

        logger
            .append(record_id, WorkflowDomain::Booking, StatusCode::from("20"), "req-1", ActorRole::Requester, None)
            .await
            .unwrap();
        logger
            .append(
                record_id,
                WorkflowDomain::Booking,
                StatusCode::from("90"),
                "admin-1",
                ActorRole::Admin,
                Some("vehicle under repair".into()),
            )
            .await
            .unwrap();

        let page = logger.list(record_id, PageRequest::default()).await.unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.pagination.total_pages, 1);
        assert_eq!(page.entries[0].role_label, "Requester");
        assert_eq!(page.entries[0].status_name, Some("Pending approval"));
        assert_eq!(page.entries[1].role_label, "Fleet administrator");
        assert_eq!(page.entries[1].entry.reason.as_deref(), Some("vehicle under repair"));
    }
}
