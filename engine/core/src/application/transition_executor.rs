// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Transition Executor
//!
//! Applies one guarded transition as a single conditional row update and
//! records it in the audit log.
//!
//! # Conflict detection
//!
//! The update only matches while the record still has the status the guard
//! observed. Zero affected rows, or a row that is gone when re-read, means a
//! concurrent transition won the race and the caller gets `Conflict`.
//!
//! # Audit failures
//!
//! The audit append runs after the status change is committed. If it fails
//! the error is logged and counted in `fleetflow_audit_failures_total`; the
//! status change stands.

use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tracing::{error, info};

use crate::application::audit_logger::AuditLogger;
use crate::domain::actor::ActorContext;
use crate::domain::error::{WorkflowError, WorkflowResult};
use crate::domain::record::{TransitionStamp, TransitionUpdate, WorkflowRecord};
use crate::domain::repository::WorkflowRecordRepository;
use crate::domain::status::StatusCode;
use crate::domain::workflow::{ReasonPolicy, TransitionRule};

/// Caller-supplied payload accompanying a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionMetadata {
    pub reason: Option<String>,
    pub attachments: Vec<String>,
}

impl TransitionMetadata {
    /// Trim the reason and apply the rule's reason policy.
    pub fn normalized(self, rule: &TransitionRule) -> WorkflowResult<Self> {
        let reason = self
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let reason = match rule.reason {
            ReasonPolicy::None => None,
            ReasonPolicy::Optional => reason,
            ReasonPolicy::Required => Some(reason.ok_or_else(|| {
                WorkflowError::validation(format!("A reason is required for '{}'", rule.action))
            })?),
        };
        let attachments = self
            .attachments
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        Ok(Self { reason, attachments })
    }
}

pub struct TransitionExecutor {
    records: Arc<dyn WorkflowRecordRepository>,
    audit: Arc<AuditLogger>,
}

impl TransitionExecutor {
    pub fn new(records: Arc<dyn WorkflowRecordRepository>, audit: Arc<AuditLogger>) -> Self {
        Self { records, audit }
    }

    pub async fn execute(
        &self,
        record: &WorkflowRecord,
        rule: &TransitionRule,
        actor: &ActorContext,
        metadata: TransitionMetadata,
    ) -> WorkflowResult<WorkflowRecord> {
        let update = TransitionUpdate {
            record_id: record.id,
            expected_status: record.status.clone(),
            target_status: StatusCode::from(rule.to),
            slot: rule.slot,
            stamp: TransitionStamp {
                actor: actor.snapshot(),
                reason: metadata.reason.clone(),
                at: Utc::now(),
            },
            attachments: metadata.attachments,
            updated_by: actor.id.clone(),
        };

        if self.records.apply_transition(&update).await? == 0 {
            return Err(WorkflowError::Conflict(record.id));
        }

        let updated = self
            .records
            .find_by_id(record.id)
            .await?
            .ok_or(WorkflowError::Conflict(record.id))?;

        info!(
            domain = %record.domain,
            record_id = %record.id,
            action = rule.action,
            from = %update.expected_status,
            to = rule.to,
            actor_id = %actor.id,
            "Transition applied"
        );

        if let Err(e) = self
            .audit
            .append(
                record.id,
                record.domain,
                update.target_status.clone(),
                &actor.id,
                actor.role,
                metadata.reason,
            )
            .await
        {
            counter!("fleetflow_audit_failures_total", "domain" => record.domain.slug()).increment(1);
            error!(
                domain = %record.domain,
                record_id = %record.id,
                action = rule.action,
                error = %e,
                "Failed to append audit entry; status change is kept"
            );
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::ActorRole;
    use crate::domain::audit::AuditLogEntry;
    use crate::domain::record::{NewRecord, RecordId, SnapshotSlot};
    use crate::domain::repository::{AuditLogRepository, RepositoryError};
    use crate::domain::search::PageRequest;
    use crate::domain::workflow::WorkflowDomain;
    use crate::infrastructure::repositories::{InMemoryAuditLogRepository, InMemoryWorkflowRecordRepository};
    use async_trait::async_trait;

    struct FailingAuditRepository;

    #[async_trait]
    impl AuditLogRepository for FailingAuditRepository {
        async fn append(&self, _entry: &AuditLogEntry) -> Result<(), RepositoryError> {
            Err(RepositoryError::Database("audit table unavailable".into()))
        }

        async fn list(&self, _record_id: RecordId, _page: PageRequest) -> Result<(Vec<AuditLogEntry>, u64), RepositoryError> {
            Ok((vec![], 0))
        }
    }

    async fn booking(repo: &InMemoryWorkflowRecordRepository) -> WorkflowRecord {
        let requester = ActorContext::new("req-1", ActorRole::Requester, "Dao").with_department("d-1", "HR", "Human Resources");
        let record = WorkflowRecord::submit(WorkflowDomain::Booking, &requester, NewRecord::default(), Utc::now());
        repo.insert(&record).await.unwrap();
        record
    }

    #[test]
    fn reason_policy_is_applied() {
        let descriptor = WorkflowDomain::Booking.descriptor();
        let send_back = descriptor.rule("send_back").unwrap();
        let approve = descriptor.rule("approve").unwrap();

        let blank = TransitionMetadata { reason: Some("   ".into()), attachments: vec![] };
        assert!(matches!(blank.clone().normalized(send_back), Err(WorkflowError::Validation(_))));

        let given = TransitionMetadata { reason: Some(" wrong dates ".into()), attachments: vec![" a.pdf ".into(), "".into()] };
        let normalized = given.clone().normalized(send_back).unwrap();
        assert_eq!(normalized.reason.as_deref(), Some("wrong dates"));
        assert_eq!(normalized.attachments, vec!["a.pdf".to_string()]);

        assert_eq!(given.normalized(approve).unwrap().reason, None);
    }

    #[tokio::test]
    async fn stale_record_is_a_conflict() {
        let repo = Arc::new(InMemoryWorkflowRecordRepository::new());
        let audit = Arc::new(InMemoryAuditLogRepository::new());
        let executor = TransitionExecutor::new(repo.clone(), Arc::new(AuditLogger::new(audit.clone())));
        let record = booking(&repo).await;
        let approver = ActorContext::new("appr-1", ActorRole::DepartmentApprover, "Approver");
        let approve = WorkflowDomain::Booking.descriptor().rule("approve").unwrap();

        let updated = executor.execute(&record, approve, &approver, TransitionMetadata::default()).await.unwrap();
        assert_eq!(updated.status, "30");
        assert_eq!(updated.stamp(SnapshotSlot::Approver).unwrap().actor.id, "appr-1");

        // Same observed status again: the row no longer matches.
        let again = executor.execute(&record, approve, &approver, TransitionMetadata::default()).await;
        assert!(matches!(again, Err(WorkflowError::Conflict(id)) if id == record.id));

        let (entries, total) = audit.list(record.id, PageRequest::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].status_code, "30");
    }

    #[tokio::test]
    async fn audit_failure_keeps_the_status_change() {
        let repo = Arc::new(InMemoryWorkflowRecordRepository::new());
        let executor = TransitionExecutor::new(repo.clone(), Arc::new(AuditLogger::new(Arc::new(FailingAuditRepository))));
        let record = booking(&repo).await;
        let requester = ActorContext::new("req-1", ActorRole::Requester, "Dao");
        let cancel = WorkflowDomain::Booking.descriptor().rule("cancel").unwrap();

        let updated = executor
            .execute(&record, cancel, &requester, TransitionMetadata { reason: Some("plans changed".into()), attachments: vec![] })
            .await
            .unwrap();
        assert_eq!(updated.status, "90");
        assert_eq!(repo.find_by_id(record.id).await.unwrap().unwrap().status, "90");
    }
}
