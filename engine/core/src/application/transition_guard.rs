// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Transition Guard
//!
//! Loads the one record a transition may act on. The lookup is a single store
//! query filtered at the same time by the soft-delete flag, the actor's
//! scope and the rule's allowed source statuses, so "absent", "not yours" and
//! "wrong status" all collapse into one miss. No side effects.
//!
//! When `precondition_detail` is enabled, a miss is followed by diagnostic
//! lookups that tell the three outcomes apart for the caller.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::actor::ActorContext;
use crate::domain::error::{PreconditionCause, WorkflowError, WorkflowResult};
use crate::domain::record::{RecordId, WorkflowRecord};
use crate::domain::repository::WorkflowRecordRepository;
use crate::domain::scope::Scope;
use crate::domain::workflow::{TransitionRule, WorkflowDomain};

pub struct TransitionGuard {
    records: Arc<dyn WorkflowRecordRepository>,
    precondition_detail: bool,
}

impl TransitionGuard {
    pub fn new(records: Arc<dyn WorkflowRecordRepository>, precondition_detail: bool) -> Self {
        Self { records, precondition_detail }
    }

    /// Return the record `rule` may be applied to on behalf of `actor`.
    pub async fn check(
        &self,
        domain: WorkflowDomain,
        record_id: RecordId,
        actor: &ActorContext,
        rule: &TransitionRule,
    ) -> WorkflowResult<WorkflowRecord> {
        if !rule.admits(actor.role) {
            warn!(
                domain = %domain,
                action = rule.action,
                role = %actor.role,
                "Role is not permitted to perform this transition"
            );
            return Err(self.failure(record_id, PreconditionCause::RoleNotPermitted));
        }

        self.locate(domain, record_id, &Scope::for_actor(actor), rule.from).await
    }

    /// Return a live record inside `scope` whose status is one of `statuses`.
    pub async fn locate(
        &self,
        domain: WorkflowDomain,
        record_id: RecordId,
        scope: &Scope,
        statuses: &[&str],
    ) -> WorkflowResult<WorkflowRecord> {
        if let Some(record) = self.records.find_guarded(domain, record_id, scope, statuses).await? {
            debug!(record_id = %record_id, status = %record.status, "Guard matched record");
            return Ok(record);
        }

        let cause = if self.precondition_detail {
            self.diagnose(domain, record_id, scope).await?
        } else {
            PreconditionCause::NotFound
        };
        warn!(domain = %domain, record_id = %record_id, cause = ?cause, "Transition precondition failed");
        Err(self.failure(record_id, cause))
    }

    async fn diagnose(&self, domain: WorkflowDomain, record_id: RecordId, scope: &Scope) -> WorkflowResult<PreconditionCause> {
        if self.records.find_guarded(domain, record_id, scope, &[]).await?.is_some() {
            return Ok(PreconditionCause::WrongStatus);
        }
        let visible = self
            .records
            .find_by_id(record_id)
            .await?
            .is_some_and(|r| r.domain == domain && !r.is_deleted);
        Ok(if visible { PreconditionCause::OutOfScope } else { PreconditionCause::NotFound })
    }

    fn failure(&self, record_id: RecordId, cause: PreconditionCause) -> WorkflowError {
        WorkflowError::PreconditionFailed {
            record_id,
            cause: self.precondition_detail.then_some(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::ActorRole;
    use crate::domain::record::NewRecord;
    use crate::infrastructure::repositories::InMemoryWorkflowRecordRepository;
    use chrono::Utc;

    async fn seeded() -> (Arc<InMemoryWorkflowRecordRepository>, WorkflowRecord) {
        let repo = Arc::new(InMemoryWorkflowRecordRepository::new());
        let requester = ActorContext::new("req-1", ActorRole::Requester, "Nok")
            .with_department("dept-a", "FIN", "Finance");
        let record = WorkflowRecord::submit(WorkflowDomain::LicenseAnnual, &requester, NewRecord::default(), Utc::now());
        repo.insert(&record).await.unwrap();
        (repo, record)
    }

    fn approver(department: &str) -> ActorContext {
        ActorContext::new("appr-1", ActorRole::DepartmentApprover, "Approver").with_department(department, "X", "X")
    }

    #[tokio::test]
    async fn admits_in_scope_record_in_source_status() {
        let (repo, record) = seeded().await;
        let guard = TransitionGuard::new(repo, false);
        let rule = WorkflowDomain::LicenseAnnual.descriptor().rule("department_approve").unwrap();

        let found = guard.check(WorkflowDomain::LicenseAnnual, record.id, &approver("dept-a"), rule).await.unwrap();
        assert_eq!(found.id, record.id);
    }

    #[tokio::test]
    async fn merged_misses_carry_no_cause() {
        let (repo, record) = seeded().await;
        let guard = TransitionGuard::new(repo, false);
        let rule = WorkflowDomain::LicenseAnnual.descriptor().rule("department_approve").unwrap();

        let err = guard.check(WorkflowDomain::LicenseAnnual, record.id, &approver("dept-b"), rule).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionFailed { cause: None, .. }));
    }

    #[tokio::test]
    async fn detailed_misses_are_diagnosed() {
        let (repo, record) = seeded().await;
        let guard = TransitionGuard::new(repo, true);
        let descriptor = WorkflowDomain::LicenseAnnual.descriptor();
        let domain = WorkflowDomain::LicenseAnnual;

        let out_of_scope = guard.check(domain, record.id, &approver("dept-b"), descriptor.rule("department_approve").unwrap()).await;
        assert!(matches!(out_of_scope, Err(WorkflowError::PreconditionFailed { cause: Some(PreconditionCause::OutOfScope), .. })));

        let final_approver = ActorContext::new("fa-1", ActorRole::FinalApprover, "Authority");
        let wrong_status = guard.check(domain, record.id, &final_approver, descriptor.rule("authority_approve").unwrap()).await;
        assert!(matches!(wrong_status, Err(WorkflowError::PreconditionFailed { cause: Some(PreconditionCause::WrongStatus), .. })));

        let missing = guard.check(domain, RecordId::new(), &final_approver, descriptor.rule("authority_approve").unwrap()).await;
        assert!(matches!(missing, Err(WorkflowError::PreconditionFailed { cause: Some(PreconditionCause::NotFound), .. })));

        let wrong_role = guard.check(domain, record.id, &final_approver, descriptor.rule("department_approve").unwrap()).await;
        assert!(matches!(wrong_role, Err(WorkflowError::PreconditionFailed { cause: Some(PreconditionCause::RoleNotPermitted), .. })));
    }
}
