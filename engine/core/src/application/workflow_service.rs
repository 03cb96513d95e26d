// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workflow Service
//!
//! Application service for the record lifecycle of every workflow domain.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Orchestrate submit, transition, read, revise and
//!   soft delete on top of the guard, executor, audit logger and search
//!   aggregator
//! - **Collaborators:**
//!   - Domain: `WorkflowRecord` aggregate, `DomainDescriptor`
//!   - Infrastructure: `WorkflowRecordRepository`, `AuditLogRepository`,
//!     `ReferenceDirectory`

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::audit_logger::AuditLogger;
use crate::application::search_aggregator::{annotate, PagingLimits, SearchAggregator, SearchParams};
use crate::application::transition_executor::{TransitionExecutor, TransitionMetadata};
use crate::application::transition_guard::TransitionGuard;
use crate::domain::actor::{ActorContext, ActorRole};
use crate::domain::audit::AuditLogPage;
use crate::domain::config::WorkflowConfig;
use crate::domain::error::{WorkflowError, WorkflowResult};
use crate::domain::progress::progress_steps;
use crate::domain::record::{NewRecord, RecordId, RecordRevision, WorkflowRecord};
use crate::domain::reference::ReferenceDirectory;
use crate::domain::repository::{AuditLogRepository, WorkflowRecordRepository};
use crate::domain::scope::Scope;
use crate::domain::search::{PageRequest, RecordDetail, SearchResult};
use crate::domain::status::StatusCode;
use crate::domain::workflow::WorkflowDomain;

/// Engine tuning taken from `spec.workflow`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub precondition_detail: bool,
    pub paging: PagingLimits,
}

impl From<&WorkflowConfig> for EngineSettings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            precondition_detail: config.precondition_detail,
            paging: PagingLimits {
                default_page_size: config.default_page_size,
                max_page_size: config.max_page_size,
            },
        }
    }
}

#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Create a record in the domain's initial status.
    async fn submit(&self, domain: WorkflowDomain, actor: &ActorContext, details: NewRecord) -> WorkflowResult<RecordDetail>;

    /// Guard, apply and audit one named transition.
    async fn transition(
        &self,
        domain: WorkflowDomain,
        action: &str,
        record_id: RecordId,
        actor: &ActorContext,
        metadata: TransitionMetadata,
    ) -> WorkflowResult<RecordDetail>;

    async fn detail(&self, domain: WorkflowDomain, record_id: RecordId, actor: &ActorContext) -> WorkflowResult<RecordDetail>;

    async fn search(&self, domain: WorkflowDomain, actor: &ActorContext, params: &SearchParams) -> WorkflowResult<SearchResult>;

    async fn history(
        &self,
        domain: WorkflowDomain,
        record_id: RecordId,
        actor: &ActorContext,
        page: PageRequest,
    ) -> WorkflowResult<AuditLogPage>;

    /// Change free-form details while the record is still editable.
    async fn revise(
        &self,
        domain: WorkflowDomain,
        record_id: RecordId,
        actor: &ActorContext,
        revision: RecordRevision,
    ) -> WorkflowResult<RecordDetail>;

    /// Flag an editable record as deleted. The row is kept.
    async fn soft_delete(&self, domain: WorkflowDomain, record_id: RecordId, actor: &ActorContext) -> WorkflowResult<()>;
}

pub struct StandardWorkflowService {
    records: Arc<dyn WorkflowRecordRepository>,
    references: Arc<dyn ReferenceDirectory>,
    guard: TransitionGuard,
    executor: TransitionExecutor,
    audit: Arc<AuditLogger>,
    aggregator: SearchAggregator,
}

impl StandardWorkflowService {
    pub fn new(
        records: Arc<dyn WorkflowRecordRepository>,
        audit_log: Arc<dyn AuditLogRepository>,
        references: Arc<dyn ReferenceDirectory>,
        settings: EngineSettings,
    ) -> Self {
        let audit = Arc::new(AuditLogger::new(audit_log));
        Self {
            guard: TransitionGuard::new(records.clone(), settings.precondition_detail),
            executor: TransitionExecutor::new(records.clone(), audit.clone()),
            aggregator: SearchAggregator::new(records.clone(), references.clone(), settings.paging),
            records,
            references,
            audit,
        }
    }

    async fn build_detail(&self, record: WorkflowRecord, actor: &ActorContext) -> WorkflowResult<RecordDetail> {
        let references = self
            .references
            .resolve(std::slice::from_ref(&record))
            .await?
            .pop()
            .unwrap_or_default();
        let descriptor = record.domain.descriptor();
        let code = record.status.as_str();
        let progress = progress_steps(record.domain, code);
        let available_actions = descriptor.actions_for(code, actor.role);
        let view = annotate(record, references, Utc::now().date_naive());
        Ok(RecordDetail { view, progress, available_actions })
    }

    /// Editable record owned by `actor`.
    async fn editable(&self, domain: WorkflowDomain, record_id: RecordId, actor: &ActorContext) -> WorkflowResult<WorkflowRecord> {
        let scope = Scope::Requester { actor_id: actor.id.clone() };
        self.guard
            .locate(domain, record_id, &scope, domain.descriptor().editable_statuses)
            .await
    }

    async fn apply_transition(
        &self,
        domain: WorkflowDomain,
        action: &str,
        record_id: RecordId,
        actor: &ActorContext,
        metadata: TransitionMetadata,
    ) -> WorkflowResult<WorkflowRecord> {
        let rule = domain
            .descriptor()
            .rule(action)
            .ok_or_else(|| WorkflowError::validation(format!("Unknown action '{}' for {}", action, domain)))?;
        let metadata = metadata.normalized(rule)?;
        let record = self.guard.check(domain, record_id, actor, rule).await?;
        self.executor.execute(&record, rule, actor, metadata).await
    }
}

fn validate_period(start_at: Option<chrono::DateTime<Utc>>, end_at: Option<chrono::DateTime<Utc>>) -> WorkflowResult<()> {
    if let (Some(start), Some(end)) = (start_at, end_at) {
        if end < start {
            return Err(WorkflowError::validation("end_at must not be before start_at"));
        }
    }
    Ok(())
}

#[async_trait]
impl WorkflowService for StandardWorkflowService {
    async fn submit(&self, domain: WorkflowDomain, actor: &ActorContext, details: NewRecord) -> WorkflowResult<RecordDetail> {
        if actor.role != ActorRole::Requester {
            return Err(WorkflowError::validation(format!("Only requesters can submit {} records", domain)));
        }
        if domain == WorkflowDomain::Booking && (details.start_at.is_none() || details.end_at.is_none()) {
            return Err(WorkflowError::validation("Booking requests need start_at and end_at"));
        }
        validate_period(details.start_at, details.end_at)?;

        let record = WorkflowRecord::submit(domain, actor, details, Utc::now());
        self.records.insert(&record).await?;
        info!(domain = %domain, record_id = %record.id, request_no = %record.request_no, "Record submitted");

        if let Err(e) = self
            .audit
            .append(record.id, domain, record.status.clone(), &actor.id, actor.role, None)
            .await
        {
            counter!("fleetflow_audit_failures_total", "domain" => domain.slug()).increment(1);
            tracing::error!(record_id = %record.id, error = %e, "Failed to append creation audit entry");
        }

        self.build_detail(record, actor).await
    }

    async fn transition(
        &self,
        domain: WorkflowDomain,
        action: &str,
        record_id: RecordId,
        actor: &ActorContext,
        metadata: TransitionMetadata,
    ) -> WorkflowResult<RecordDetail> {
        let result = self.apply_transition(domain, action, record_id, actor, metadata).await;
        let outcome = match &result {
            Ok(_) => "applied",
            Err(e) => e.kind(),
        };
        counter!(
            "fleetflow_transitions_total",
            "domain" => domain.slug(),
            "action" => action.to_string(),
            "outcome" => outcome
        )
        .increment(1);

        match result {
            Ok(record) => self.build_detail(record, actor).await,
            Err(e) => {
                if matches!(e, WorkflowError::Conflict(_)) {
                    warn!(domain = %domain, record_id = %record_id, action, "Transition lost a concurrent race");
                }
                Err(e)
            }
        }
    }

    async fn detail(&self, domain: WorkflowDomain, record_id: RecordId, actor: &ActorContext) -> WorkflowResult<RecordDetail> {
        let record = self.guard.locate(domain, record_id, &Scope::for_actor(actor), &[]).await?;
        self.build_detail(record, actor).await
    }

    async fn search(&self, domain: WorkflowDomain, actor: &ActorContext, params: &SearchParams) -> WorkflowResult<SearchResult> {
        self.aggregator.search(domain, actor, params, Utc::now().date_naive()).await
    }

    async fn history(
        &self,
        domain: WorkflowDomain,
        record_id: RecordId,
        actor: &ActorContext,
        page: PageRequest,
    ) -> WorkflowResult<AuditLogPage> {
        self.guard.locate(domain, record_id, &Scope::for_actor(actor), &[]).await?;
        Ok(self.audit.list(record_id, page).await?)
    }

    async fn revise(
        &self,
        domain: WorkflowDomain,
        record_id: RecordId,
        actor: &ActorContext,
        revision: RecordRevision,
    ) -> WorkflowResult<RecordDetail> {
        if revision.is_empty() {
            return Err(WorkflowError::validation("Nothing to revise"));
        }
        let mut record = self.editable(domain, record_id, actor).await?;
        let observed: StatusCode = record.status.clone();
        record.revise(&revision, &actor.id, Utc::now());
        validate_period(record.start_at, record.end_at)?;

        if self.records.update_details(&record, &observed).await? == 0 {
            return Err(WorkflowError::Conflict(record_id));
        }
        info!(domain = %domain, record_id = %record_id, "Record details revised");
        self.build_detail(record, actor).await
    }

    async fn soft_delete(&self, domain: WorkflowDomain, record_id: RecordId, actor: &ActorContext) -> WorkflowResult<()> {
        let record = self.editable(domain, record_id, actor).await?;
        if self.records.soft_delete(record_id, &record.status, &actor.id).await? == 0 {
            return Err(WorkflowError::Conflict(record_id));
        }
        info!(domain = %domain, record_id = %record_id, "Record soft-deleted");
        Ok(())
    }
}
