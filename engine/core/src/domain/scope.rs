// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Role-specific visibility filters.
//!
//! A [`Scope`] is plain data so every repository backend can translate it:
//! the in-memory store evaluates [`Scope::matches`], the PostgreSQL store
//! renders it into a `WHERE` fragment.

use serde::Serialize;

use crate::domain::actor::{ActorContext, ActorRole};
use crate::domain::record::WorkflowRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Top-level approvers see every record.
    Unscoped,
    /// Only records the actor requested.
    Requester { actor_id: String },
    /// Only records of the actor's department. `None` matches nothing.
    Department { department_id: Option<String> },
    /// Only records the actor is assigned to drive.
    Driver { actor_id: String },
    /// Records of carpools the actor administers, or of the actor's department.
    Ownership {
        department_id: Option<String>,
        carpool_ids: Vec<String>,
    },
}

impl Scope {
    pub fn for_actor(actor: &ActorContext) -> Self {
        match actor.role {
            ActorRole::Requester => Scope::Requester { actor_id: actor.id.clone() },
            ActorRole::DepartmentApprover => Scope::Department {
                department_id: actor.department_id.clone(),
            },
            ActorRole::FinalApprover => Scope::Unscoped,
            ActorRole::Driver => Scope::Driver { actor_id: actor.id.clone() },
            ActorRole::Admin => Scope::Ownership {
                department_id: actor.department_id.clone(),
                carpool_ids: actor.carpool_ids.clone(),
            },
        }
    }

    pub fn matches(&self, record: &WorkflowRecord) -> bool {
        match self {
            Scope::Unscoped => true,
            Scope::Requester { actor_id } => &record.requester.id == actor_id,
            Scope::Department { department_id } => {
                department_id.as_deref() == Some(record.department_id.as_str())
            }
            Scope::Driver { actor_id } => record.driver_id.as_deref() == Some(actor_id.as_str()),
            Scope::Ownership { department_id, carpool_ids } => {
                let owns_carpool = record
                    .carpool_id
                    .as_ref()
                    .is_some_and(|carpool| carpool_ids.contains(carpool));
                owns_carpool || department_id.as_deref() == Some(record.department_id.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::NewRecord;
    use crate::domain::workflow::WorkflowDomain;
    use chrono::Utc;

    fn record() -> WorkflowRecord {
        let requester = ActorContext::new("req-1", ActorRole::Requester, "Anong")
            .with_department("dept-a", "OPS", "Operations");
        WorkflowRecord::submit(
            WorkflowDomain::Booking,
            &requester,
            NewRecord {
                carpool_id: Some("pool-1".to_string()),
                driver_id: Some("drv-1".to_string()),
                ..NewRecord::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn requester_sees_only_own_records() {
        let record = record();
        assert!(Scope::Requester { actor_id: "req-1".into() }.matches(&record));
        assert!(!Scope::Requester { actor_id: "req-2".into() }.matches(&record));
    }

    #[test]
    fn department_without_id_matches_nothing() {
        let record = record();
        assert!(Scope::Department { department_id: Some("dept-a".into()) }.matches(&record));
        assert!(!Scope::Department { department_id: None }.matches(&record));
    }

    #[test]
    fn admin_ownership_via_carpool_or_department() {
        let record = record();
        let via_carpool = Scope::Ownership { department_id: None, carpool_ids: vec!["pool-1".into()] };
        let via_department = Scope::Ownership { department_id: Some("dept-a".into()), carpool_ids: vec![] };
        let neither = Scope::Ownership { department_id: Some("dept-z".into()), carpool_ids: vec!["pool-9".into()] };
        assert!(via_carpool.matches(&record));
        assert!(via_department.matches(&record));
        assert!(!neither.matches(&record));
    }

    #[test]
    fn scope_follows_role() {
        let driver = ActorContext::new("drv-1", ActorRole::Driver, "Prasit");
        assert_eq!(Scope::for_actor(&driver), Scope::Driver { actor_id: "drv-1".into() });
        assert!(Scope::for_actor(&driver).matches(&record()));

        let final_approver = ActorContext::new("boss", ActorRole::FinalApprover, "Director");
        assert_eq!(Scope::for_actor(&final_approver), Scope::Unscoped);
    }
}
