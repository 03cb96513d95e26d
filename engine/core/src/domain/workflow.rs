// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Workflow Domains
//!
//! One [`DomainDescriptor`] per workflow domain configures the generic engine:
//! the status universe, the transition graph, the search-filter descriptors
//! and the progress plan. Guard, executor, audit logger and search aggregator
//! are written once against this descriptor instead of once per actor role.
//!
//! | Domain | Initial | Terminal |
//! |--------|---------|----------|
//! | `booking` | `20` | `80`, `90` |
//! | `license-annual` | `10` | `90`..`93` (and `30` unless superseded by `93`) |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::actor::ActorRole;
use crate::domain::progress::StepState;
use crate::domain::record::{DateColumn, SnapshotSlot};
use crate::domain::status::{StatusRegistry, BOOKING_STATUSES, LICENSE_ANNUAL_STATUSES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowDomain {
    Booking,
    LicenseAnnual,
}

impl WorkflowDomain {
    pub const ALL: [WorkflowDomain; 2] = [WorkflowDomain::Booking, WorkflowDomain::LicenseAnnual];

    pub fn descriptor(&self) -> &'static DomainDescriptor {
        match self {
            WorkflowDomain::Booking => &BOOKING,
            WorkflowDomain::LicenseAnnual => &LICENSE_ANNUAL,
        }
    }

    pub fn slug(&self) -> &'static str {
        self.descriptor().slug
    }

    pub fn registry(&self) -> StatusRegistry {
        self.descriptor().registry
    }
}

impl fmt::Display for WorkflowDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown workflow domain: '{0}'")]
pub struct UnknownDomain(pub String);

impl FromStr for WorkflowDomain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowDomain::ALL
            .into_iter()
            .find(|d| d.slug() == s)
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}

/// Whether a transition accepts, requires or ignores a reason text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonPolicy {
    None,
    Optional,
    Required,
}

/// One edge set of a domain's transition graph.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransitionRule {
    pub action: &'static str,
    pub from: &'static [&'static str],
    pub to: &'static str,
    pub roles: &'static [ActorRole],
    pub slot: SnapshotSlot,
    pub reason: ReasonPolicy,
}

impl TransitionRule {
    pub fn allows_source(&self, code: &str) -> bool {
        self.from.contains(&code)
    }

    pub fn admits(&self, role: ActorRole) -> bool {
        self.roles.contains(&role)
    }
}

/// Text columns the free-text search term is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchColumn {
    RequestNo,
    VehiclePlate,
    RequesterName,
    WorkPlace,
}

impl SearchColumn {
    /// SQL expression searched for this column. The plate is the one the list
    /// displays: the assigned vehicle's plate, else the free-text plate.
    pub fn column_expr(&self) -> &'static str {
        match self {
            SearchColumn::RequestNo => "request_no",
            SearchColumn::VehiclePlate => {
                "COALESCE((SELECT v.plate FROM vehicles v WHERE v.id = workflow_records.vehicle_id), workflow_records.vehicle_plate)"
            }
            SearchColumn::RequesterName => "requester_name",
            SearchColumn::WorkPlace => "work_place",
        }
    }
}

/// Sort keys a domain may whitelist for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    RequestNo,
    StartAt,
    Status,
    CreatedAt,
}

impl SortKey {
    pub fn param(&self) -> &'static str {
        match self {
            SortKey::RequestNo => "request_no",
            SortKey::StartAt => "start_at",
            SortKey::Status => "status",
            SortKey::CreatedAt => "created_at",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortKey::RequestNo => "request_no",
            SortKey::StartAt => "start_at",
            SortKey::Status => "status",
            SortKey::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("order_dir must be 'asc' or 'desc', got '{}'", other)),
        }
    }
}

#[derive(Debug)]
pub struct DomainDescriptor {
    pub domain: WorkflowDomain,
    pub slug: &'static str,
    pub request_prefix: &'static str,
    pub registry: StatusRegistry,
    pub initial_status: &'static str,
    pub terminal_statuses: &'static [&'static str],
    pub editable_statuses: &'static [&'static str],
    pub transitions: &'static [TransitionRule],
    /// Query parameter carrying the csv status filter.
    pub status_param: &'static str,
    pub search_columns: &'static [SearchColumn],
    pub date_column: DateColumn,
    pub sort_keys: &'static [SortKey],
    pub default_sort: SortKey,
    pub progress_labels: &'static [&'static str],
    pub progress_plan: &'static [(&'static str, &'static [StepState])],
}

impl DomainDescriptor {
    pub fn rule(&self, action: &str) -> Option<&'static TransitionRule> {
        self.transitions.iter().find(|r| r.action == action)
    }

    pub fn is_terminal(&self, code: &str) -> bool {
        self.terminal_statuses.contains(&code)
    }

    pub fn is_editable(&self, code: &str) -> bool {
        self.editable_statuses.contains(&code)
    }

    pub fn sort_key(&self, param: &str) -> Option<SortKey> {
        self.sort_keys.iter().copied().find(|k| k.param() == param)
    }

    /// Whether any role may cancel a record in `code`.
    pub fn is_cancellable(&self, code: &str) -> bool {
        self.transitions
            .iter()
            .any(|r| r.slot == SnapshotSlot::Canceler && r.allows_source(code))
    }

    /// Actions currently reachable from `code` for `role`.
    pub fn actions_for(&self, code: &str, role: ActorRole) -> Vec<&'static str> {
        self.transitions
            .iter()
            .filter(|r| r.allows_source(code) && r.admits(role))
            .map(|r| r.action)
            .collect()
    }
}

use ActorRole::{Admin, DepartmentApprover, Driver, FinalApprover, Requester};
use StepState::{Canceled, Current, Done, Pending, Warning};

#[rustfmt::skip]
const BOOKING_TRANSITIONS: &[TransitionRule] = &[
    TransitionRule { action: "approve", from: &["20"], to: "30", roles: &[DepartmentApprover, FinalApprover], slot: SnapshotSlot::Approver, reason: ReasonPolicy::None },
    TransitionRule { action: "send_back", from: &["20"], to: "21", roles: &[DepartmentApprover, FinalApprover], slot: SnapshotSlot::Approver, reason: ReasonPolicy::Required },
    TransitionRule { action: "resubmit", from: &["21"], to: "20", roles: &[Requester], slot: SnapshotSlot::Requester, reason: ReasonPolicy::None },
    TransitionRule { action: "assign_key", from: &["30"], to: "50", roles: &[Admin], slot: SnapshotSlot::KeyHandover, reason: ReasonPolicy::None },
    TransitionRule { action: "receive_key", from: &["50"], to: "51", roles: &[Driver, Requester], slot: SnapshotSlot::KeyReceiver, reason: ReasonPolicy::None },
    TransitionRule { action: "start_trip", from: &["51"], to: "60", roles: &[Driver, Requester], slot: SnapshotSlot::Pickup, reason: ReasonPolicy::None },
    TransitionRule { action: "return_vehicle", from: &["60"], to: "70", roles: &[Driver, Requester], slot: SnapshotSlot::Returner, reason: ReasonPolicy::None },
    TransitionRule { action: "accept_return", from: &["70"], to: "80", roles: &[Admin], slot: SnapshotSlot::Inspector, reason: ReasonPolicy::None },
    TransitionRule { action: "reject_return", from: &["70"], to: "71", roles: &[Admin], slot: SnapshotSlot::Inspector, reason: ReasonPolicy::Required },
    TransitionRule { action: "resubmit_return", from: &["71"], to: "70", roles: &[Driver, Requester], slot: SnapshotSlot::Returner, reason: ReasonPolicy::None },
    TransitionRule {
        action: "cancel",
        from: &["20", "21", "30", "50", "51", "60", "70", "71"],
        to: "90",
        roles: &[Requester, DepartmentApprover, FinalApprover, Admin],
        slot: SnapshotSlot::Canceler,
        reason: ReasonPolicy::Optional,
    },
];

#[rustfmt::skip]
const LICENSE_ANNUAL_TRANSITIONS: &[TransitionRule] = &[
    TransitionRule { action: "resubmit", from: &["11", "21"], to: "10", roles: &[Requester], slot: SnapshotSlot::Requester, reason: ReasonPolicy::None },
    TransitionRule { action: "department_approve", from: &["10"], to: "20", roles: &[DepartmentApprover], slot: SnapshotSlot::DepartmentApprover, reason: ReasonPolicy::None },
    TransitionRule { action: "department_send_back", from: &["10"], to: "11", roles: &[DepartmentApprover], slot: SnapshotSlot::DepartmentApprover, reason: ReasonPolicy::Required },
    TransitionRule { action: "authority_approve", from: &["20"], to: "30", roles: &[FinalApprover], slot: SnapshotSlot::FinalApprover, reason: ReasonPolicy::None },
    TransitionRule { action: "authority_send_back", from: &["20"], to: "21", roles: &[FinalApprover], slot: SnapshotSlot::FinalApprover, reason: ReasonPolicy::Required },
    TransitionRule { action: "cancel_before_approval", from: &["10", "11"], to: "90", roles: &[Requester], slot: SnapshotSlot::Canceler, reason: ReasonPolicy::Optional },
    TransitionRule { action: "cancel_after_approval", from: &["20", "21"], to: "91", roles: &[Requester], slot: SnapshotSlot::Canceler, reason: ReasonPolicy::Optional },
    TransitionRule { action: "department_cancel", from: &["10", "20"], to: "92", roles: &[DepartmentApprover], slot: SnapshotSlot::Canceler, reason: ReasonPolicy::Required },
    TransitionRule { action: "authority_cancel", from: &["20", "30"], to: "93", roles: &[FinalApprover], slot: SnapshotSlot::Canceler, reason: ReasonPolicy::Required },
];

static BOOKING: DomainDescriptor = DomainDescriptor {
    domain: WorkflowDomain::Booking,
    slug: "booking",
    request_prefix: "BK",
    registry: StatusRegistry::new(BOOKING_STATUSES),
    initial_status: "20",
    terminal_statuses: &["80", "90"],
    editable_statuses: &["20", "21"],
    transitions: BOOKING_TRANSITIONS,
    status_param: "ref_request_status_code",
    search_columns: &[
        SearchColumn::RequestNo,
        SearchColumn::VehiclePlate,
        SearchColumn::RequesterName,
        SearchColumn::WorkPlace,
    ],
    date_column: DateColumn::StartAt,
    sort_keys: &[SortKey::RequestNo, SortKey::StartAt, SortKey::Status, SortKey::CreatedAt],
    default_sort: SortKey::StartAt,
    progress_labels: &["Submitted", "Approval", "Key handover", "Trip", "Return inspection"],
    progress_plan: &[
        ("20", &[Done, Current, Pending, Pending, Pending]),
        ("21", &[Done, Warning, Pending, Pending, Pending]),
        ("30", &[Done, Done, Current, Pending, Pending]),
        ("50", &[Done, Done, Current, Pending, Pending]),
        ("51", &[Done, Done, Done, Current, Pending]),
        ("60", &[Done, Done, Done, Current, Pending]),
        ("70", &[Done, Done, Done, Done, Current]),
        ("71", &[Done, Done, Done, Done, Warning]),
        ("80", &[Done, Done, Done, Done, Done]),
        ("90", &[Done, Canceled, Canceled, Canceled, Canceled]),
    ],
};

static LICENSE_ANNUAL: DomainDescriptor = DomainDescriptor {
    domain: WorkflowDomain::LicenseAnnual,
    slug: "license-annual",
    request_prefix: "DL",
    registry: StatusRegistry::new(LICENSE_ANNUAL_STATUSES),
    initial_status: "10",
    terminal_statuses: &["90", "91", "92", "93"],
    editable_statuses: &["10", "11"],
    transitions: LICENSE_ANNUAL_TRANSITIONS,
    status_param: "ref_request_annual_driver_status_code",
    search_columns: &[SearchColumn::RequestNo, SearchColumn::RequesterName],
    date_column: DateColumn::CreatedAt,
    sort_keys: &[SortKey::RequestNo, SortKey::CreatedAt, SortKey::Status],
    default_sort: SortKey::CreatedAt,
    progress_labels: &["Submitted", "Department approval", "Authority approval"],
    progress_plan: &[
        ("10", &[Done, Current, Pending]),
        ("11", &[Done, Warning, Pending]),
        ("20", &[Done, Done, Current]),
        ("21", &[Done, Done, Warning]),
        ("30", &[Done, Done, Done]),
        ("90", &[Done, Canceled, Canceled]),
        ("91", &[Done, Done, Canceled]),
        ("92", &[Done, Canceled, Canceled]),
        ("93", &[Done, Done, Canceled]),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_transition_stays_inside_the_status_universe() {
        for domain in WorkflowDomain::ALL {
            let descriptor = domain.descriptor();
            let registry = descriptor.registry;
            assert!(registry.contains(descriptor.initial_status));
            for rule in descriptor.transitions {
                assert!(registry.contains(rule.to), "{}: {} targets unknown code", domain, rule.action);
                for source in rule.from {
                    assert!(registry.contains(source), "{}: {} from unknown code", domain, rule.action);
                    assert!(!descriptor.is_terminal(source), "{}: {} leaves a terminal status", domain, rule.action);
                }
                assert!(!rule.roles.is_empty());
            }
        }
    }

    #[test]
    fn actions_are_unique_per_domain() {
        for domain in WorkflowDomain::ALL {
            let mut actions: Vec<&str> = domain.descriptor().transitions.iter().map(|r| r.action).collect();
            let total = actions.len();
            actions.sort();
            actions.dedup();
            assert_eq!(actions.len(), total);
        }
    }

    #[test]
    fn progress_plan_covers_every_code_with_every_label() {
        for domain in WorkflowDomain::ALL {
            let descriptor = domain.descriptor();
            for code in descriptor.registry.all_codes() {
                let plan = descriptor.progress_plan.iter().find(|(c, _)| *c == code);
                let (_, states) = plan.unwrap_or_else(|| panic!("{}: no progress plan for {}", domain, code));
                assert_eq!(states.len(), descriptor.progress_labels.len());
            }
        }
    }

    #[test]
    fn non_terminal_booking_statuses_can_be_canceled() {
        let descriptor = WorkflowDomain::Booking.descriptor();
        let cancel = descriptor.rule("cancel").unwrap();
        for code in descriptor.registry.all_codes() {
            assert_eq!(cancel.allows_source(code), !descriptor.is_terminal(code), "code {}", code);
        }
    }

    #[test]
    fn domain_slugs_parse() {
        assert_eq!("booking".parse::<WorkflowDomain>().unwrap(), WorkflowDomain::Booking);
        assert_eq!("license-annual".parse::<WorkflowDomain>().unwrap(), WorkflowDomain::LicenseAnnual);
        assert!("fuel".parse::<WorkflowDomain>().is_err());
    }

    #[test]
    fn actions_for_filters_by_role_and_source() {
        let descriptor = WorkflowDomain::LicenseAnnual.descriptor();
        assert_eq!(descriptor.actions_for("20", FinalApprover), vec!["authority_approve", "authority_send_back", "authority_cancel"]);
        assert_eq!(descriptor.actions_for("30", Requester), Vec::<&str>::new());
    }

    #[test]
    fn cancellable_follows_canceler_rules_in_both_domains() {
        let booking = WorkflowDomain::Booking.descriptor();
        assert!(booking.is_cancellable("20"));
        assert!(!booking.is_cancellable("80"));
        assert!(!booking.is_cancellable("90"));

        let license = WorkflowDomain::LicenseAnnual.descriptor();
        for code in ["10", "11", "20", "21", "30"] {
            assert!(license.is_cancellable(code), "code {}", code);
        }
        for code in ["90", "91", "92", "93"] {
            assert!(!license.is_cancellable(code), "code {}", code);
        }
    }
}
