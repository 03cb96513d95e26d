// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Workflow Record Aggregate
//!
//! A booking request or driver-license annual request moving through its
//! domain's lifecycle. A record has exactly one current status; it is created
//! in the domain's initial status, mutated only through the transition
//! executor, and never hard-deleted (only flagged with `is_deleted`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::actor::{ActorContext, ActorSnapshot};
use crate::domain::status::StatusCode;
use crate::domain::workflow::WorkflowDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which actor snapshot a transition writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSlot {
    Requester,
    Approver,
    DepartmentApprover,
    FinalApprover,
    KeyHandover,
    KeyReceiver,
    Pickup,
    Returner,
    Inspector,
    Canceler,
}

/// Actor snapshot plus optional reason recorded by one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStamp {
    pub actor: ActorSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: RecordId,
    pub domain: WorkflowDomain,
    pub request_no: String,
    pub status: StatusCode,
    pub requester: ActorSnapshot,
    pub department_id: String,
    pub carpool_id: Option<String>,
    pub driver_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub vehicle_plate: Option<String>,
    pub work_place: Option<String>,
    pub purpose: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stamps: BTreeMap<SnapshotSlot, TransitionStamp>,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub is_deleted: bool,
}

impl WorkflowRecord {
    /// Build a record in the domain's initial status on behalf of `requester`.
    pub fn submit(domain: WorkflowDomain, requester: &ActorContext, details: NewRecord, now: DateTime<Utc>) -> Self {
        let id = RecordId::new();
        let request_no = format!(
            "{}{}{}",
            domain.descriptor().request_prefix,
            now.format("%y%m%d"),
            &id.0.simple().to_string()[..6].to_uppercase()
        );

        Self {
            id,
            domain,
            request_no,
            status: StatusCode::from(domain.descriptor().initial_status),
            requester: requester.snapshot(),
            department_id: requester.department_id.clone().unwrap_or_default(),
            carpool_id: details.carpool_id,
            driver_id: details.driver_id,
            vehicle_id: details.vehicle_id,
            vehicle_plate: details.vehicle_plate,
            work_place: details.work_place,
            purpose: details.purpose,
            start_at: details.start_at,
            end_at: details.end_at,
            stamps: BTreeMap::new(),
            attachments: details.attachments,
            created_at: now,
            created_by: requester.id.clone(),
            updated_at: now,
            updated_by: requester.id.clone(),
            is_deleted: false,
        }
    }

    pub fn stamp(&self, slot: SnapshotSlot) -> Option<&TransitionStamp> {
        self.stamps.get(&slot)
    }

    /// Value of the domain's primary date column.
    pub fn primary_date(&self) -> Option<DateTime<Utc>> {
        match self.domain.descriptor().date_column {
            DateColumn::StartAt => self.start_at,
            DateColumn::CreatedAt => Some(self.created_at),
        }
    }

    /// Apply a revision of the free-form details, leaving status untouched.
    pub fn revise(&mut self, revision: &RecordRevision, actor_id: &str, now: DateTime<Utc>) {
        if let Some(work_place) = &revision.work_place {
            self.work_place = Some(work_place.clone());
        }
        if let Some(purpose) = &revision.purpose {
            self.purpose = Some(purpose.clone());
        }
        if let Some(start_at) = revision.start_at {
            self.start_at = Some(start_at);
        }
        if let Some(end_at) = revision.end_at {
            self.end_at = Some(end_at);
        }
        if let Some(vehicle_plate) = &revision.vehicle_plate {
            self.vehicle_plate = Some(vehicle_plate.clone());
        }
        self.updated_at = now;
        self.updated_by = actor_id.to_string();
    }
}

/// Single-row change written by one transition.
#[derive(Debug, Clone)]
pub struct TransitionUpdate {
    pub record_id: RecordId,
    /// Status the guard observed; the update only applies while it still holds.
    pub expected_status: StatusCode,
    pub target_status: StatusCode,
    pub slot: SnapshotSlot,
    pub stamp: TransitionStamp,
    pub attachments: Vec<String>,
    pub updated_by: String,
}

impl TransitionUpdate {
    /// Whether the conditional update would match `record`.
    pub fn applies_to(&self, record: &WorkflowRecord) -> bool {
        record.id == self.record_id && !record.is_deleted && record.status == self.expected_status
    }

    pub fn apply(&self, record: &mut WorkflowRecord) {
        record.status = self.target_status.clone();
        record.stamps.insert(self.slot, self.stamp.clone());
        record.attachments.extend(self.attachments.iter().cloned());
        record.updated_at = self.stamp.at;
        record.updated_by = self.updated_by.clone();
    }
}

/// Column a domain's date-range filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateColumn {
    StartAt,
    CreatedAt,
}

impl DateColumn {
    pub fn column_name(&self) -> &'static str {
        match self {
            DateColumn::StartAt => "start_at",
            DateColumn::CreatedAt => "created_at",
        }
    }
}

/// Caller-supplied fields for a new record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default)]
    pub carpool_id: Option<String>,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub vehicle_plate: Option<String>,
    #[serde(default)]
    pub work_place: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Editable fields while a record sits in an editable status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordRevision {
    #[serde(default)]
    pub work_place: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vehicle_plate: Option<String>,
}

impl RecordRevision {
    pub fn is_empty(&self) -> bool {
        self.work_place.is_none()
            && self.purpose.is_none()
            && self.start_at.is_none()
            && self.end_at.is_none()
            && self.vehicle_plate.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::ActorRole;
    use chrono::TimeZone;

    #[test]
    fn submit_starts_in_initial_status_with_requester_snapshot() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let requester = ActorContext::new("u-1", ActorRole::Requester, "Malee")
            .with_department("d-1", "HR", "Human Resources");
        let record = WorkflowRecord::submit(WorkflowDomain::Booking, &requester, NewRecord::default(), now);

        assert_eq!(record.status, "20");
        assert_eq!(record.requester.name, "Malee");
        assert_eq!(record.department_id, "d-1");
        assert!(record.request_no.starts_with("BK260314"));
        assert_eq!(record.request_no.len(), "BK260314".len() + 6);
        assert!(!record.is_deleted);

        let license = WorkflowRecord::submit(WorkflowDomain::LicenseAnnual, &requester, NewRecord::default(), now);
        assert_eq!(license.status, "10");
        assert_eq!(license.primary_date(), Some(now));
    }

    #[test]
    fn snapshot_slots_serialize_as_map_keys() {
        let mut stamps = BTreeMap::new();
        stamps.insert(
            SnapshotSlot::KeyReceiver,
            TransitionStamp { actor: ActorSnapshot::default(), reason: None, at: Utc::now() },
        );
        let json = serde_json::to_value(&stamps).unwrap();
        assert!(json.get("key_receiver").is_some());
        let back: BTreeMap<SnapshotSlot, TransitionStamp> = serde_json::from_value(json).unwrap();
        assert!(back.contains_key(&SnapshotSlot::KeyReceiver));
    }
}
