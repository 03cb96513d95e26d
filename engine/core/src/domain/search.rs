// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Search Model
//!
//! Filters, sorting and result shapes shared by the search aggregator and the
//! repository backends. [`RecordFilter`] is the only thing a repository needs
//! to answer listing and counting queries; status-label expansion and
//! zero-filling happen above it, in the aggregator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Ordering;

use crate::domain::audit::Pagination;
use crate::domain::progress::ProgressStep;
use crate::domain::record::WorkflowRecord;
use crate::domain::reference::RecordReferences;
use crate::domain::scope::Scope;
use crate::domain::status::StatusCode;
use crate::domain::workflow::{SearchColumn, SortDirection, SortKey, WorkflowDomain};

/// Store-level filter. Always excludes soft-deleted records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub domain: WorkflowDomain,
    pub scope: Scope,
    /// Case-insensitive substring matched against the domain's search columns.
    pub search: Option<String>,
    /// Inclusive calendar-day bounds on the domain's primary date column.
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// `None` means no status filter; `Some(empty)` matches nothing.
    pub statuses: Option<Vec<StatusCode>>,
}

impl RecordFilter {
    pub fn new(domain: WorkflowDomain, scope: Scope) -> Self {
        Self {
            domain,
            scope,
            search: None,
            date_from: None,
            date_to: None,
            statuses: None,
        }
    }

    /// Same filter with the explicit status restriction removed.
    pub fn without_statuses(&self) -> Self {
        Self { statuses: None, ..self.clone() }
    }

    pub fn matches(&self, record: &WorkflowRecord) -> bool {
        self.matches_with_plate(record, record.vehicle_plate.as_deref())
    }

    /// Like [`RecordFilter::matches`], but searches `displayed_plate` in place
    /// of the record's own free-text plate.
    pub fn matches_with_plate(&self, record: &WorkflowRecord, displayed_plate: Option<&str>) -> bool {
        if record.is_deleted || record.domain != self.domain || !self.scope.matches(record) {
            return false;
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&record.status) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let needle = term.to_lowercase();
            let hit = self
                .domain
                .descriptor()
                .search_columns
                .iter()
                .filter_map(|column| column_value(record, *column, displayed_plate))
                .any(|value| value.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(day) = record.primary_date().map(|d| d.date_naive()) else {
                return false;
            };
            if self.date_from.is_some_and(|from| day < from) || self.date_to.is_some_and(|to| day > to) {
                return false;
            }
        }
        true
    }
}

fn column_value<'a>(record: &'a WorkflowRecord, column: SearchColumn, plate: Option<&'a str>) -> Option<&'a str> {
    match column {
        SearchColumn::RequestNo => Some(record.request_no.as_str()),
        SearchColumn::VehiclePlate => plate,
        SearchColumn::RequesterName => Some(record.requester.name.as_str()),
        SearchColumn::WorkPlace => record.work_place.as_deref(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl RecordSort {
    /// Total order: the sort key, then record id ascending so pages partition
    /// the result set deterministically. Missing dates sort last ascending.
    pub fn compare(&self, a: &WorkflowRecord, b: &WorkflowRecord) -> Ordering {
        let primary = match self.key {
            SortKey::RequestNo => a.request_no.cmp(&b.request_no),
            SortKey::StartAt => compare_optional(a.start_at, b.start_at),
            SortKey::Status => a.status.cmp(&b.status),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn compare_optional(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Coerces both values to at least 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page: page.max(1), limit: limit.max(1) }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// UI-decision flags derived from the record's own data and the current date.
///
/// The flags do not depend on who is asking: `can_cancel` means some role may
/// still cancel from the current status. Per-actor reachability is
/// [`RecordDetail::available_actions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UiFlags {
    pub can_edit: bool,
    pub can_cancel: bool,
    pub can_confirm_key_pickup: bool,
    pub can_confirm_pickup: bool,
    pub can_return: bool,
    pub is_overdue: bool,
}

impl UiFlags {
    pub fn evaluate(record: &WorkflowRecord, today: NaiveDate) -> Self {
        let descriptor = record.domain.descriptor();
        let status = record.status.as_str();
        let start_day = record.start_at.map(|d| d.date_naive());
        let end_day = record.end_at.map(|d| d.date_naive());
        let within_trip_window =
            start_day.is_some_and(|start| start <= today) && end_day.is_none_or(|end| today <= end);

        match record.domain {
            WorkflowDomain::Booking => Self {
                can_edit: descriptor.is_editable(status),
                can_cancel: descriptor.is_cancellable(status),
                can_confirm_key_pickup: status == "50" && end_day.is_none_or(|end| today <= end),
                can_confirm_pickup: status == "51" && within_trip_window,
                can_return: status == "60",
                is_overdue: matches!(status, "50" | "51" | "60") && end_day.is_some_and(|end| end < today),
            },
            WorkflowDomain::LicenseAnnual => Self {
                can_edit: descriptor.is_editable(status),
                can_cancel: descriptor.is_cancellable(status),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: WorkflowRecord,
    pub status_name: &'static str,
    pub status_bucket: &'static str,
    pub references: RecordReferences,
    pub flags: UiFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordDetail {
    #[serde(flatten)]
    pub view: RecordView,
    pub progress: Vec<ProgressStep>,
    /// Actions the requesting actor could attempt from the current status.
    pub available_actions: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub code: String,
    pub name: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSummary {
    pub bucket: &'static str,
    pub codes: Vec<&'static str>,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub pagination: Pagination,
    pub records: Vec<RecordView>,
    pub summary: Vec<StatusSummary>,
    pub buckets: Vec<BucketSummary>,
}
