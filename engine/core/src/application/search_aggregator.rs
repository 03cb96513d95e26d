// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Search Aggregator
//!
//! Answers a list-screen query for one domain in one pass over the store:
//!
//! 1. Parse the raw query (csv status filter, dates, sort, paging).
//! 2. Expand the status filter to every code sharing a display name.
//! 3. Fetch the sorted page and the total under the full filter.
//! 4. Count per status under the same filter minus the status restriction,
//!    zero-filled over the whole universe.
//! 5. Join reference attributes and annotate each record for display.

use chrono::NaiveDate;
use metrics::counter;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::domain::actor::ActorContext;
use crate::domain::audit::Pagination;
use crate::domain::error::{WorkflowError, WorkflowResult};
use crate::domain::record::WorkflowRecord;
use crate::domain::reference::{RecordReferences, ReferenceDirectory};
use crate::domain::repository::WorkflowRecordRepository;
use crate::domain::scope::Scope;
use crate::domain::search::{
    BucketSummary, PageRequest, RecordFilter, RecordSort, RecordView, SearchResult, StatusSummary, UiFlags,
};
use crate::domain::status::{StatusCode, StatusRegistry};
use crate::domain::workflow::{SortDirection, WorkflowDomain};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parsed list-screen query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Raw codes as supplied, before name expansion.
    pub statuses: Vec<String>,
    pub order_by: Option<String>,
    pub order_dir: Option<SortDirection>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl SearchParams {
    /// Parse query-string pairs. The status filter is read from the domain's
    /// own parameter name or from `status`.
    pub fn from_query(domain: WorkflowDomain, query: &HashMap<String, String>) -> WorkflowResult<Self> {
        let non_empty = |key: &str| query.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let statuses = non_empty(domain.descriptor().status_param)
            .or_else(|| non_empty("status"))
            .map(|csv| {
                csv.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            search: non_empty("search").map(str::to_string),
            start_date: non_empty("startdate").map(parse_date).transpose()?,
            end_date: non_empty("enddate").map(parse_date).transpose()?,
            statuses,
            order_by: non_empty("order_by").map(str::to_string),
            order_dir: non_empty("order_dir")
                .map(|v| v.parse::<SortDirection>().map_err(WorkflowError::Validation))
                .transpose()?,
            page: non_empty("page").map(|v| parse_number("page", v)).transpose()?,
            limit: non_empty("limit").map(|v| parse_number("limit", v)).transpose()?,
        })
    }
}

fn parse_date(value: &str) -> WorkflowResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| WorkflowError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

fn parse_number(name: &str, value: &str) -> WorkflowResult<u32> {
    value
        .parse::<u32>()
        .map_err(|_| WorkflowError::validation(format!("{} must be a positive integer, got '{}'", name, value)))
}

/// Expand requested codes to every code sharing a display name with one of
/// them, in registry order. Unknown codes are rejected.
pub fn expand_statuses(registry: &StatusRegistry, requested: &[String]) -> WorkflowResult<Vec<StatusCode>> {
    let mut wanted: Vec<&'static str> = Vec::new();
    for code in requested {
        if !registry.contains(code) {
            return Err(WorkflowError::validation(format!("Unknown status code '{}'", code)));
        }
        for sibling in registry.codes_sharing_name(code) {
            if !wanted.contains(&sibling) {
                wanted.push(sibling);
            }
        }
    }
    Ok(registry
        .all_codes()
        .filter(|code| wanted.contains(code))
        .map(StatusCode::from)
        .collect())
}

/// Page-size bounds applied to every search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PagingLimits {
    fn default() -> Self {
        Self { default_page_size: 10, max_page_size: 100 }
    }
}

impl PagingLimits {
    pub fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        let limit = limit.unwrap_or(self.default_page_size).min(self.max_page_size);
        PageRequest::new(page.unwrap_or(1), limit)
    }
}

/// Annotate a record for display.
pub fn annotate(record: WorkflowRecord, references: RecordReferences, today: NaiveDate) -> RecordView {
    let registry = record.domain.registry();
    let code = record.status.as_str();
    RecordView {
        status_name: registry.name_of(code).unwrap_or("Unknown"),
        status_bucket: registry.bucket_of(code).unwrap_or("unknown"),
        flags: UiFlags::evaluate(&record, today),
        references,
        record,
    }
}

pub struct SearchAggregator {
    records: Arc<dyn WorkflowRecordRepository>,
    references: Arc<dyn ReferenceDirectory>,
    limits: PagingLimits,
}

impl SearchAggregator {
    pub fn new(
        records: Arc<dyn WorkflowRecordRepository>,
        references: Arc<dyn ReferenceDirectory>,
        limits: PagingLimits,
    ) -> Self {
        Self { records, references, limits }
    }

    pub fn limits(&self) -> PagingLimits {
        self.limits
    }

    pub async fn search(
        &self,
        domain: WorkflowDomain,
        actor: &ActorContext,
        params: &SearchParams,
        today: NaiveDate,
    ) -> WorkflowResult<SearchResult> {
        let descriptor = domain.descriptor();
        let registry = descriptor.registry;

        if let (Some(from), Some(to)) = (params.start_date, params.end_date) {
            if from > to {
                return Err(WorkflowError::validation("startdate must not be after enddate"));
            }
        }

        let key = match params.order_by.as_deref() {
            Some(param) => descriptor.sort_key(param).ok_or_else(|| {
                WorkflowError::validation(format!("Unsupported order_by '{}' for {}", param, domain))
            })?,
            None => descriptor.default_sort,
        };
        let sort = RecordSort { key, direction: params.order_dir.unwrap_or_default() };
        let page = self.limits.page_request(params.page, params.limit);

        let mut filter = RecordFilter::new(domain, Scope::for_actor(actor));
        filter.search = params.search.clone();
        filter.date_from = params.start_date;
        filter.date_to = params.end_date;
        if !params.statuses.is_empty() {
            filter.statuses = Some(expand_statuses(&registry, &params.statuses)?);
        }

        debug!(domain = %domain, filter = ?filter, page = page.page, limit = page.limit, "Running record search");

        let records = self.records.search(&filter, sort, page).await?;
        let total = self.records.count(&filter).await?;
        let counts: BTreeMap<StatusCode, u64> = self
            .records
            .count_by_status(&filter.without_statuses())
            .await?
            .into_iter()
            .collect();
        let references = self.references.resolve(&records).await?;

        let summary: Vec<StatusSummary> = registry
            .definitions()
            .iter()
            .map(|d| StatusSummary {
                code: d.code.to_string(),
                name: d.name,
                count: counts.get(&StatusCode::from(d.code)).copied().unwrap_or(0),
            })
            .collect();

        let buckets = registry
            .buckets()
            .into_iter()
            .map(|bucket| {
                let codes = registry.codes_in_bucket(bucket);
                let count = summary.iter().filter(|s| codes.contains(&s.code.as_str())).map(|s| s.count).sum();
                BucketSummary { bucket, codes, count }
            })
            .collect();

        counter!("fleetflow_searches_total", "domain" => domain.slug()).increment(1);

        Ok(SearchResult {
            pagination: Pagination::new(total, page.page, page.limit),
            records: records
                .into_iter()
                .zip(references.into_iter().chain(std::iter::repeat_with(RecordReferences::default)))
                .map(|(record, refs)| annotate(record, refs, today))
                .collect(),
            summary,
            buckets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn status_filter_expands_by_display_name() {
        let registry = WorkflowDomain::Booking.registry();
        let expanded = expand_statuses(&registry, &["51".to_string()]).unwrap();
        assert_eq!(expanded, vec![StatusCode::from("51"), StatusCode::from("60")]);

        let license = WorkflowDomain::LicenseAnnual.registry();
        let expanded = expand_statuses(&license, &["21".to_string(), "90".to_string()]).unwrap();
        assert_eq!(
            expanded,
            vec!["11", "21", "90", "91"].into_iter().map(StatusCode::from).collect::<Vec<_>>()
        );
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let registry = WorkflowDomain::Booking.registry();
        assert!(matches!(expand_statuses(&registry, &["99".to_string()]), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn query_parsing_uses_domain_status_param() {
        let params = SearchParams::from_query(
            WorkflowDomain::LicenseAnnual,
            &query(&[
                ("ref_request_annual_driver_status_code", "10, 20,"),
                ("startdate", "2026-01-01"),
                ("order_dir", "ASC"),
                ("page", "2"),
            ]),
        )
        .unwrap();
        assert_eq!(params.statuses, vec!["10".to_string(), "20".to_string()]);
        assert_eq!(params.start_date, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(params.order_dir, Some(SortDirection::Asc));
        assert_eq!(params.page, Some(2));
        assert_eq!(params.limit, None);

        assert!(SearchParams::from_query(WorkflowDomain::Booking, &query(&[("startdate", "01/02/2026")])).is_err());
        assert!(SearchParams::from_query(WorkflowDomain::Booking, &query(&[("limit", "-5")])).is_err());
        assert!(SearchParams::from_query(WorkflowDomain::Booking, &query(&[("order_dir", "sideways")])).is_err());
    }

    #[test]
    fn paging_limits_default_and_clamp() {
        let limits = PagingLimits { default_page_size: 10, max_page_size: 50 };
        assert_eq!(limits.page_request(None, None), PageRequest { page: 1, limit: 10 });
        assert_eq!(limits.page_request(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(limits.page_request(Some(3), Some(500)), PageRequest { page: 3, limit: 50 });
    }
}
