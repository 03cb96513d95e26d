// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Status Registry
//!
//! Static per-domain table of status codes, display names and menu buckets.
//! Tables are `&'static` and never change after compilation, so the registry
//! needs no initialisation and can be shared freely across requests.
//!
//! Several codes may share a display name (e.g. booking `51` and `60` are both
//! "In use"). Callers cannot tell such codes apart, so status filters are
//! expanded to every code carrying the same name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain-scoped status code (e.g. `"50"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub String);

impl StatusCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatusCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl PartialEq<&str> for StatusCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDefinition {
    pub code: &'static str,
    pub name: &'static str,
    pub bucket: &'static str,
}

/// Read-only view over one domain's status table.
#[derive(Debug, Clone, Copy)]
pub struct StatusRegistry {
    definitions: &'static [StatusDefinition],
}

impl StatusRegistry {
    /// Tables must be listed in ascending code order.
    pub const fn new(definitions: &'static [StatusDefinition]) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &'static [StatusDefinition] {
        self.definitions
    }

    pub fn get(&self, code: &str) -> Option<&'static StatusDefinition> {
        self.definitions.iter().find(|d| d.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn name_of(&self, code: &str) -> Option<&'static str> {
        self.get(code).map(|d| d.name)
    }

    pub fn bucket_of(&self, code: &str) -> Option<&'static str> {
        self.get(code).map(|d| d.bucket)
    }

    /// Every code in the universe, ascending.
    pub fn all_codes(&self) -> impl Iterator<Item = &'static str> {
        self.definitions.iter().map(|d| d.code)
    }

    /// All codes displayed under the same name as `code` (including itself).
    pub fn codes_sharing_name(&self, code: &str) -> Vec<&'static str> {
        match self.name_of(code) {
            Some(name) => self
                .definitions
                .iter()
                .filter(|d| d.name == name)
                .map(|d| d.code)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn codes_in_bucket(&self, bucket: &str) -> Vec<&'static str> {
        self.definitions
            .iter()
            .filter(|d| d.bucket == bucket)
            .map(|d| d.code)
            .collect()
    }

    /// Distinct bucket keys in first-appearance order.
    pub fn buckets(&self) -> Vec<&'static str> {
        let mut buckets: Vec<&'static str> = Vec::new();
        for definition in self.definitions {
            if !buckets.contains(&definition.bucket) {
                buckets.push(definition.bucket);
            }
        }
        buckets
    }
}

pub const BOOKING_STATUSES: &[StatusDefinition] = &[
    StatusDefinition { code: "20", name: "Pending approval", bucket: "pending" },
    StatusDefinition { code: "21", name: "Sent back", bucket: "pending" },
    StatusDefinition { code: "30", name: "Approved", bucket: "approved" },
    StatusDefinition { code: "50", name: "Awaiting key pickup", bucket: "key_handover" },
    StatusDefinition { code: "51", name: "In use", bucket: "in_progress" },
    StatusDefinition { code: "60", name: "In use", bucket: "in_progress" },
    StatusDefinition { code: "70", name: "Returned, awaiting inspection", bucket: "in_progress" },
    StatusDefinition { code: "71", name: "Return sent back", bucket: "in_progress" },
    StatusDefinition { code: "80", name: "Complete", bucket: "complete" },
    StatusDefinition { code: "90", name: "Canceled", bucket: "canceled" },
];

pub const LICENSE_ANNUAL_STATUSES: &[StatusDefinition] = &[
    StatusDefinition { code: "10", name: "Pending department approval", bucket: "pending" },
    StatusDefinition { code: "11", name: "Sent back", bucket: "sent_back" },
    StatusDefinition { code: "20", name: "Pending authority approval", bucket: "pending" },
    StatusDefinition { code: "21", name: "Sent back", bucket: "sent_back" },
    StatusDefinition { code: "30", name: "Approved", bucket: "approved" },
    StatusDefinition { code: "90", name: "Canceled by requester", bucket: "canceled" },
    StatusDefinition { code: "91", name: "Canceled by requester", bucket: "canceled" },
    StatusDefinition { code: "92", name: "Canceled by department", bucket: "canceled" },
    StatusDefinition { code: "93", name: "Canceled by authority", bucket: "canceled" },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ascending(table: &[StatusDefinition]) {
        let codes: Vec<&str> = table.iter().map(|d| d.code).collect();
        let mut sorted = codes.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(codes, sorted, "status table must be unique and ascending");
    }

    #[test]
    fn tables_are_unique_and_ascending() {
        assert_ascending(BOOKING_STATUSES);
        assert_ascending(LICENSE_ANNUAL_STATUSES);
    }

    #[test]
    fn lookups_resolve_names_and_buckets() {
        let registry = StatusRegistry::new(BOOKING_STATUSES);
        assert_eq!(registry.name_of("30"), Some("Approved"));
        assert_eq!(registry.bucket_of("71"), Some("in_progress"));
        assert_eq!(registry.name_of("99"), None);
        assert!(!registry.contains("99"));
    }

    #[test]
    fn codes_sharing_a_name_are_grouped() {
        let registry = StatusRegistry::new(BOOKING_STATUSES);
        assert_eq!(registry.codes_sharing_name("51"), vec!["51", "60"]);
        assert_eq!(registry.codes_sharing_name("80"), vec!["80"]);
        assert!(registry.codes_sharing_name("nope").is_empty());

        let license = StatusRegistry::new(LICENSE_ANNUAL_STATUSES);
        assert_eq!(license.codes_sharing_name("21"), vec!["11", "21"]);
    }

    #[test]
    fn buckets_keep_first_appearance_order() {
        let registry = StatusRegistry::new(BOOKING_STATUSES);
        assert_eq!(
            registry.buckets(),
            vec!["pending", "approved", "key_handover", "in_progress", "complete", "canceled"]
        );
        assert_eq!(registry.codes_in_bucket("in_progress"), vec!["51", "60", "70", "71"]);
    }
}
