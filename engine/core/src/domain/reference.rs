// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read-only reference attributes joined onto records for display.
//!
//! Vehicles, drivers, carpools and key-handover appointments are maintained by
//! plain CRUD outside the workflow engine; the engine only reads them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::record::WorkflowRecord;
use crate::domain::repository::RepositoryError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordReferences {
    pub vehicle_plate: Option<String>,
    pub driver_name: Option<String>,
    pub carpool_name: Option<String>,
    pub parking_location: Option<String>,
    pub key_pickup_at: Option<DateTime<Utc>>,
    pub key_pickup_place: Option<String>,
}

#[async_trait]
pub trait ReferenceDirectory: Send + Sync {
    /// Resolve reference attributes for each record, in input order.
    async fn resolve(&self, records: &[WorkflowRecord]) -> Result<Vec<RecordReferences>, RepositoryError>;
}
