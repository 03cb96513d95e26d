// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reference directory implementations.
//!
//! The in-memory directory is seeded programmatically (tests, demos); the
//! PostgreSQL directory joins the `vehicles`, `drivers`, `carpools` and
//! `key_handovers` tables in one round trip per page of records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::record::{RecordId, WorkflowRecord};
use crate::domain::reference::{RecordReferences, ReferenceDirectory};
use crate::domain::repository::RepositoryError;

#[derive(Debug, Clone)]
struct Vehicle {
    plate: String,
    parking_location: Option<String>,
}

#[derive(Debug, Clone)]
struct KeyHandover {
    pickup_at: Option<DateTime<Utc>>,
    pickup_place: Option<String>,
}

#[derive(Default)]
struct Tables {
    vehicles: HashMap<String, Vehicle>,
    drivers: HashMap<String, String>,
    carpools: HashMap<String, String>,
    key_handovers: HashMap<RecordId, KeyHandover>,
}

#[derive(Clone, Default)]
pub struct InMemoryReferenceDirectory {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryReferenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vehicle(&self, id: impl Into<String>, plate: impl Into<String>, parking_location: Option<String>) {
        self.tables.write().vehicles.insert(
            id.into(),
            Vehicle { plate: plate.into(), parking_location },
        );
    }

    /// Plate of a registered vehicle.
    pub fn vehicle_plate(&self, id: &str) -> Option<String> {
        self.tables.read().vehicles.get(id).map(|v| v.plate.clone())
    }

    pub fn add_driver(&self, id: impl Into<String>, name: impl Into<String>) {
        self.tables.write().drivers.insert(id.into(), name.into());
    }

    pub fn add_carpool(&self, id: impl Into<String>, name: impl Into<String>) {
        self.tables.write().carpools.insert(id.into(), name.into());
    }

    pub fn add_key_handover(&self, record_id: RecordId, pickup_at: Option<DateTime<Utc>>, pickup_place: Option<String>) {
        self.tables
            .write()
            .key_handovers
            .insert(record_id, KeyHandover { pickup_at, pickup_place });
    }
}

#[async_trait]
impl ReferenceDirectory for InMemoryReferenceDirectory {
    async fn resolve(&self, records: &[WorkflowRecord]) -> Result<Vec<RecordReferences>, RepositoryError> {
        let tables = self.tables.read();
        Ok(records
            .iter()
            .map(|record| {
                let vehicle = record.vehicle_id.as_ref().and_then(|id| tables.vehicles.get(id));
                let handover = tables.key_handovers.get(&record.id);
                RecordReferences {
                    vehicle_plate: vehicle
                        .map(|v| v.plate.clone())
                        .or_else(|| record.vehicle_plate.clone()),
                    driver_name: record.driver_id.as_ref().and_then(|id| tables.drivers.get(id)).cloned(),
                    carpool_name: record.carpool_id.as_ref().and_then(|id| tables.carpools.get(id)).cloned(),
                    parking_location: vehicle.and_then(|v| v.parking_location.clone()),
                    key_pickup_at: handover.and_then(|h| h.pickup_at),
                    key_pickup_place: handover.and_then(|h| h.pickup_place.clone()),
                }
            })
            .collect())
    }
}

pub struct PostgresReferenceDirectory {
    pool: PgPool,
}

impl PostgresReferenceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceDirectory for PostgresReferenceDirectory {
    async fn resolve(&self, records: &[WorkflowRecord]) -> Result<Vec<RecordReferences>, RepositoryError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = records.iter().map(|r| r.id.0).collect();

        let rows = sqlx::query(
            r#"
            SELECT r.id,
                   COALESCE(v.plate, r.vehicle_plate) AS vehicle_plate,
                   v.parking_location,
                   d.name AS driver_name,
                   c.name AS carpool_name,
                   k.pickup_at,
                   k.pickup_place
            FROM workflow_records r
            LEFT JOIN vehicles v ON v.id = r.vehicle_id
            LEFT JOIN drivers d ON d.id = r.driver_id
            LEFT JOIN carpools c ON c.id = r.carpool_id
            LEFT JOIN key_handovers k ON k.record_id = r.id
            WHERE r.id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<Uuid, RecordReferences> = HashMap::with_capacity(rows.len());
        for row in &rows {
            by_id.insert(
                row.try_get("id")?,
                RecordReferences {
                    vehicle_plate: row.try_get("vehicle_plate")?,
                    driver_name: row.try_get("driver_name")?,
                    carpool_name: row.try_get("carpool_name")?,
                    parking_location: row.try_get("parking_location")?,
                    key_pickup_at: row.try_get("pickup_at")?,
                    key_pickup_place: row.try_get("pickup_place")?,
                },
            );
        }

        Ok(records
            .iter()
            .map(|r| by_id.remove(&r.id.0).unwrap_or_default())
            .collect())
    }
}
