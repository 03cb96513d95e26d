// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Actors and Roles
//!
//! The acting identity is resolved upstream (authentication is an external
//! collaborator) and handed to the engine as an [`ActorContext`]. The engine
//! never mutates it; it only copies fields from it onto records (as an
//! [`ActorSnapshot`]) and onto audit entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of actor roles that can act on a workflow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Requester,
    DepartmentApprover,
    FinalApprover,
    Driver,
    Admin,
}

impl ActorRole {
    pub const ALL: [ActorRole; 5] = [
        ActorRole::Requester,
        ActorRole::DepartmentApprover,
        ActorRole::FinalApprover,
        ActorRole::Driver,
        ActorRole::Admin,
    ];

    /// Stable tag persisted on audit entries.
    pub fn as_tag(&self) -> &'static str {
        match self {
            ActorRole::Requester => "requester",
            ActorRole::DepartmentApprover => "department_approver",
            ActorRole::FinalApprover => "final_approver",
            ActorRole::Driver => "driver",
            ActorRole::Admin => "admin",
        }
    }

    /// Human-readable label shown next to audit entries.
    pub fn label(&self) -> &'static str {
        match self {
            ActorRole::Requester => "Requester",
            ActorRole::DepartmentApprover => "Department approver",
            ActorRole::FinalApprover => "Final approver",
            ActorRole::Driver => "Driver",
            ActorRole::Admin => "Fleet administrator",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown actor role: '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for ActorRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActorRole::ALL
            .into_iter()
            .find(|role| role.as_tag() == s.trim())
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Denormalised copy of an actor taken at the moment of a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub department_short: Option<String>,
    #[serde(default)]
    pub department_full: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Authenticated acting identity supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub id: String,
    pub role: ActorRole,
    pub name: String,
    pub department_id: Option<String>,
    pub department_short: Option<String>,
    pub department_full: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    /// Carpools this actor administers (admin scoping).
    #[serde(default)]
    pub carpool_ids: Vec<String>,
}

impl ActorContext {
    pub fn new(id: impl Into<String>, role: ActorRole, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            name: name.into(),
            department_id: None,
            department_short: None,
            department_full: None,
            position: None,
            phone: None,
            carpool_ids: Vec::new(),
        }
    }

    pub fn with_department(mut self, id: impl Into<String>, short: impl Into<String>, full: impl Into<String>) -> Self {
        self.department_id = Some(id.into());
        self.department_short = Some(short.into());
        self.department_full = Some(full.into());
        self
    }

    pub fn with_carpools(mut self, carpool_ids: Vec<String>) -> Self {
        self.carpool_ids = carpool_ids;
        self
    }

    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            department_short: self.department_short.clone(),
            department_full: self.department_full.clone(),
            position: self.position.clone(),
            phone: self.phone.clone(),
        }
    }
}
