// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Error taxonomy of the workflow engine.

use serde::Serialize;
use thiserror::Error;

use crate::domain::record::RecordId;
use crate::domain::repository::RepositoryError;

/// Why a guard check missed, reported only when precondition detail is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionCause {
    NotFound,
    OutOfScope,
    WrongStatus,
    RoleNotPermitted,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed or missing input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record absent, out of the actor's scope, or in the wrong status.
    /// `cause` is `None` when the outcomes are deliberately merged.
    #[error("Precondition failed for record {record_id}{suffix}", suffix = cause_suffix(.cause))]
    PreconditionFailed {
        record_id: RecordId,
        cause: Option<PreconditionCause>,
    },

    /// The conditional update matched no row: another transition won.
    #[error("Conflict: record {0} changed before the transition could be applied")]
    Conflict(RecordId),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] RepositoryError),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    /// Stable machine-readable kind used in error bodies and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "validation_error",
            WorkflowError::PreconditionFailed { .. } => "precondition_failed",
            WorkflowError::Conflict(_) => "conflict",
            WorkflowError::Persistence(_) => "persistence_failure",
        }
    }
}

fn cause_suffix(cause: &Option<PreconditionCause>) -> String {
    cause.map(|c| format!(" ({:?})", c)).unwrap_or_default()
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
