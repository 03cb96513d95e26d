// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Workflow records, their status universes and transition graphs, actor
//! scoping, audit entries and the persistence contracts.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure workflow model; no I/O besides the repository traits

pub mod actor;
pub mod audit;
pub mod config;
pub mod error;
pub mod progress;
pub mod record;
pub mod reference;
pub mod repository;
pub mod scope;
pub mod search;
pub mod status;
pub mod workflow;
