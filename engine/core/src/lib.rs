// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! FleetFlow core
//!
//! Lifecycle engine for fleet booking and driver-license annual approval
//! workflows: status registry, transition guard and executor, audit log and
//! search aggregation, plus the HTTP surface over them.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Library consumed by the `fleetflow` binary and tests

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
