// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`fleetflow-core`)
//!
//! HTTP surface that translates external requests into application service
//! calls. Handlers only parse, authenticate the header identity and map
//! errors; all workflow decisions live in `crate::application`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP (Axum) | Record lifecycle, search, audit history, uploads |

pub mod api;
