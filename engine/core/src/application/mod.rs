// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod audit_logger;
pub mod repository_factory;
pub mod search_aggregator;
pub mod transition_executor;
pub mod transition_guard;
pub mod workflow_service;

// Re-export the service surface for convenience
pub use search_aggregator::SearchParams;
pub use transition_executor::TransitionMetadata;
pub use workflow_service::{EngineSettings, StandardWorkflowService, WorkflowService};
