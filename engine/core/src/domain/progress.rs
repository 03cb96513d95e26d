// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Progress steps: a purely computed UI representation of where a record sits
//! in its lifecycle. Depends on nothing but the domain and the status code.

use serde::Serialize;

use crate::domain::workflow::WorkflowDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Done,
    Current,
    Pending,
    Warning,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub state: StepState,
    pub label: &'static str,
}

/// Ordered progress steps for `code`, or an empty list for a code outside the
/// domain's universe.
pub fn progress_steps(domain: WorkflowDomain, code: &str) -> Vec<ProgressStep> {
    let descriptor = domain.descriptor();
    descriptor
        .progress_plan
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, states)| {
            states
                .iter()
                .zip(descriptor.progress_labels)
                .map(|(state, label)| ProgressStep { state: *state, label })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(domain: WorkflowDomain, code: &str) -> Vec<StepState> {
        progress_steps(domain, code).into_iter().map(|s| s.state).collect()
    }

    #[test]
    fn approved_license_is_fully_done() {
        assert_eq!(
            states(WorkflowDomain::LicenseAnnual, "30"),
            vec![StepState::Done, StepState::Done, StepState::Done]
        );
    }

    #[test]
    fn sent_back_shows_warning_at_the_rejecting_stage() {
        assert_eq!(
            states(WorkflowDomain::LicenseAnnual, "21"),
            vec![StepState::Done, StepState::Done, StepState::Warning]
        );
    }

    #[test]
    fn labels_follow_the_domain_plan() {
        let steps = progress_steps(WorkflowDomain::Booking, "60");
        let labels: Vec<&str> = steps.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["Submitted", "Approval", "Key handover", "Trip", "Return inspection"]);
        assert_eq!(steps[3].state, StepState::Current);
    }

    #[test]
    fn unknown_code_has_no_steps() {
        assert!(progress_steps(WorkflowDomain::Booking, "99").is_empty());
    }
}
