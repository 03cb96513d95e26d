// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `fleetflow statuses <domain>`: print a domain's status registry with the
//! actions leaving each status.

use anyhow::Result;
use colored::{ColoredString, Colorize};

use fleetflow_core::domain::workflow::{DomainDescriptor, WorkflowDomain};

pub fn run(domain: &str) -> Result<()> {
    let domain: WorkflowDomain = domain.parse()?;
    print!("{}", render(domain.descriptor(), true));
    Ok(())
}

fn paint(text: String, color: bool, style: fn(&str) -> ColoredString) -> String {
    if color {
        style(&text).to_string()
    } else {
        text
    }
}

fn render(descriptor: &DomainDescriptor, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&paint(
        format!("{} (initial {}, filter param '{}')\n", descriptor.slug, descriptor.initial_status, descriptor.status_param),
        color,
        |s| s.bold(),
    ));
    out.push_str(&format!("{:<6} {:<32} {:<14} {}\n", "CODE", "NAME", "BUCKET", "ACTIONS"));

    for definition in descriptor.registry.definitions() {
        let actions: Vec<String> = descriptor
            .transitions
            .iter()
            .filter(|rule| rule.allows_source(definition.code))
            .map(|rule| format!("{} → {}", rule.action, rule.to))
            .collect();
        let code = format!("{:<6}", definition.code);
        let code = if descriptor.is_terminal(definition.code) {
            paint(code, color, |s| s.dimmed())
        } else {
            paint(code, color, |s| s.green())
        };
        let actions = if actions.is_empty() { "(terminal)".to_string() } else { actions.join(", ") };
        out.push_str(&format!("{} {:<32} {:<14} {}\n", code, definition.name, definition.bucket, actions));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_every_status_and_its_exits() {
        let table = render(WorkflowDomain::Booking.descriptor(), false);
        assert_eq!(table.lines().count(), 2 + WorkflowDomain::Booking.registry().definitions().len());
        assert!(table.contains("approve → 30"));
        let complete = table.lines().find(|l| l.starts_with("80")).unwrap();
        assert!(complete.ends_with("(terminal)"));
    }

    #[test]
    fn unknown_domain_is_rejected() {
        assert!(run("fuel").is_err());
    }
}
