// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-enrollment matching.
//!
//! When an agent registers with no workflow addressed to it, its reported
//! attributes are matched against every rule set; the first match decides
//! the workflow to materialize. Creation itself belongs to the transport
//! collaborator; this module only answers "which rule set, and what
//! shape".

use serde_json::Value;
use tink_core::WorkflowRuleSet;
use tink_render::{RuleError, RuleMatcher};
use tracing::debug;

/// The shape of the workflow a matching registration should create.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    /// Name of the rule set that matched.
    pub rule_set: String,
    /// Namespace the workflow lands in.
    pub namespace: String,
    pub template_ref: String,
    pub disabled: bool,
    /// Indexes of the matching rules, for audit logging.
    pub matched_rules: Vec<usize>,
}

/// Match agent attributes against rule sets, first match wins.
///
/// Rule sets are evaluated in the given order. A rule set whose rules
/// fail to evaluate is skipped rather than failing registration.
pub fn match_rule_sets(
    matcher: &dyn RuleMatcher,
    rule_sets: &[WorkflowRuleSet],
    attributes: &Value,
) -> Result<Option<Enrollment>, RuleError> {
    for rule_set in rule_sets {
        let outcome = match matcher.evaluate(&rule_set.spec.rules, attributes) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(
                    rule_set = %rule_set.metadata.key(),
                    error = %e,
                    "skipping rule set with unevaluable rules"
                );
                continue;
            }
        };
        if !outcome.matched {
            continue;
        }

        let namespace = rule_set
            .spec
            .workflow_namespace
            .clone()
            .unwrap_or_else(|| rule_set.metadata.namespace.clone());
        return Ok(Some(Enrollment {
            rule_set: rule_set.metadata.name.clone(),
            namespace,
            template_ref: rule_set.spec.workflow.template_ref.clone(),
            disabled: rule_set.spec.workflow.disabled,
            matched_rules: outcome.matched_rules,
        }));
    }
    Ok(None)
}

#[cfg(test)]
#[path = "enroll_tests.rs"]
mod tests;
