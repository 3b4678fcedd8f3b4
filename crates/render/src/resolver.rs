// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference resolution under the allow/deny policy.

use crate::rules::RuleMatcher;
use indexmap::IndexMap;
use serde_json::{json, Value};
use tink_core::Hardware;
use tink_store::DynamicReader;
use tracing::debug;

/// Allow/deny rule lists evaluated per reference.
///
/// A reference is rejected when a deny rule matches and no allow rule
/// does. The default policy denies every named reference; operators widen
/// access through the allow list.
#[derive(Debug, Clone)]
pub struct ReferencePolicy {
    pub deny: Vec<Value>,
    pub allow: Vec<Value>,
}

impl Default for ReferencePolicy {
    fn default() -> Self {
        Self {
            deny: vec![json!({"reference": {"name": [{"wildcard": "*"}]}})],
            allow: Vec::new(),
        }
    }
}

impl ReferencePolicy {
    /// Policy that admits everything. Test and break-glass use.
    pub fn allow_all() -> Self {
        Self {
            deny: Vec::new(),
            allow: Vec::new(),
        }
    }
}

/// Outcome of resolving a hardware's reference map.
#[derive(Debug, Default)]
pub struct ResolvedReferences {
    /// Admitted and fetched objects, keyed by the user-given name.
    pub objects: IndexMap<String, Value>,
    /// Evaluation and fetch failures, in reference order. Denials are not
    /// errors.
    pub errors: Vec<String>,
}

impl ResolvedReferences {
    /// Joined error text, if anything went wrong.
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("; "))
        }
    }
}

/// Resolve every named reference on the hardware.
///
/// Failures accumulate; the render proceeds with whatever succeeded.
pub async fn resolve_references<D: DynamicReader>(
    matcher: &dyn RuleMatcher,
    policy: &ReferencePolicy,
    reader: &D,
    hardware: &Hardware,
) -> ResolvedReferences {
    let mut resolved = ResolvedReferences::default();

    for (name, reference) in &hardware.spec.references {
        let event = json!({
            "source": {
                "name": hardware.metadata.name,
                "namespace": hardware.metadata.namespace,
            },
            "reference": {
                "group": reference.group,
                "version": reference.version,
                "resource": reference.resource,
                "name": reference.name,
                "namespace": reference.namespace,
            },
        });

        let denied = match matcher.evaluate(&policy.deny, &event) {
            Ok(outcome) => outcome.matched,
            Err(e) => {
                resolved.errors.push(format!("reference {name:?}: deny rules: {e}"));
                continue;
            }
        };
        let allowed = match matcher.evaluate(&policy.allow, &event) {
            Ok(outcome) => outcome.matched,
            Err(e) => {
                resolved.errors.push(format!("reference {name:?}: allow rules: {e}"));
                continue;
            }
        };

        if denied && !allowed {
            debug!(
                hardware = %hardware.metadata.key(),
                reference = %name,
                "reference denied by policy"
            );
            continue;
        }

        match reader
            .read(&reference.gvr(), &reference.name, &reference.namespace)
            .await
        {
            Ok(object) => {
                resolved.objects.insert(name.clone(), object);
            }
            Err(e) => {
                resolved.errors.push(format!("reference {name:?}: {e}"));
            }
        }
    }

    resolved
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
