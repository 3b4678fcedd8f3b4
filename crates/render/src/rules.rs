// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-pattern rule matching.
//!
//! The rest of the crate depends only on the [`RuleMatcher`] seam, so the
//! match engine can be swapped without touching policy evaluation.

use crate::RuleError;
use serde_json::Value;

/// Result of evaluating a rule list against one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Indexes of the rules that matched, in rule-list order.
    pub matched_rules: Vec<usize>,
}

/// `(rules, event) → (matched, which)`.
pub trait RuleMatcher: Send + Sync {
    fn evaluate(&self, rules: &[Value], event: &Value) -> Result<MatchOutcome, RuleError>;
}

/// The one in-tree matcher: JSON patterns.
///
/// A rule is a JSON object mirroring the event's shape. Nested objects
/// recurse; a leaf is an array of value-matchers, any one of which may
/// match. Value-matchers are scalar literals (case-sensitive equality) or
/// single-key objects: `{"wildcard": "a*b"}`, `{"prefix": s}`,
/// `{"suffix": s}`, `{"exists": bool}`, `{"anything-but": [..]}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPatternMatcher;

impl RuleMatcher for JsonPatternMatcher {
    fn evaluate(&self, rules: &[Value], event: &Value) -> Result<MatchOutcome, RuleError> {
        let mut outcome = MatchOutcome::default();
        for (index, rule) in rules.iter().enumerate() {
            if Self::rule_matches(rule, event)? {
                outcome.matched = true;
                outcome.matched_rules.push(index);
            }
        }
        Ok(outcome)
    }
}

impl JsonPatternMatcher {
    fn rule_matches(rule: &Value, event: &Value) -> Result<bool, RuleError> {
        let Value::Object(fields) = rule else {
            return Err(RuleError::InvalidRule(format!(
                "rule must be an object, got {rule}"
            )));
        };

        for (key, pattern) in fields {
            let actual = event.get(key);
            let matched = match pattern {
                // Nested shape: recurse into the event.
                Value::Object(_) => match actual {
                    Some(nested) => Self::rule_matches(pattern, nested)?,
                    None => false,
                },
                // Leaf: array of value-matchers.
                Value::Array(matchers) => Self::leaf_matches(matchers, actual)?,
                other => {
                    return Err(RuleError::InvalidRule(format!(
                        "pattern for {key:?} must be an object or an array, got {other}"
                    )))
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn leaf_matches(matchers: &[Value], actual: Option<&Value>) -> Result<bool, RuleError> {
        for matcher in matchers {
            if Self::value_matches(matcher, actual)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn value_matches(matcher: &Value, actual: Option<&Value>) -> Result<bool, RuleError> {
        match matcher {
            Value::Object(spec) => {
                let mut entries = spec.iter();
                let (op, operand) = entries.next().ok_or_else(|| {
                    RuleError::InvalidRule("empty value-matcher object".to_string())
                })?;
                if entries.next().is_some() {
                    return Err(RuleError::InvalidRule(
                        "value-matcher object must have exactly one key".to_string(),
                    ));
                }
                Self::operator_matches(op, operand, actual)
            }
            literal => Ok(actual.is_some_and(|value| value == literal)),
        }
    }

    fn operator_matches(
        op: &str,
        operand: &Value,
        actual: Option<&Value>,
    ) -> Result<bool, RuleError> {
        match op {
            "exists" => {
                let wanted = operand.as_bool().ok_or_else(|| {
                    RuleError::InvalidRule("exists takes a boolean".to_string())
                })?;
                Ok(actual.is_some() == wanted)
            }
            "wildcard" => {
                let pattern = operand.as_str().ok_or_else(|| {
                    RuleError::InvalidRule("wildcard takes a string".to_string())
                })?;
                Ok(actual
                    .and_then(Value::as_str)
                    .is_some_and(|s| wildcard_match(pattern, s)))
            }
            "prefix" => {
                let prefix = operand.as_str().ok_or_else(|| {
                    RuleError::InvalidRule("prefix takes a string".to_string())
                })?;
                Ok(actual
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.starts_with(prefix)))
            }
            "suffix" => {
                let suffix = operand.as_str().ok_or_else(|| {
                    RuleError::InvalidRule("suffix takes a string".to_string())
                })?;
                Ok(actual
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.ends_with(suffix)))
            }
            "anything-but" => {
                let excluded: Vec<&Value> = match operand {
                    Value::Array(values) => values.iter().collect(),
                    single => vec![single],
                };
                Ok(actual.is_some_and(|value| excluded.iter().all(|e| *e != value)))
            }
            other => Err(RuleError::InvalidRule(format!(
                "unknown value-matcher operator {other:?}"
            ))),
        }
    }
}

/// Glob on `*` only. Case-sensitive.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !text.starts_with(first)
        || !text.ends_with(last)
        || text.len() < first.len() + last.len()
    {
        return false;
    }
    let mut middle = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match middle.find(part) {
            Some(at) => middle = &middle[at + part.len()..],
            None => return false,
        }
    }
    true
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
