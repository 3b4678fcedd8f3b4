// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow conditions.
//!
//! Conditions are the user-visible failure surface: every observable
//! outcome lands here as a typed entry. The list holds at most one entry
//! per type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of condition types the engine writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    TemplateRenderedSuccess,
    BootJobSetupComplete,
    BootJobSetupFailed,
    BootJobRunning,
    BootJobComplete,
    BootJobFailed,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionType::TemplateRenderedSuccess => "TemplateRenderedSuccess",
            ConditionType::BootJobSetupComplete => "BootJobSetupComplete",
            ConditionType::BootJobSetupFailed => "BootJobSetupFailed",
            ConditionType::BootJobRunning => "BootJobRunning",
            ConditionType::BootJobComplete => "BootJobComplete",
            ConditionType::BootJobFailed => "BootJobFailed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
}

/// One observed condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Epoch milliseconds when the condition was recorded.
    #[serde(default)]
    pub time: u64,
}

impl Condition {
    pub fn new(condition_type: ConditionType, status: ConditionStatus, time: u64) -> Self {
        Self {
            condition_type,
            status,
            reason: None,
            message: None,
            time,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Equality ignoring the recorded time.
    fn same_meaning(&self, other: &Condition) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Replace-by-type condition list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `condition`, replacing any existing entry of the same type.
    pub fn set(&mut self, condition: Condition) {
        if let Some(existing) = self
            .0
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            *existing = condition;
        } else {
            self.0.push(condition);
        }
    }

    /// Like [`set`](Self::set) but a no-op when an entry with the same
    /// meaning (type, status, reason, message) is already present.
    pub fn set_if_different(&mut self, condition: Condition) {
        if self.get(condition.condition_type).is_some_and(|c| c.same_meaning(&condition)) {
            return;
        }
        self.set(condition);
    }

    pub fn get(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.0.iter().find(|c| c.condition_type == condition_type)
    }

    /// True when an entry of the given type exists with status True.
    pub fn is_true(&self, condition_type: ConditionType) -> bool {
        self.get(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
