// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-enrollment rule sets.
//!
//! When an agent registers, its attributes are matched against each rule
//! set's patterns; a match materializes a workflow from the embedded
//! template. The engine itself only ever reads these (backend layer).

use crate::meta::{ObjectMeta, Resource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRuleSet {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: WorkflowRuleSetSpec,
}

impl Resource for WorkflowRuleSet {
    const KIND: &'static str = "WorkflowRuleSet";
    const PLURAL: &'static str = "workflowrulesets";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRuleSetSpec {
    /// JSON-pattern rules matched against agent attributes.
    #[serde(default)]
    pub rules: Vec<serde_json::Value>,
    /// Namespace materialized workflows are created in; defaults to the
    /// rule set's own namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_namespace: Option<String>,
    #[serde(default)]
    pub workflow: RuleSetWorkflow,
}

/// Shape of the workflow a matching registration creates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetWorkflow {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub template_ref: String,
    /// Copy matched agent attributes onto the workflow as labels.
    #[serde(default)]
    pub add_attributes_as_labels: bool,
}
