// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template: the textual provisioning recipe.

use crate::meta::{LocalRef, ObjectMeta, Resource};
use serde::{Deserialize, Serialize};

/// A provisioning recipe authored by an operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TemplateSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TemplateStatus>,
}

impl Resource for Template {
    const KIND: &'static str = "Template";
    const PLURAL: &'static str = "templates";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    /// Recipe text. Rendered against hardware facts, workflow variables,
    /// resolved references, and the optional secret.
    #[serde(default)]
    pub data: String,
    /// Secret whose data keys become `secret.<key>` during rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<LocalRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStatus {
    pub state: TemplateState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateState {
    Ready,
    Error,
}
