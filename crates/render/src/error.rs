// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Render and rule-engine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("rendered recipe is not valid yaml: {0}")]
    InvalidRecipe(#[from] serde_yaml::Error),
    #[error("recipe has no tasks")]
    EmptyRecipe,
    #[error("encoding hardware facts failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid rule: {0}")]
    InvalidRule(String),
}
