// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The recipe document: what rendered template text parses into.
//!
//! Recipes are authored in snake_case YAML; the camelCase status tree is
//! produced from this at install time.

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Seconds the whole workflow may take once the first action starts.
    #[serde(default)]
    pub global_timeout: u64,
    #[serde(default)]
    pub tasks: Vec<RecipeTask>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeTask {
    pub name: String,
    /// Agent identity this task is addressed to.
    pub worker: String,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub actions: Vec<RecipeAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeAction {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub pid: Option<String>,
}
