// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe rendering.

use crate::helpers;
use crate::recipe::Recipe;
use crate::RenderError;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tera::Tera;
use tink_core::{Action, ActionId, Hardware, IdGen, Task, TaskId};

const RECIPE_TEMPLATE: &str = "recipe";

/// Everything a render sees.
pub struct RenderInput<'a> {
    pub template: &'a str,
    pub hardware: Option<&'a Hardware>,
    /// Workflow variables, merged at the top level of the context.
    pub variables: &'a IndexMap<String, String>,
    /// Resolved reference objects, addressable as `references.<name>`.
    pub references: &'a IndexMap<String, Value>,
    /// Secret data, addressable as `secret.<key>`.
    pub secret: Option<&'a BTreeMap<String, String>>,
}

/// Outcome of a successful render: the concrete task tree plus the global
/// budget, ready to install into a workflow status.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub global_timeout: u64,
    pub tasks: Vec<Task>,
}

/// Deprecated typed view exposed to templates as `Hardware`.
///
/// Kept for recipes written against the original dotted paths; new
/// recipes address `hardware.*` by JSON tag instead.
#[derive(Serialize, Default)]
struct HardwareCompat {
    #[serde(rename = "Disks")]
    disks: Vec<String>,
    #[serde(rename = "Interfaces")]
    interfaces: Value,
    #[serde(rename = "UserData")]
    user_data: Option<String>,
    #[serde(rename = "Metadata")]
    metadata: Value,
    #[serde(rename = "VendorData")]
    vendor_data: Option<String>,
}

impl HardwareCompat {
    fn from_hardware(hardware: Option<&Hardware>) -> Result<Self, RenderError> {
        let Some(hardware) = hardware else {
            return Ok(Self::default());
        };
        let instance = hardware.spec.instance.as_ref();
        Ok(Self {
            disks: hardware.spec.disks.iter().map(|d| d.device.clone()).collect(),
            interfaces: serde_json::to_value(&hardware.spec.interfaces)?,
            user_data: instance.and_then(|i| i.userdata.clone()),
            metadata: serde_json::to_value(instance)?,
            vendor_data: instance.and_then(|i| i.vendordata.clone()),
        })
    }
}

fn build_context(input: &RenderInput<'_>) -> Result<tera::Context, RenderError> {
    let mut context = tera::Context::new();

    // Generic nested structure: encode the spec to JSON and hand the map to
    // the template, so authors address fields by JSON tag.
    let hardware_doc = match input.hardware {
        Some(hardware) => serde_json::to_value(&hardware.spec)?,
        None => Value::Object(serde_json::Map::new()),
    };
    context.insert("hardware", &hardware_doc);
    context.insert("Hardware", &HardwareCompat::from_hardware(input.hardware)?);
    context.insert("references", input.references);

    for (key, value) in input.variables {
        context.insert(key.as_str(), value);
    }

    if let Some(secret) = input.secret {
        context.insert("secret", secret);
    }

    Ok(context)
}

/// Render recipe text and parse the result into a concrete task tree.
///
/// Every task and action receives a fresh sortable ID; actions start
/// `pending`.
pub fn render_recipe(input: &RenderInput<'_>, ids: &impl IdGen) -> Result<Rendered, RenderError> {
    let mut tera = Tera::default();
    helpers::register(&mut tera);
    tera.add_raw_template(RECIPE_TEMPLATE, input.template)?;

    let context = build_context(input)?;
    let text = tera.render(RECIPE_TEMPLATE, &context)?;

    let recipe: Recipe = serde_yaml::from_str(&text)?;
    if recipe.tasks.is_empty() {
        return Err(RenderError::EmptyRecipe);
    }

    let tasks = recipe
        .tasks
        .into_iter()
        .map(|task| Task {
            id: TaskId::new(ids.next()),
            name: task.name,
            agent_id: task.worker,
            volumes: task.volumes,
            environment: task.environment,
            actions: task
                .actions
                .into_iter()
                .map(|action| Action {
                    id: ActionId::new(ids.next()),
                    name: action.name,
                    image: action.image,
                    timeout: action.timeout,
                    environment: action.environment,
                    command: action.command,
                    volumes: action.volumes,
                    pid: action.pid,
                    ..Default::default()
                })
                .collect(),
        })
        .collect();

    Ok(Rendered {
        global_timeout: recipe.global_timeout,
        tasks,
    })
}

/// Render a user-supplied media URL against the single `Hardware` binding.
///
/// This is the only templated field in operator-supplied BMC actions.
pub fn render_media_url(template: &str, hardware: &Hardware) -> Result<String, RenderError> {
    let mut tera = Tera::default();
    helpers::register(&mut tera);
    tera.add_raw_template("media_url", template)?;

    let mut context = tera::Context::new();
    context.insert("Hardware", &serde_json::to_value(&hardware.spec)?);
    Ok(tera.render("media_url", &context)?)
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
