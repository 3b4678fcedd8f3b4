// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow: one execution of a template against one machine.
//!
//! The status is the complete record of progress. The reconciler is its
//! only writer apart from agent-reported action updates arriving through
//! the backend; the spec is operator-owned and read-only to the engine.

use crate::condition::Conditions;
use crate::meta::{ObjectMeta, Resource};
use crate::BmcAction;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

crate::define_id! {
    /// Identifier of one rendered task. Sortable by creation order.
    #[derive(Default)]
    pub struct TaskId;
}

crate::define_id! {
    /// Identifier of one rendered action. Sortable by creation order.
    #[derive(Default)]
    pub struct ActionId;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: WorkflowSpec,
    #[serde(default)]
    pub status: WorkflowStatus,
}

impl Resource for Workflow {
    const KIND: &'static str = "Workflow";
    const PLURAL: &'static str = "workflows";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    /// Name of the template to render (same namespace).
    #[serde(default)]
    pub template_ref: String,
    /// Name of the hardware to run against (same namespace). May be empty;
    /// rendering then sees an empty hardware document.
    #[serde(default)]
    pub hardware_ref: String,
    /// Free-form variables merged into the render context at top level.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub hardware_map: IndexMap<String, String>,
    #[serde(default)]
    pub boot_options: BootOptions,
    /// Render but do not run.
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootOptions {
    /// Flip every interface's `allowPXE` to true before booting (and the
    /// engine flips it back after the workflow leaves `running`).
    #[serde(default)]
    pub toggle_allow_netboot: bool,
    #[serde(default)]
    pub boot_mode: BootMode,
    /// Source image for the ISO boot modes.
    #[serde(default, rename = "isoURL", skip_serializing_if = "Option::is_none")]
    pub iso_url: Option<String>,
    /// Operator-supplied BMC actions for `customboot`.
    #[serde(default, skip_serializing_if = "Customboot::is_empty")]
    pub customboot: Customboot,
    /// BMC actions that replace the default post-stage job.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub override_post: Vec<BmcAction>,
}

impl BootOptions {
    /// True when the options require the preparing stage at all.
    pub fn wants_preparing(&self) -> bool {
        self.toggle_allow_netboot || self.boot_mode != BootMode::None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootMode {
    #[default]
    #[serde(alias = "")]
    None,
    Netboot,
    Iso,
    Isoboot,
    Customboot,
}

impl BootMode {
    pub fn is_iso(&self) -> bool {
        matches!(self, BootMode::Iso | BootMode::Isoboot)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customboot {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preparing_actions: Vec<BmcAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_actions: Vec<BmcAction>,
}

impl Customboot {
    pub fn is_empty(&self) -> bool {
        self.preparing_actions.is_empty() && self.post_actions.is_empty()
    }
}

/// Main state machine position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    /// Freshly created; nothing rendered yet.
    #[default]
    #[serde(rename = "")]
    Unspecified,
    Preparing,
    Pending,
    Running,
    Post,
    Success,
    Failed,
    Timeout,
    /// Forward-compatibility arm; the dispatcher logs and skips these.
    #[serde(other)]
    Unknown,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Success | WorkflowState::Failed | WorkflowState::Timeout
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Unspecified => "(new)",
            WorkflowState::Preparing => "preparing",
            WorkflowState::Pending => "pending",
            WorkflowState::Running => "running",
            WorkflowState::Post => "post",
            WorkflowState::Success => "success",
            WorkflowState::Failed => "failed",
            WorkflowState::Timeout => "timeout",
            WorkflowState::Unknown => "(unknown)",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateRendering {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    Successful,
    Failed,
}

/// Per-action state machine. Authored by the agent except for `timeout`,
/// which the engine writes when an action overruns its budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionState {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Timeout,
}

impl ActionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionState::Success | ActionState::Failed | ActionState::Timeout
        )
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionState::Pending => "pending",
            ActionState::Running => "running",
            ActionState::Success => "success",
            ActionState::Failed => "failed",
            ActionState::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    #[serde(default)]
    pub state: WorkflowState,
    /// Pointer to the task/action the agent is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<CurrentState>,
    #[serde(default)]
    pub template_rendering: TemplateRendering,
    /// Budget for the whole workflow, in seconds, copied from the rendered
    /// recipe.
    #[serde(default)]
    pub global_timeout: u64,
    /// Absolute deadline in epoch milliseconds; written once when the first
    /// action starts and never rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_execution_stop: Option<u64>,
    /// Agent that should receive the next pending action.
    #[serde(default, rename = "agentID")]
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub boot_options: BootOptionsStatus,
    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,
}

/// Where the agent currently is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    #[serde(default, rename = "agentID")]
    pub agent_id: String,
    #[serde(default, rename = "taskID")]
    pub task_id: TaskId,
    #[serde(default, rename = "actionID")]
    pub action_id: ActionId,
    #[serde(default)]
    pub state: ActionState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootOptionsStatus {
    /// Per-derived-name BMC job tracking.
    #[serde(default)]
    pub jobs: BTreeMap<String, JobTrack>,
    #[serde(default)]
    pub allow_netboot: NetbootToggle,
}

/// Three-phase tracking record for one named BMC job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTrack {
    /// Phase one done: any stale job of this name has been deleted.
    #[serde(default)]
    pub existing_job_deleted: bool,
    /// UID of the created (or adopted) job; empty until phase two.
    #[serde(default)]
    pub uid: String,
    /// Phase three done: the job reported a terminal success condition.
    #[serde(default)]
    pub complete: bool,
}

/// Idempotency flags for the netboot flag flip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetbootToggle {
    #[serde(default)]
    pub toggled_true: bool,
    #[serde(default)]
    pub toggled_false: bool,
}

/// A contiguous group of actions executed by a single agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default, rename = "agentID")]
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

/// The smallest unit of work the agent executes: an image plus its
/// environment and timeout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    pub image: String,
    /// Seconds the agent may spend on this action; 0 disables the check.
    #[serde(default)]
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(default)]
    pub state: ActionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_stop: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

impl WorkflowStatus {
    /// Task carrying the given ID.
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Index of the task carrying the given ID.
    pub fn task_index(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    /// First action of the first task, the one whose start arms the global
    /// timeout.
    pub fn first_action(&self) -> Option<&Action> {
        self.tasks.first().and_then(|t| t.actions.first())
    }

    /// Mutable handle on the action the current-state pointer names.
    pub fn current_action_mut(&mut self) -> Option<&mut Action> {
        let pointer = self.current_state.clone()?;
        self.tasks
            .iter_mut()
            .find(|t| t.id == pointer.task_id)?
            .actions
            .iter_mut()
            .find(|a| a.id == pointer.action_id)
    }

    /// True when every action of every task reported success.
    pub fn all_actions_succeeded(&self) -> bool {
        !self.tasks.is_empty()
            && self
                .tasks
                .iter()
                .all(|t| t.actions.iter().all(|a| a.state == ActionState::Success))
    }

    /// First action observed in a failed or timed-out state, if any.
    pub fn first_terminal_failure(&self) -> Option<&Action> {
        self.tasks.iter().flat_map(|t| t.actions.iter()).find(|a| {
            matches!(a.state, ActionState::Failed | ActionState::Timeout)
        })
    }
}

impl Workflow {
    /// Terminal outcome recorded by the progress tracker, for the post
    /// stage to restore. Success when no failure was recorded.
    pub fn terminal_outcome(&self) -> WorkflowState {
        match self.status.current_state.as_ref().map(|c| c.state) {
            Some(ActionState::Failed) => WorkflowState::Failed,
            Some(ActionState::Timeout) => WorkflowState::Timeout,
            _ => WorkflowState::Success,
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
