// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress tracking while the agent is executing actions.
//!
//! Action states are authored by the agent and arrive through the backend;
//! here we only derive aggregates: the global deadline, per-action
//! timeout, the running → post transition, and the agent hand-off between
//! tasks.

use crate::reconciler::{ReconcileAction, Reconciler};
use crate::ReconcileError;
use std::time::Duration;
use tink_core::{ActionState, Clock, IdGen, Workflow, WorkflowState, WorkflowStatus};
use tink_store::{DynamicReader, Store};
use tracing::{debug, info, warn};

impl<S, D, C, I> Reconciler<S, D, C, I>
where
    S: Store,
    D: DynamicReader,
    C: Clock,
    I: IdGen,
{
    pub(crate) fn track_running(
        &self,
        workflow: &mut Workflow,
    ) -> Result<ReconcileAction, ReconcileError> {
        let now = self.clock.epoch_ms();
        let key = workflow.metadata.key();

        // Arm the global deadline when the first action has started.
        // Written once; never recomputed.
        if workflow.status.global_execution_stop.is_none() {
            if let Some(start) = workflow
                .status
                .first_action()
                .and_then(|action| action.execution_start)
            {
                let skew = now.saturating_sub(start);
                let stop = now + workflow.status.global_timeout * 1000 + skew;
                workflow.status.global_execution_stop = Some(stop);
                debug!(workflow = %key, stop, "armed global deadline");
            }
        }

        if let Some(stop) = workflow.status.global_execution_stop {
            if now > stop {
                warn!(workflow = %key, "global timeout exceeded");
                workflow.status.state = WorkflowState::Timeout;
                return Ok(ReconcileAction::Done);
            }
        }

        // Per-action budget: the only action-state write the engine makes.
        if self.expire_current_action(&mut workflow.status, now) {
            workflow.status.state = WorkflowState::Post;
            return Ok(ReconcileAction::Requeue);
        }

        if workflow.status.all_actions_succeeded() {
            info!(workflow = %key, "all actions succeeded");
            workflow.status.state = WorkflowState::Post;
            return Ok(ReconcileAction::Requeue);
        }

        if let Some(failed) = workflow.status.first_terminal_failure() {
            info!(workflow = %key, action = %failed.name, state = %failed.state, "action failed");
            workflow.status.state = WorkflowState::Post;
            return Ok(ReconcileAction::Requeue);
        }

        if let Some(next_agent) = agent_transition(&workflow.status) {
            info!(workflow = %key, agent = %next_agent, "handing off to next task's agent");
            workflow.status.agent_id = next_agent;
        }

        // Wake up for the deadline; status writes from the agent arrive as
        // watch events in the meantime.
        match workflow.status.global_execution_stop {
            Some(stop) if stop > now => Ok(ReconcileAction::RequeueAfter(
                Duration::from_millis(stop - now),
            )),
            _ => Ok(ReconcileAction::Done),
        }
    }

    /// Mark the current action timed out when it overran its budget.
    fn expire_current_action(&self, status: &mut WorkflowStatus, now: u64) -> bool {
        let Some(action) = status.current_action_mut() else {
            return false;
        };
        if action.state != ActionState::Running || action.timeout == 0 {
            return false;
        }
        let Some(start) = action.execution_start else {
            return false;
        };
        if now <= start + action.timeout * 1000 {
            return false;
        }

        action.state = ActionState::Timeout;
        action.message = Some(format!(
            "action exceeded its timeout of {} seconds",
            action.timeout
        ));
        action.execution_stop = Some(now);
        action.duration_seconds = Some((now - start) / 1000);
        if let Some(pointer) = status.current_state.as_mut() {
            pointer.state = ActionState::Timeout;
        }
        true
    }
}

/// The agent hand-off rule. All five conditions must hold:
/// the pointer names a known task, it is not the last, all of its actions
/// succeeded, the next task's first action is pending, and the recorded
/// agent differs from the next task's agent.
fn agent_transition(status: &WorkflowStatus) -> Option<String> {
    let pointer = status.current_state.as_ref()?;
    let index = status.task_index(&pointer.task_id)?;
    if index + 1 >= status.tasks.len() {
        return None;
    }
    let current = &status.tasks[index];
    if !current
        .actions
        .iter()
        .all(|action| action.state == ActionState::Success)
    {
        return None;
    }
    let next = &status.tasks[index + 1];
    let first = next.actions.first()?;
    if first.state != ActionState::Pending {
        return None;
    }
    if status.agent_id == next.agent_id {
        return None;
    }
    Some(next.agent_id.clone())
}

#[cfg(test)]
#[path = "running_tests.rs"]
mod tests;
