// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post stage: clean up after the agent and settle the terminal state.
//!
//! Runs even when the agent's outcome was failure or timeout (ejecting
//! media after a failed install is the safe default) and then restores
//! that outcome. A non-success outcome is never overwritten.

use crate::bmc::{JobOutcome, JobPurpose};
use crate::reconciler::{ReconcileAction, Reconciler};
use crate::ReconcileError;
use tink_core::{
    BmcAction, BootMode, Clock, Hardware, IdGen, NamespacedName, VirtualMediaKind, Workflow,
    WorkflowState,
};
use tink_store::{DynamicReader, Store};
use tracing::info;

impl<S, D, C, I> Reconciler<S, D, C, I>
where
    S: Store,
    D: DynamicReader,
    C: Clock,
    I: IdGen,
{
    pub(crate) async fn post(
        &self,
        workflow: &mut Workflow,
    ) -> Result<ReconcileAction, ReconcileError> {
        let hardware_key = NamespacedName::new(
            &workflow.metadata.namespace,
            &workflow.spec.hardware_ref,
        );

        if workflow.spec.boot_options.toggle_allow_netboot
            && !workflow.status.boot_options.allow_netboot.toggled_false
        {
            self.toggle_allow_pxe(&hardware_key, false).await?;
            workflow.status.boot_options.allow_netboot.toggled_false = true;
        }

        let override_post = workflow.spec.boot_options.override_post.clone();
        let boot_mode = workflow.spec.boot_options.boot_mode;
        let plan: Option<(JobPurpose, Vec<BmcAction>)> = match boot_mode {
            BootMode::Iso | BootMode::Isoboot if !override_post.is_empty() => {
                Some((JobPurpose::PostOverride, override_post))
            }
            BootMode::Iso | BootMode::Isoboot => Some((
                JobPurpose::IsoEject,
                vec![BmcAction::VirtualMediaAction {
                    media_url: String::new(),
                    kind: VirtualMediaKind::Cd,
                }],
            )),
            BootMode::Customboot => Some((
                JobPurpose::CustombootPost,
                workflow.spec.boot_options.customboot.post_actions.clone(),
            )),
            _ if !override_post.is_empty() => Some((JobPurpose::PostOverride, override_post)),
            _ => None,
        };

        let Some((purpose, raw_actions)) = plan else {
            return Ok(self.settle(workflow));
        };
        if raw_actions.is_empty() {
            return Ok(self.settle(workflow));
        }

        let hardware: Hardware = self.store.get(&hardware_key).await?;
        if hardware.spec.bmc_ref.is_none() {
            let err = self.fail_boot_setup(
                workflow,
                format!("hardware {hardware_key} has no bmc reference"),
            );
            // Keep a worse outcome from the running stage.
            if workflow.terminal_outcome() != WorkflowState::Success {
                workflow.status.state = workflow.terminal_outcome();
            }
            return Err(err);
        }

        let actions = self.template_actions(workflow, &hardware, raw_actions)?;

        match self.ensure_job(workflow, &hardware, purpose, actions).await? {
            JobOutcome::Complete => Ok(self.settle(workflow)),
            JobOutcome::Progressed => Ok(ReconcileAction::Requeue),
            JobOutcome::Running => Ok(ReconcileAction::RequeueAfter(
                self.config.job_poll_backoff.max_delay(),
            )),
            JobOutcome::Failed(message) => {
                // The post job failing only downgrades a success.
                workflow.status.state = match workflow.terminal_outcome() {
                    WorkflowState::Success => WorkflowState::Failed,
                    outcome => outcome,
                };
                Err(ReconcileError::JobFailed {
                    job: purpose.job_name(&workflow.metadata.name),
                    message,
                })
            }
        }
    }

    /// Restore the terminal outcome observed while running.
    fn settle(&self, workflow: &mut Workflow) -> ReconcileAction {
        let outcome = workflow.terminal_outcome();
        info!(workflow = %workflow.metadata.key(), outcome = %outcome, "workflow settled");
        workflow.status.state = outcome;
        ReconcileAction::Done
    }
}
