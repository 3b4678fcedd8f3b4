// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preparing stage: bring the machine to its installation environment.

use crate::bmc::{JobOutcome, JobPurpose};
use crate::reconciler::{ReconcileAction, Reconciler};
use crate::ReconcileError;
use tink_core::{
    BmcAction, BootDevice, BootMode, Clock, Condition, ConditionStatus, ConditionType, Hardware,
    IdGen, NamespacedName, PowerState, VirtualMediaKind, Workflow, WorkflowState,
};
use tink_render::render_media_url;
use tink_store::{DynamicReader, Store};
use tracing::info;

pub(crate) const INVALID_ISO_URL: &str = "iso url must be a valid url";

impl<S, D, C, I> Reconciler<S, D, C, I>
where
    S: Store,
    D: DynamicReader,
    C: Clock,
    I: IdGen,
{
    pub(crate) async fn prepare(
        &self,
        workflow: &mut Workflow,
    ) -> Result<ReconcileAction, ReconcileError> {
        let hardware_key = NamespacedName::new(
            &workflow.metadata.namespace,
            &workflow.spec.hardware_ref,
        );

        if workflow.spec.boot_options.toggle_allow_netboot
            && !workflow.status.boot_options.allow_netboot.toggled_true
        {
            self.toggle_allow_pxe(&hardware_key, true).await?;
            workflow.status.boot_options.allow_netboot.toggled_true = true;
        }

        let boot_mode = workflow.spec.boot_options.boot_mode;
        if boot_mode == BootMode::None {
            workflow.status.state = WorkflowState::Pending;
            return Ok(ReconcileAction::Done);
        }

        let hardware: Hardware = self.store.get(&hardware_key).await?;
        if hardware.spec.bmc_ref.is_none() {
            return Err(self.fail_boot_setup(
                workflow,
                format!("hardware {hardware_key} has no bmc reference"),
            ));
        }

        let efi = hardware.any_uefi();
        let (purpose, actions) = match boot_mode {
            BootMode::Netboot => (JobPurpose::Netboot, netboot_actions(efi)),
            BootMode::Iso | BootMode::Isoboot => {
                let iso_url = workflow.spec.boot_options.iso_url.clone().unwrap_or_default();
                if !iso_url.starts_with("http://") && !iso_url.starts_with("https://") {
                    return Err(self.fail_boot_setup(workflow, INVALID_ISO_URL.to_string()));
                }
                (JobPurpose::IsoMount, iso_actions(&iso_url, efi))
            }
            BootMode::Customboot => {
                let raw = workflow.spec.boot_options.customboot.preparing_actions.clone();
                let actions = self.template_actions(workflow, &hardware, raw)?;
                (JobPurpose::CustombootPreparing, actions)
            }
            BootMode::None => unreachable!("handled above"),
        };

        match self.ensure_job(workflow, &hardware, purpose, actions).await? {
            JobOutcome::Complete => {
                info!(workflow = %workflow.metadata.key(), "boot job complete; waiting for agent");
                workflow.status.state = WorkflowState::Pending;
                Ok(ReconcileAction::Done)
            }
            JobOutcome::Progressed => Ok(ReconcileAction::Requeue),
            JobOutcome::Running => Ok(ReconcileAction::RequeueAfter(
                self.config.job_poll_backoff.max_delay(),
            )),
            JobOutcome::Failed(message) => {
                workflow.status.state = WorkflowState::Failed;
                Err(ReconcileError::JobFailed {
                    job: purpose.job_name(&workflow.metadata.name),
                    message,
                })
            }
        }
    }

    /// Render the templated fields of operator-supplied actions.
    pub(crate) fn template_actions(
        &self,
        workflow: &mut Workflow,
        hardware: &Hardware,
        actions: Vec<BmcAction>,
    ) -> Result<Vec<BmcAction>, ReconcileError> {
        actions
            .into_iter()
            .map(|action| match action {
                BmcAction::VirtualMediaAction { media_url, kind } if !media_url.is_empty() => {
                    match render_media_url(&media_url, hardware) {
                        Ok(media_url) => Ok(BmcAction::VirtualMediaAction { media_url, kind }),
                        Err(e) => Err(self.fail_boot_setup(workflow, e.to_string())),
                    }
                }
                other => Ok(other),
            })
            .collect()
    }

    /// Record a boot setup failure: condition plus terminal state.
    pub(crate) fn fail_boot_setup(
        &self,
        workflow: &mut Workflow,
        message: String,
    ) -> ReconcileError {
        workflow.status.state = WorkflowState::Failed;
        workflow.status.conditions.set(
            Condition::new(
                ConditionType::BootJobSetupComplete,
                ConditionStatus::False,
                self.clock.epoch_ms(),
            )
            .with_reason("Error")
            .with_message(message.clone()),
        );
        ReconcileError::Validation(message)
    }
}

fn netboot_actions(efi: bool) -> Vec<BmcAction> {
    vec![
        BmcAction::PowerAction(PowerState::HardOff),
        BmcAction::OneTimeBootDeviceAction {
            device: BootDevice::Pxe,
            efi_boot: efi,
        },
        BmcAction::PowerAction(PowerState::On),
    ]
}

fn iso_actions(iso_url: &str, efi: bool) -> Vec<BmcAction> {
    vec![
        BmcAction::PowerAction(PowerState::HardOff),
        BmcAction::VirtualMediaAction {
            media_url: String::new(),
            kind: VirtualMediaKind::Cd,
        },
        BmcAction::VirtualMediaAction {
            media_url: iso_url.to_string(),
            kind: VirtualMediaKind::Cd,
        },
        BmcAction::OneTimeBootDeviceAction {
            device: BootDevice::Cdrom,
            efi_boot: efi,
        },
        BmcAction::PowerAction(PowerState::On),
    ]
}
