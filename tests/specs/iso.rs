//! ISO boot mode: mount on the way in, eject on the way out.

use crate::prelude::*;
use tink_core::{
    ActionState, BmcAction, BootDevice, BootMode, BootOptions, Clock, ConditionStatus,
    ConditionType, CurrentState, PowerState, Resource, VirtualMediaKind, WorkflowState,
};
use tink_engine::ReconcileAction;
use tink_store::StoreOp;

fn iso_options(url: &str) -> BootOptions {
    BootOptions {
        boot_mode: BootMode::Iso,
        iso_url: if url.is_empty() {
            None
        } else {
            Some(url.to_string())
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn missing_iso_url_fails_preparing_without_a_job() {
    let h = Harness::new();
    h.seed_hardware(uefi_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", iso_options(""))).await;

    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Requeue);
    let err = h.reconcile("w").await.unwrap_err();
    assert_eq!(err.to_string(), "iso url must be a valid url");

    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Failed);
    let condition = wf
        .status
        .conditions
        .get(ConditionType::BootJobSetupComplete)
        .unwrap();
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason.as_deref(), Some("Error"));
    assert_eq!(condition.message.as_deref(), Some("iso url must be a valid url"));

    // No BMC job was ever created.
    assert_eq!(h.store.calls(tink_core::BmcJob::KIND, StoreOp::Create), 0);
    assert!(h.bmc_job("iso-mount-w").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn non_http_iso_url_is_rejected_with_the_same_message() {
    let h = Harness::new();
    h.seed_hardware(uefi_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", iso_options("nfs://images/x.iso"))).await;

    h.reconcile("w").await.unwrap();
    let err = h.reconcile("w").await.unwrap_err();
    assert_eq!(err.to_string(), "iso url must be a valid url");
}

#[tokio::test]
async fn iso_mount_actions_carry_the_url_and_eject_runs_in_post() {
    let h = Harness::new();
    h.seed_hardware(uefi_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow(
        "w",
        "m1",
        iso_options("https://images.local/ubuntu.iso"),
    ))
    .await;

    // Render, then drive the mount job to completion.
    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();

    let job = h.bmc_job("iso-mount-w").await.unwrap();
    assert_eq!(
        job.spec.tasks,
        vec![
            BmcAction::PowerAction(PowerState::HardOff),
            BmcAction::VirtualMediaAction {
                media_url: String::new(),
                kind: VirtualMediaKind::Cd,
            },
            BmcAction::VirtualMediaAction {
                media_url: "https://images.local/ubuntu.iso".to_string(),
                kind: VirtualMediaKind::Cd,
            },
            BmcAction::OneTimeBootDeviceAction {
                device: BootDevice::Cdrom,
                efi_boot: true,
            },
            BmcAction::PowerAction(PowerState::On),
        ]
    );

    h.provider_completes_job("iso-mount-w").await;
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Pending);

    // The agent runs the single action to success.
    let now = h.clock.epoch_ms();
    h.agent_reports("w", |wf| {
        wf.status.state = WorkflowState::Running;
        let task_id = wf.status.tasks[0].id.clone();
        let action = &mut wf.status.tasks[0].actions[0];
        action.state = ActionState::Success;
        action.execution_start = Some(now);
        action.execution_stop = Some(now);
        let action_id = action.id.clone();
        wf.status.current_state = Some(CurrentState {
            agent_id: MAC.to_string(),
            task_id,
            action_id,
            state: ActionState::Success,
        });
    })
    .await;
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Requeue);
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Post);

    // Post runs the eject job to completion.
    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    let eject = h.bmc_job("iso-eject-w").await.unwrap();
    assert_eq!(
        eject.spec.tasks,
        vec![BmcAction::VirtualMediaAction {
            media_url: String::new(),
            kind: VirtualMediaKind::Cd,
        }]
    );

    h.provider_completes_job("iso-eject-w").await;
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Success);
}

#[tokio::test]
async fn override_post_replaces_the_eject_job() {
    let h = Harness::new();
    h.seed_hardware(uefi_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    let mut options = iso_options("https://images.local/ubuntu.iso");
    options.override_post = vec![BmcAction::PowerAction(PowerState::Off)];
    h.seed_workflow(deb_workflow("w", "m1", options)).await;

    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.provider_completes_job("iso-mount-w").await;
    h.reconcile("w").await.unwrap();

    // Success straight through running.
    h.agent_reports("w", |wf| {
        wf.status.state = WorkflowState::Running;
        wf.status.tasks[0].actions[0].state = ActionState::Success;
    })
    .await;
    h.reconcile("w").await.unwrap();

    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    let job = h.bmc_job("post-override-w").await.unwrap();
    assert_eq!(job.spec.tasks, vec![BmcAction::PowerAction(PowerState::Off)]);
    assert!(h.bmc_job("iso-eject-w").await.unwrap_err().is_not_found());

    h.provider_completes_job("post-override-w").await;
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Success);
}
