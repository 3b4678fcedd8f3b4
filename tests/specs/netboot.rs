//! The netboot happy path, end to end.

use crate::prelude::*;
use tink_core::{
    ActionState, BmcAction, BootDevice, Clock, ConditionType, CurrentState, PowerState, Resource,
    WorkflowState,
};
use tink_engine::ReconcileAction;
use tink_store::StoreOp;

#[tokio::test]
async fn netboot_workflow_runs_to_success() {
    let h = Harness::new();
    h.seed_hardware(uefi_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", netboot_options())).await;

    // First reconcile renders and moves to preparing.
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Requeue);
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Preparing);
    assert_eq!(wf.status.global_timeout, 1800);
    assert_eq!(wf.status.agent_id, MAC);
    assert_eq!(wf.status.tasks.len(), 1);
    assert_eq!(wf.status.tasks[0].actions.len(), 1);
    assert!(wf.status.conditions.is_true(ConditionType::TemplateRenderedSuccess));

    // Preparing flips the netboot flag...
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Requeue);
    let hardware = h.hardware("m1").await;
    assert_eq!(
        hardware.spec.interfaces[0].netboot.as_ref().unwrap().allow_pxe,
        Some(true)
    );
    let wf = h.workflow("w").await;
    assert!(wf.status.boot_options.allow_netboot.toggled_true);

    // ...then walks the job through create and completion.
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Requeue);
    let job = h.bmc_job("netboot-w").await.unwrap();
    assert_eq!(job.spec.machine_ref.name, "bmc-m1");
    assert_eq!(
        job.spec.tasks,
        vec![
            BmcAction::PowerAction(PowerState::HardOff),
            BmcAction::OneTimeBootDeviceAction {
                device: BootDevice::Pxe,
                efi_boot: true,
            },
            BmcAction::PowerAction(PowerState::On),
        ]
    );

    // Still running: the engine waits on the provider.
    assert!(matches!(
        h.reconcile("w").await.unwrap(),
        ReconcileAction::RequeueAfter(_)
    ));
    h.provider_completes_job("netboot-w").await;

    // Job complete: pending, waiting for the agent.
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Pending);
    assert!(wf.status.conditions.is_true(ConditionType::BootJobComplete));
    assert!(wf.status.boot_options.jobs["netboot-w"].complete);

    // The agent picks the action up and finishes it.
    let now = h.clock.epoch_ms();
    h.agent_reports("w", |wf| {
        wf.status.state = WorkflowState::Running;
        let task_id = wf.status.tasks[0].id.clone();
        let action = &mut wf.status.tasks[0].actions[0];
        action.state = ActionState::Running;
        action.execution_start = Some(now);
        let action_id = action.id.clone();
        wf.status.current_state = Some(CurrentState {
            agent_id: MAC.to_string(),
            task_id,
            action_id,
            state: ActionState::Running,
        });
    })
    .await;
    assert!(matches!(
        h.reconcile("w").await.unwrap(),
        ReconcileAction::RequeueAfter(_)
    ));
    let wf = h.workflow("w").await;
    assert!(wf.status.global_execution_stop.is_some());

    let stop_ms = h.clock.epoch_ms() + 30_000;
    h.agent_reports("w", |wf| {
        let action = &mut wf.status.tasks[0].actions[0];
        action.state = ActionState::Success;
        action.execution_stop = Some(stop_ms);
        if let Some(pointer) = wf.status.current_state.as_mut() {
            pointer.state = ActionState::Success;
        }
    })
    .await;

    // All actions succeeded: running routes to post.
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Requeue);
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Post);

    // No post job for plain netboot; the toggle flips back and the
    // workflow settles successful.
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Success);
    assert!(wf.status.boot_options.allow_netboot.toggled_false);
    let hardware = h.hardware("m1").await;
    assert_eq!(
        hardware.spec.interfaces[0].netboot.as_ref().unwrap().allow_pxe,
        Some(false)
    );
    // No eject/override job was ever created.
    assert!(h.bmc_job("iso-eject-w").await.unwrap_err().is_not_found());
    assert!(h.bmc_job("post-override-w").await.unwrap_err().is_not_found());

    // Terminal: further reconciles change nothing.
    let before = h.workflow("w").await;
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert_eq!(h.workflow("w").await.status, before.status);
}

#[tokio::test]
async fn netboot_toggle_and_job_are_at_most_once() {
    let h = Harness::new();
    h.seed_hardware(uefi_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", netboot_options())).await;

    h.reconcile("w").await.unwrap();
    // Reconcile preparing far more often than needed.
    for _ in 0..8 {
        let _ = h.reconcile("w").await.unwrap();
    }

    // One hardware update (the flip), one job create.
    assert_eq!(
        h.store.calls(tink_core::Hardware::KIND, StoreOp::Update),
        1
    );
    assert_eq!(h.store.calls(tink_core::BmcJob::KIND, StoreOp::Create), 1);
}

#[tokio::test]
async fn netboot_without_uefi_requests_legacy_boot() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", netboot_options())).await;

    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();

    let job = h.bmc_job("netboot-w").await.unwrap();
    assert!(job.spec.tasks.iter().any(|action| matches!(
        action,
        BmcAction::OneTimeBootDeviceAction {
            device: BootDevice::Pxe,
            efi_boot: false,
        }
    )));
}

#[tokio::test]
async fn bmc_job_failure_fails_the_workflow() {
    let h = Harness::new();
    h.seed_hardware(uefi_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", netboot_options())).await;

    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.provider_marks_job(
        "netboot-w",
        tink_core::JobConditionType::JobFailed,
        Some("no route to bmc"),
    )
    .await;

    let err = h.reconcile("w").await.unwrap_err();
    assert!(err.to_string().contains("no route to bmc"));
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Failed);
    assert!(wf.status.conditions.is_true(ConditionType::BootJobFailed));

    // Failed is terminal; the engine does not retry.
    assert_eq!(h.reconcile("w").await.unwrap(), tink_engine::ReconcileAction::Done);
}
