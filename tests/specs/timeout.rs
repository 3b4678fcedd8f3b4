//! Global and per-action timeout behavior.

use crate::prelude::*;
use tink_core::{ActionState, Clock, CurrentState, Workflow, WorkflowState};
use tink_engine::ReconcileAction;

/// A workflow already running: one task, one action, as the agent left it.
async fn seed_running(
    h: &Harness,
    mutate: impl FnOnce(&mut Workflow),
) -> Workflow {
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    let mut workflow = deb_workflow("w", "m1", Default::default());

    workflow.status.state = WorkflowState::Running;
    workflow.status.global_timeout = 50;
    workflow.status.agent_id = MAC.to_string();
    workflow.status.tasks = vec![tink_core::Task {
        id: tink_core::TaskId::new("t1"),
        name: "os-installation".to_string(),
        agent_id: MAC.to_string(),
        actions: vec![tink_core::Action {
            id: tink_core::ActionId::new("a1"),
            name: "stream-image".to_string(),
            image: "quay.io/tinkerbell/actions/image2disk:v1".to_string(),
            state: ActionState::Running,
            ..Default::default()
        }],
        ..Default::default()
    }];
    workflow.status.current_state = Some(CurrentState {
        agent_id: MAC.to_string(),
        task_id: tink_core::TaskId::new("t1"),
        action_id: tink_core::ActionId::new("a1"),
        state: ActionState::Running,
    });
    mutate(&mut workflow);
    h.seed_workflow(workflow).await
}

#[tokio::test]
async fn expired_global_deadline_times_the_workflow_out() {
    let h = Harness::new();
    let now = h.clock.epoch_ms();
    seed_running(&h, |wf| {
        // First action started two minutes ago; the deadline passed a
        // minute ago.
        wf.status.tasks[0].actions[0].execution_start = Some(now - 120_000);
        wf.status.global_execution_stop = Some(now - 60_000);
    })
    .await;

    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Timeout);
    // The deadline is never rewritten and the action keeps its recorded
    // state.
    assert_eq!(wf.status.global_execution_stop, Some(now - 60_000));
    assert_eq!(wf.status.tasks[0].actions[0].state, ActionState::Running);

    // Timeout is terminal.
    let before = h.workflow("w").await;
    h.reconcile("w").await.unwrap();
    assert_eq!(h.workflow("w").await.status, before.status);
}

#[tokio::test]
async fn per_action_timeout_routes_through_post() {
    let h = Harness::new();
    let now = h.clock.epoch_ms();
    seed_running(&h, |wf| {
        wf.status.global_timeout = 1_800;
        wf.status.global_execution_stop = Some(now + 1_800_000);
        let action = &mut wf.status.tasks[0].actions[0];
        action.timeout = 600;
        action.execution_start = Some(now - 650_000);
    })
    .await;

    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Requeue);
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Post);
    let action = &wf.status.tasks[0].actions[0];
    assert_eq!(action.state, ActionState::Timeout);
    assert_eq!(action.duration_seconds, Some(650));
    assert!(action.message.as_deref().unwrap().contains("timeout"));

    // Post has no job to run here; the timeout outcome is restored.
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Timeout);
}

#[tokio::test]
async fn deadline_arms_with_skew_on_first_observation() {
    let h = Harness::new();
    let now = h.clock.epoch_ms();
    seed_running(&h, |wf| {
        // Agent reported a start 10 seconds before this reconcile.
        wf.status.tasks[0].actions[0].execution_start = Some(now - 10_000);
    })
    .await;

    assert!(matches!(
        h.reconcile("w").await.unwrap(),
        ReconcileAction::RequeueAfter(_)
    ));
    let wf = h.workflow("w").await;
    // now + 50s timeout + 10s skew.
    assert_eq!(wf.status.global_execution_stop, Some(now + 60_000));
}
