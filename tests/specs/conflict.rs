//! Optimistic-concurrency behavior of the hardware mutator.

use crate::prelude::*;
use tink_core::{BootMode, BootOptions, Resource, WorkflowState};
use tink_engine::ReconcileAction;
use tink_store::StoreOp;

fn toggle_only_options() -> BootOptions {
    BootOptions {
        toggle_allow_netboot: true,
        boot_mode: BootMode::None,
        ..Default::default()
    }
}

#[tokio::test]
async fn conflicts_retry_and_converge_within_three_updates() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", toggle_only_options())).await;

    h.reconcile("w").await.unwrap();

    // First two updates conflict, the third lands.
    h.store.fail_next_updates(2);
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);

    let hardware = h.hardware("m1").await;
    for interface in &hardware.spec.interfaces {
        assert_eq!(interface.netboot.as_ref().unwrap().allow_pxe, Some(true));
    }
    assert_eq!(h.store.calls(tink_core::Hardware::KIND, StoreOp::Update), 3);

    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Pending);
    assert!(wf.status.boot_options.allow_netboot.toggled_true);
}

#[tokio::test]
async fn exhausted_budget_surfaces_without_state_change() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", toggle_only_options())).await;

    h.reconcile("w").await.unwrap();

    h.store.fail_next_updates(3);
    let err = h.reconcile("w").await.unwrap_err();
    assert!(err.to_string().contains("retry budget"));
    assert_eq!(h.store.calls(tink_core::Hardware::KIND, StoreOp::Update), 3);

    // A retryable failure does not alter workflow state, and the toggle
    // has not been recorded as done.
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Preparing);
    assert!(!wf.status.boot_options.allow_netboot.toggled_true);

    // The next reconcile (conflicts gone) completes the flip.
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert!(h.workflow("w").await.status.boot_options.allow_netboot.toggled_true);
}

#[tokio::test]
async fn repeated_reconciles_toggle_at_most_once_per_direction() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", toggle_only_options())).await;

    h.reconcile("w").await.unwrap();
    for _ in 0..5 {
        let _ = h.reconcile("w").await;
    }
    // Pending after the first preparing pass; the flag flipped exactly
    // once despite the extra reconciles.
    assert_eq!(h.store.calls(tink_core::Hardware::KIND, StoreOp::Update), 1);
}
