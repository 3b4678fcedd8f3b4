//! Customboot: operator-supplied BMC actions on both sides of the run.

use crate::prelude::*;
use tink_core::{
    ActionState, BmcAction, BootMode, BootOptions, Customboot, PowerState, VirtualMediaKind,
    WorkflowState,
};
use tink_engine::ReconcileAction;

fn customboot_options() -> BootOptions {
    BootOptions {
        boot_mode: BootMode::Customboot,
        customboot: Customboot {
            preparing_actions: vec![
                BmcAction::PowerAction(PowerState::HardOff),
                BmcAction::VirtualMediaAction {
                    media_url: "https://images.local/{{ Hardware.interfaces.0.mac }}.iso"
                        .to_string(),
                    kind: VirtualMediaKind::Cd,
                },
                BmcAction::PowerAction(PowerState::On),
            ],
            post_actions: vec![BmcAction::VirtualMediaAction {
                media_url: String::new(),
                kind: VirtualMediaKind::Cd,
            }],
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn customboot_templates_media_urls_against_the_hardware() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", customboot_options())).await;

    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();

    let job = h.bmc_job("customboot-preparing-w").await.unwrap();
    assert_eq!(
        job.spec.tasks,
        vec![
            BmcAction::PowerAction(PowerState::HardOff),
            BmcAction::VirtualMediaAction {
                media_url: format!("https://images.local/{MAC}.iso"),
                kind: VirtualMediaKind::Cd,
            },
            BmcAction::PowerAction(PowerState::On),
        ]
    );
}

#[tokio::test]
async fn customboot_runs_preparing_and_post_jobs() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", customboot_options())).await;

    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    h.provider_completes_job("customboot-preparing-w").await;
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Pending);

    h.agent_reports("w", |wf| {
        wf.status.state = WorkflowState::Running;
        wf.status.tasks[0].actions[0].state = ActionState::Success;
    })
    .await;
    h.reconcile("w").await.unwrap();
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Post);

    h.reconcile("w").await.unwrap();
    h.reconcile("w").await.unwrap();
    let post_job = h.bmc_job("customboot-post-w").await.unwrap();
    assert_eq!(
        post_job.spec.tasks,
        vec![BmcAction::VirtualMediaAction {
            media_url: String::new(),
            kind: VirtualMediaKind::Cd,
        }]
    );

    h.provider_completes_job("customboot-post-w").await;
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);

    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Success);
    assert_eq!(wf.status.boot_options.jobs.len(), 2);
    assert!(wf.status.boot_options.jobs["customboot-preparing-w"].complete);
    assert!(wf.status.boot_options.jobs["customboot-post-w"].complete);
}

#[tokio::test]
async fn broken_media_url_template_fails_the_stage() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    let mut options = customboot_options();
    options.customboot.preparing_actions = vec![BmcAction::VirtualMediaAction {
        media_url: "{{ Hardware.no.such.path }}".to_string(),
        kind: VirtualMediaKind::Cd,
    }];
    h.seed_workflow(deb_workflow("w", "m1", options)).await;

    h.reconcile("w").await.unwrap();
    assert!(h.reconcile("w").await.is_err());
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Failed);
}
