//! Render outcomes, disabled workflows, and terminal-state behavior.

use crate::prelude::*;
use tink_core::{
    ConditionStatus, ConditionType, TemplateRendering, WorkflowState,
};
use tink_engine::ReconcileAction;
use tink_store::Store;

#[tokio::test]
async fn missing_template_fails_the_render_terminally() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    // No template seeded.
    h.seed_workflow(deb_workflow("w", "m1", Default::default())).await;

    let err = h.reconcile("w").await.unwrap_err();
    assert!(err.to_string().contains("not found"));

    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Failed);
    assert_eq!(wf.status.template_rendering, TemplateRendering::Failed);
    let condition = wf
        .status
        .conditions
        .get(ConditionType::TemplateRenderedSuccess)
        .unwrap();
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason.as_deref(), Some("Error"));
    assert!(condition.message.as_deref().unwrap().contains("not found"));
}

#[tokio::test]
async fn broken_template_records_the_parser_error() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", "tasks: {{ broken").await;
    h.seed_workflow(deb_workflow("w", "m1", Default::default())).await;

    assert!(h.reconcile("w").await.is_err());
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Failed);
    assert_eq!(wf.status.template_rendering, TemplateRendering::Failed);
}

#[tokio::test]
async fn missing_hardware_reference_fails_the_render() {
    let h = Harness::new();
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "ghost-machine", Default::default())).await;

    assert!(h.reconcile("w").await.is_err());
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Failed);
}

#[tokio::test]
async fn empty_hardware_ref_renders_against_an_empty_document() {
    let h = Harness::new();
    h.seed_template("deb", DEB_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "", Default::default())).await;

    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Pending);
    assert_eq!(wf.status.tasks.len(), 1);
}

#[tokio::test]
async fn disabled_workflow_keeps_only_its_agent_id() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    let mut workflow = deb_workflow("w", "m1", netboot_options());
    workflow.spec.disabled = true;
    h.seed_workflow(workflow).await;

    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);

    let wf = h.workflow("w").await;
    assert_eq!(wf.status.agent_id, MAC);
    assert_eq!(wf.status.state, WorkflowState::Unspecified);
    assert!(wf.status.tasks.is_empty());
    assert!(wf.status.conditions.is_empty());

    // The backend can still answer who this workflow belongs to.
    let for_agent = h.backend.workflows_for_agent(MAC).await.unwrap();
    assert_eq!(for_agent.len(), 1);
}

#[tokio::test]
async fn terminal_states_never_rewind() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    for (name, state) in [
        ("w-success", WorkflowState::Success),
        ("w-failed", WorkflowState::Failed),
        ("w-timeout", WorkflowState::Timeout),
    ] {
        let mut workflow = deb_workflow(name, "m1", Default::default());
        workflow.status.state = state;
        h.seed_workflow(workflow).await;

        let before = h.workflow(name).await;
        assert_eq!(h.reconcile(name).await.unwrap(), ReconcileAction::Done);
        assert_eq!(h.workflow(name).await.status, before.status);
    }
}

#[tokio::test]
async fn pending_workflows_are_left_to_the_agent() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    let mut workflow = deb_workflow("w", "m1", Default::default());
    workflow.status.state = WorkflowState::Pending;
    h.seed_workflow(workflow).await;

    let before = h.workflow("w").await;
    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert_eq!(h.workflow("w").await.status, before.status);
}

#[tokio::test]
async fn unknown_workflow_key_is_a_no_op() {
    let h = Harness::new();
    assert_eq!(
        h.reconcile("never-created").await.unwrap(),
        ReconcileAction::Done
    );
}

#[tokio::test]
async fn deleting_workflow_is_left_alone() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template("deb", DEB_RECIPE).await;
    let mut workflow = deb_workflow("w", "m1", Default::default());
    workflow.metadata.deletion_time_ms = Some(1);
    h.seed_workflow(workflow).await;

    assert_eq!(h.reconcile("w").await.unwrap(), ReconcileAction::Done);
    assert_eq!(h.workflow("w").await.status.state, WorkflowState::Unspecified);
}

#[tokio::test]
async fn secret_keys_are_available_during_render() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    let template = tink_core::Template {
        metadata: tink_core::ObjectMeta::named("default", "deb"),
        spec: tink_core::TemplateSpec {
            data: r#"
global_timeout: 600
tasks:
  - name: t
    worker: "{{ device_1 }}"
    actions:
      - name: a
        image: probe:v1
        environment:
          TOKEN: "{{ secret.registry_token }}"
"#
            .to_string(),
            secret_ref: Some(tink_core::LocalRef::named("registry")),
        },
        status: None,
    };
    h.store.create(&template).await.unwrap();
    h.store
        .create(&tink_core::Secret {
            metadata: tink_core::ObjectMeta::named("default", "registry"),
            data: [("registry_token".to_string(), b"hunter2".to_vec())]
                .into_iter()
                .collect(),
        })
        .await
        .unwrap();
    h.seed_workflow(deb_workflow("w", "m1", Default::default())).await;

    h.reconcile("w").await.unwrap();
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Pending);
    assert_eq!(
        wf.status.tasks[0].actions[0]
            .environment
            .get("TOKEN")
            .map(String::as_str),
        Some("hunter2")
    );
}

#[tokio::test]
async fn missing_secret_fails_the_render() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    let template = tink_core::Template {
        metadata: tink_core::ObjectMeta::named("default", "deb"),
        spec: tink_core::TemplateSpec {
            data: DEB_RECIPE.to_string(),
            secret_ref: Some(tink_core::LocalRef::named("ghost-secret")),
        },
        status: None,
    };
    h.store.create(&template).await.unwrap();
    h.seed_workflow(deb_workflow("w", "m1", Default::default())).await;

    assert!(h.reconcile("w").await.is_err());
    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Failed);
    assert_eq!(wf.status.template_rendering, TemplateRendering::Failed);
}

#[tokio::test]
async fn task_and_action_ids_are_unique_and_ordered() {
    let h = Harness::new();
    h.seed_hardware(plain_machine("m1")).await;
    h.seed_template(
        "deb",
        r#"
global_timeout: 600
tasks:
  - name: first
    worker: "{{ device_1 }}"
    actions:
      - name: a
        image: probe:v1
      - name: b
        image: probe:v1
  - name: second
    worker: "{{ device_1 }}"
    actions:
      - name: c
        image: probe:v1
"#,
    )
    .await;
    h.seed_workflow(deb_workflow("w", "m1", Default::default())).await;
    h.reconcile("w").await.unwrap();

    let wf = h.workflow("w").await;
    let mut ids: Vec<String> = Vec::new();
    for task in &wf.status.tasks {
        ids.push(task.id.as_str().to_string());
        for action in &task.actions {
            ids.push(action.id.as_str().to_string());
        }
    }
    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());
}
