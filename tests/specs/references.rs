//! Reference policy in the render path.

use crate::prelude::*;
use tink_core::{ConditionType, Resource, ResourceRef, Secret, WorkflowState};
use tink_store::Store;

const COUNTING_RECIPE: &str = r#"
global_timeout: 600
tasks:
  - name: probe
    worker: "{{ device_1 }}"
    actions:
      - name: report
        image: probe:v1
        environment:
          REF_COUNT: "{{ references | length }}"
"#;

fn machine_with_reference(name: &str, reference_name: &str) -> tink_core::Hardware {
    let mut hardware = plain_machine(name);
    hardware.spec.references.insert(
        reference_name.to_string(),
        ResourceRef {
            group: String::new(),
            version: "v1".to_string(),
            resource: Secret::PLURAL.to_string(),
            name: "cluster-secret".to_string(),
            namespace: "default".to_string(),
        },
    );
    hardware
}

#[tokio::test]
async fn denied_reference_is_omitted_but_render_succeeds() {
    let h = Harness::new();
    h.seed_hardware(machine_with_reference("m1", "secretish")).await;
    h.seed_template("deb", COUNTING_RECIPE).await;
    h.store
        .create(&Secret {
            metadata: tink_core::ObjectMeta::named("default", "cluster-secret"),
            data: Default::default(),
        })
        .await
        .unwrap();
    h.seed_workflow(deb_workflow("w", "m1", Default::default())).await;

    h.reconcile("w").await.unwrap();

    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Pending);
    assert!(wf.status.conditions.is_true(ConditionType::TemplateRenderedSuccess));
    // The default deny-all policy kept the reference out of the context.
    assert_eq!(
        wf.status.tasks[0].actions[0]
            .environment
            .get("REF_COUNT")
            .map(String::as_str),
        Some("0")
    );
}

#[tokio::test]
async fn allowed_reference_reaches_the_template() {
    let h = Harness::new();
    h.seed_hardware(machine_with_reference("m1", "creds")).await;
    h.seed_template("deb", COUNTING_RECIPE).await;
    h.store
        .create(&Secret {
            metadata: tink_core::ObjectMeta::named("default", "cluster-secret"),
            data: Default::default(),
        })
        .await
        .unwrap();
    h.seed_workflow(deb_workflow("w", "m1", Default::default())).await;

    // Widen the policy for this one name.
    let engine = tink_engine::Reconciler::new(
        h.store.clone(),
        h.store.clone(),
        h.clock.clone(),
        tink_core::SequentialIdGen::new("id"),
    )
    .with_config(tink_engine::ReconcilerConfig {
        reference_policy: tink_render::ReferencePolicy {
            allow: vec![serde_json::json!({"reference": {"name": ["cluster-secret"]}})],
            ..Default::default()
        },
        ..Default::default()
    });
    engine.reconcile(&Harness::key("w")).await.unwrap();

    let wf = h.workflow("w").await;
    assert_eq!(
        wf.status.tasks[0].actions[0]
            .environment
            .get("REF_COUNT")
            .map(String::as_str),
        Some("1")
    );
}

#[tokio::test]
async fn missing_reference_object_does_not_fail_the_render() {
    let h = Harness::new();
    // Reference admitted but pointing at nothing.
    h.seed_hardware(machine_with_reference("m1", "ghost")).await;
    h.seed_template("deb", COUNTING_RECIPE).await;
    h.seed_workflow(deb_workflow("w", "m1", Default::default())).await;

    let engine = tink_engine::Reconciler::new(
        h.store.clone(),
        h.store.clone(),
        h.clock.clone(),
        tink_core::SequentialIdGen::new("id"),
    )
    .with_config(tink_engine::ReconcilerConfig {
        reference_policy: tink_render::ReferencePolicy::allow_all(),
        ..Default::default()
    });
    engine.reconcile(&Harness::key("w")).await.unwrap();

    let wf = h.workflow("w").await;
    assert_eq!(wf.status.state, WorkflowState::Pending);
    assert_eq!(
        wf.status.tasks[0].actions[0]
            .environment
            .get("REF_COUNT")
            .map(String::as_str),
        Some("0")
    );
}
