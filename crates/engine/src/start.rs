// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First reconcile of a new workflow: render the recipe and decide where
//! to go.

use crate::reconciler::{ReconcileAction, Reconciler};
use crate::ReconcileError;
use tink_core::{
    Clock, Condition, ConditionStatus, ConditionType, Hardware, IdGen, NamespacedName, Secret,
    Template, TemplateRendering, Workflow, WorkflowState, WorkflowStatus,
};
use tink_render::{render_recipe, resolve_references, RenderInput, ResolvedReferences};
use tink_store::{DynamicReader, Store};
use tracing::{debug, info};

impl<S, D, C, I> Reconciler<S, D, C, I>
where
    S: Store,
    D: DynamicReader,
    C: Clock,
    I: IdGen,
{
    pub(crate) async fn start(
        &self,
        workflow: &mut Workflow,
    ) -> Result<ReconcileAction, ReconcileError> {
        let namespace = workflow.metadata.namespace.clone();

        let template: Template = match self
            .store
            .get(&NamespacedName::new(&namespace, &workflow.spec.template_ref))
            .await
        {
            Ok(template) => template,
            Err(e) => return Err(self.fail_render(workflow, e.into(), None)),
        };

        let hardware: Option<Hardware> = if workflow.spec.hardware_ref.is_empty() {
            None
        } else {
            match self
                .store
                .get(&NamespacedName::new(&namespace, &workflow.spec.hardware_ref))
                .await
            {
                Ok(hardware) => Some(hardware),
                Err(e) => return Err(self.fail_render(workflow, e.into(), None)),
            }
        };

        let references = match &hardware {
            Some(hardware) if !hardware.spec.references.is_empty() => {
                resolve_references(
                    self.matcher.as_ref(),
                    &self.config.reference_policy,
                    &self.dynamic,
                    hardware,
                )
                .await
            }
            _ => ResolvedReferences::default(),
        };

        let secret = match &template.spec.secret_ref {
            Some(secret_ref) => {
                let key = secret_ref.resolve(&namespace);
                match self.store.get::<Secret>(&key).await {
                    Ok(secret) => Some(secret.string_data()),
                    Err(e) => {
                        return Err(self.fail_render(
                            workflow,
                            e.into(),
                            references.error_summary(),
                        ))
                    }
                }
            }
            None => None,
        };

        let rendered = match render_recipe(
            &RenderInput {
                template: &template.spec.data,
                hardware: hardware.as_ref(),
                variables: &workflow.spec.hardware_map,
                references: &references.objects,
                secret: secret.as_ref(),
            },
            &self.ids,
        ) {
            Ok(rendered) => rendered,
            Err(e) => {
                return Err(self.fail_render(
                    workflow,
                    e.into(),
                    references.error_summary(),
                ))
            }
        };

        let agent_id = rendered
            .tasks
            .first()
            .map(|task| task.agent_id.clone())
            .unwrap_or_default();

        workflow.status.global_timeout = rendered.global_timeout;
        workflow.status.tasks = rendered.tasks;
        workflow.status.agent_id = agent_id.clone();
        workflow.status.template_rendering = TemplateRendering::Successful;
        workflow.status.conditions.set(
            Condition::new(
                ConditionType::TemplateRenderedSuccess,
                ConditionStatus::True,
                self.clock.epoch_ms(),
            ),
        );

        if workflow.spec.disabled {
            // A disabled workflow keeps only its agent identity so the
            // backend can still answer who it belongs to.
            debug!(workflow = %workflow.metadata.key(), "disabled; keeping agentID only");
            workflow.status = WorkflowStatus {
                agent_id,
                ..Default::default()
            };
            return Ok(ReconcileAction::Done);
        }

        if workflow.spec.boot_options.wants_preparing() {
            info!(workflow = %workflow.metadata.key(), "rendered; boot options requested");
            workflow.status.state = WorkflowState::Preparing;
            return Ok(ReconcileAction::Requeue);
        }

        info!(workflow = %workflow.metadata.key(), "rendered; waiting for agent");
        workflow.status.state = WorkflowState::Pending;
        Ok(ReconcileAction::Done)
    }

    /// Record a render failure: condition, rendering tag, terminal state.
    /// The original error goes back to the framework for its requeue.
    fn fail_render(
        &self,
        workflow: &mut Workflow,
        error: ReconcileError,
        reference_errors: Option<String>,
    ) -> ReconcileError {
        let full_message = match reference_errors {
            Some(reference_errors) => format!("{error} (references: {reference_errors})"),
            None => error.to_string(),
        };

        workflow.status.template_rendering = TemplateRendering::Failed;
        workflow.status.state = WorkflowState::Failed;
        workflow.status.conditions.set(
            Condition::new(
                ConditionType::TemplateRenderedSuccess,
                ConditionStatus::False,
                self.clock.epoch_ms(),
            )
            .with_reason("Error")
            .with_message(full_message),
        );

        error
    }
}
