// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level dispatch.

use crate::ReconcileError;
use std::sync::Arc;
use std::time::Duration;
use tink_core::{Backoff, Clock, IdGen, NamespacedName, Workflow, WorkflowState};
use tink_render::{JsonPatternMatcher, ReferencePolicy, RuleMatcher};
use tink_store::{DynamicReader, Store};
use tracing::{debug, warn};

/// What the watch framework should do after a reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Nothing scheduled; the next watch event drives the workflow.
    Done,
    /// Run again immediately.
    Requeue,
    /// Run again after the given delay.
    RequeueAfter(Duration),
}

/// Tuning knobs. The defaults match production behavior; tests shrink the
/// backoffs to zero.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Update attempts for the hardware netboot flip.
    pub hardware_update_retries: u32,
    /// Delay schedule between conflict retries.
    pub retry_backoff: Backoff,
    /// Delay schedule while polling a running BMC job.
    pub job_poll_backoff: Backoff,
    /// In-reconcile polls of a running BMC job before requeueing.
    pub job_poll_attempts: u32,
    /// Reference access policy for template rendering.
    pub reference_policy: ReferencePolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            hardware_update_retries: 3,
            retry_backoff: Backoff::default(),
            job_poll_backoff: Backoff::default(),
            job_poll_attempts: 3,
            reference_policy: ReferencePolicy::default(),
        }
    }
}

/// The workflow lifecycle state machine.
///
/// Holds no per-workflow state: everything a reconcile needs to resume is
/// in the workflow's status. The framework serializes reconciles per key;
/// distinct keys may run concurrently on one shared instance.
pub struct Reconciler<S, D, C, I> {
    pub(crate) store: S,
    pub(crate) dynamic: D,
    pub(crate) clock: C,
    pub(crate) ids: I,
    pub(crate) matcher: Arc<dyn RuleMatcher>,
    pub(crate) config: ReconcilerConfig,
}

impl<S, D, C, I> Reconciler<S, D, C, I>
where
    S: Store,
    D: DynamicReader,
    C: Clock,
    I: IdGen,
{
    pub fn new(store: S, dynamic: D, clock: C, ids: I) -> Self {
        Self {
            store,
            dynamic,
            clock,
            ids,
            matcher: Arc::new(JsonPatternMatcher),
            config: ReconcilerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Swap the rule engine used for reference policy evaluation.
    pub fn with_matcher(mut self, matcher: Arc<dyn RuleMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// One reconcile of one workflow key.
    ///
    /// Fetch, dispatch on `status.state`, then issue a single status patch
    /// if anything changed. Errors from the phase and from the patch are
    /// both reported.
    pub async fn reconcile(
        &self,
        key: &NamespacedName,
    ) -> Result<ReconcileAction, ReconcileError> {
        let mut workflow: Workflow = match self.store.get(key).await {
            Ok(workflow) => workflow,
            Err(e) if e.is_not_found() => {
                debug!(workflow = %key, "gone before reconcile; nothing to do");
                return Ok(ReconcileAction::Done);
            }
            Err(e) => return Err(e.into()),
        };

        if workflow.metadata.is_terminating() {
            return Ok(ReconcileAction::Done);
        }

        let original = workflow.clone();
        let state = workflow.status.state;
        debug!(workflow = %key, state = %state, "reconciling");

        let outcome = match state {
            WorkflowState::Unspecified => self.start(&mut workflow).await,
            WorkflowState::Preparing => self.prepare(&mut workflow).await,
            WorkflowState::Running => self.track_running(&mut workflow),
            WorkflowState::Post => self.post(&mut workflow).await,
            WorkflowState::Pending
            | WorkflowState::Success
            | WorkflowState::Failed
            | WorkflowState::Timeout => Ok(ReconcileAction::Done),
            WorkflowState::Unknown => {
                warn!(workflow = %key, "unknown state; skipping");
                Ok(ReconcileAction::Done)
            }
        };

        let patch_error = if workflow.status != original.status {
            self.store
                .patch_status(&workflow)
                .await
                .err()
                .map(ReconcileError::from)
        } else {
            None
        };

        match (outcome, patch_error) {
            (outcome, None) => outcome,
            (Ok(_), Some(patch_error)) => Err(patch_error),
            (Err(phase_error), patch_error) => Err(phase_error.join(patch_error)),
        }
    }
}
