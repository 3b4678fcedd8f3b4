// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile error taxonomy.

use thiserror::Error;
use tink_render::RenderError;
use tink_store::StoreError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Terminal-for-phase misconfiguration (missing ISO URL, missing BMC
    /// reference, ...).
    #[error("{0}")]
    Validation(String),
    /// The BMC provider reported the job failed.
    #[error("bmc job {job} failed: {message}")]
    JobFailed { job: String, message: String },
    /// The conflict-retry budget ran out.
    #[error("update of {0} exhausted its retry budget")]
    RetriesExhausted(String),
    #[error("{}", join_errors(.0))]
    Aggregate(Vec<ReconcileError>),
}

fn join_errors(errors: &[ReconcileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ReconcileError {
    /// Fold an optional second error into the first.
    pub fn join(self, other: Option<ReconcileError>) -> ReconcileError {
        match other {
            None => self,
            Some(other) => ReconcileError::Aggregate(vec![self, other]),
        }
    }
}
