// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend error taxonomy.

use thiserror::Error;
use tink_core::{NamespacedName, ParseKeyError};
use tink_store::StoreError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    InvalidKey(#[from] ParseKeyError),
    /// An indexed lookup that must be unique returned several objects.
    /// Distinct from the empty result: this is a data problem an operator
    /// has to fix.
    #[error("{count} {kind} objects match {field} {value:?}; expected at most one")]
    MultipleMatches {
        kind: &'static str,
        field: &'static str,
        value: String,
        count: usize,
    },
    /// An agent status write tried to change the spec.
    #[error("workflow {key}: status updates may not modify the spec")]
    SpecMutation { key: NamespacedName },
    /// An agent status write arrived for a workflow already settled.
    #[error("workflow {key} is in a terminal state")]
    TerminalWorkflow { key: NamespacedName },
}
