// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error taxonomy.

use thiserror::Error;
use tink_core::NamespacedName;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound {
        kind: &'static str,
        key: NamespacedName,
    },
    /// Stale resource version on a mutating write.
    #[error("{kind} {key}: resource version conflict")]
    Conflict {
        kind: &'static str,
        key: NamespacedName,
    },
    #[error("{kind} {key} already exists")]
    AlreadyExists {
        kind: &'static str,
        key: NamespacedName,
    },
    #[error("no registered resource for dynamic read of {resource:?}")]
    UnknownResource { resource: String },
    #[error("unknown index {index:?} for {kind}")]
    UnknownIndex { kind: &'static str, index: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
