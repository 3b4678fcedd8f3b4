// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store and dynamic-read seams.

use crate::{ListQuery, StoreError};
use async_trait::async_trait;
use tink_core::{GroupVersionResource, NamespacedName, Resource};

/// Typed CRUD surface over the cluster store.
///
/// `update` carries the optimistic-concurrency token (`resourceVersion`)
/// and fails with [`StoreError::Conflict`] when stale. Status is a
/// subresource: `update` never writes it, `patch_status` writes nothing
/// else. Every call is a suspension point that surfaces cancellation by
/// simply never resuming — callers must not hold work they cannot drop.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    async fn get<R: Resource>(&self, key: &NamespacedName) -> Result<R, StoreError>;

    /// List objects matching the query. Order is deterministic (by key).
    async fn list<R: Resource>(&self, query: ListQuery) -> Result<Vec<R>, StoreError>;

    /// Create the object; the store assigns uid and resourceVersion.
    async fn create<R: Resource>(&self, obj: &R) -> Result<R, StoreError>;

    /// Replace spec and metadata at the object's resourceVersion.
    async fn update<R: Resource>(&self, obj: &R) -> Result<R, StoreError>;

    async fn delete<R: Resource>(&self, key: &NamespacedName) -> Result<(), StoreError>;

    /// Delete every object matching the query; returns how many went away.
    async fn delete_all_of<R: Resource>(&self, query: ListQuery) -> Result<usize, StoreError>;

    /// Merge-from status patch: replaces only the status subtree of the
    /// latest stored object, leaving concurrent spec/metadata writes
    /// intact. Does not conflict — workflow status has a single writer.
    async fn patch_status<R: Resource>(&self, obj: &R) -> Result<R, StoreError>;
}

/// Schema-free read used by the reference resolver. Implementations map a
/// group/version/resource coordinate to whatever backs it and hand back
/// the decoded document.
#[async_trait]
pub trait DynamicReader: Clone + Send + Sync + 'static {
    async fn read(
        &self,
        gvr: &GroupVersionResource,
        name: &str,
        namespace: &str,
    ) -> Result<serde_json::Value, StoreError>;
}
