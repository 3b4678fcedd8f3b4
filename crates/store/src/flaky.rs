// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault-injecting store wrapper for tests.

use crate::{DynamicReader, ListQuery, Store, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tink_core::{GroupVersionResource, NamespacedName, Resource};

/// Operations the wrapper records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    List,
    Create,
    Update,
    Delete,
    DeleteAllOf,
    PatchStatus,
}

#[derive(Default)]
struct FlakyState {
    /// Updates left to fail with Conflict before passing through.
    conflicts_remaining: u32,
    calls: HashMap<(&'static str, StoreOp), u32>,
}

/// Wraps any [`Store`], counting calls per kind and optionally failing a
/// scripted number of `update` calls with `Conflict`.
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    state: Arc<Mutex<FlakyState>>,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Arc::new(Mutex::new(FlakyState::default())),
        }
    }

    /// Fail the next `n` update calls with a resource-version conflict.
    pub fn fail_next_updates(&self, n: u32) {
        self.state.lock().conflicts_remaining = n;
    }

    /// How many times `op` ran against `kind`.
    pub fn calls(&self, kind: &'static str, op: StoreOp) -> u32 {
        self.state
            .lock()
            .calls
            .get(&(kind, op))
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, kind: &'static str, op: StoreOp) {
        *self.state.lock().calls.entry((kind, op)).or_insert(0) += 1;
    }
}

#[async_trait]
impl<S: Store> Store for FlakyStore<S> {
    async fn get<R: Resource>(&self, key: &NamespacedName) -> Result<R, StoreError> {
        self.record(R::KIND, StoreOp::Get);
        self.inner.get(key).await
    }

    async fn list<R: Resource>(&self, query: ListQuery) -> Result<Vec<R>, StoreError> {
        self.record(R::KIND, StoreOp::List);
        self.inner.list(query).await
    }

    async fn create<R: Resource>(&self, obj: &R) -> Result<R, StoreError> {
        self.record(R::KIND, StoreOp::Create);
        self.inner.create(obj).await
    }

    async fn update<R: Resource>(&self, obj: &R) -> Result<R, StoreError> {
        self.record(R::KIND, StoreOp::Update);
        {
            let mut state = self.state.lock();
            if state.conflicts_remaining > 0 {
                state.conflicts_remaining -= 1;
                return Err(StoreError::Conflict {
                    kind: R::KIND,
                    key: obj.key(),
                });
            }
        }
        self.inner.update(obj).await
    }

    async fn delete<R: Resource>(&self, key: &NamespacedName) -> Result<(), StoreError> {
        self.record(R::KIND, StoreOp::Delete);
        self.inner.delete::<R>(key).await
    }

    async fn delete_all_of<R: Resource>(&self, query: ListQuery) -> Result<usize, StoreError> {
        self.record(R::KIND, StoreOp::DeleteAllOf);
        self.inner.delete_all_of::<R>(query).await
    }

    async fn patch_status<R: Resource>(&self, obj: &R) -> Result<R, StoreError> {
        self.record(R::KIND, StoreOp::PatchStatus);
        self.inner.patch_status(obj).await
    }
}

#[async_trait]
impl<S: DynamicReader> DynamicReader for FlakyStore<S> {
    async fn read(
        &self,
        gvr: &GroupVersionResource,
        name: &str,
        namespace: &str,
    ) -> Result<serde_json::Value, StoreError> {
        self.inner.read(gvr, name, namespace).await
    }
}
