// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory object store.
//!
//! Stores every object as a JSON document, which keeps the status
//! subresource and dynamic-read semantics honest: typed views are decoded
//! at the edges exactly as a remote store would return them.

use crate::{DynamicReader, ListQuery, Store, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tink_core::{Clock, GroupVersionResource, NamespacedName, Resource, SystemClock};

type Extractor = Box<dyn Fn(&Value) -> Vec<String> + Send + Sync>;

struct IndexDef {
    extractor: Extractor,
    /// indexed value -> object keys, maintained on every write.
    entries: HashMap<String, BTreeSet<NamespacedName>>,
}

#[derive(Default)]
struct Inner {
    /// kind -> key -> document. BTreeMap for deterministic list order.
    objects: HashMap<&'static str, BTreeMap<NamespacedName, Value>>,
    indexes: HashMap<&'static str, HashMap<String, IndexDef>>,
    /// plural resource name -> kind, for dynamic reads.
    plurals: HashMap<String, &'static str>,
    next_version: u64,
}

impl Inner {
    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn reindex(&mut self, kind: &'static str, key: &NamespacedName, value: Option<&Value>) {
        let Some(defs) = self.indexes.get_mut(kind) else {
            return;
        };
        for def in defs.values_mut() {
            for keys in def.entries.values_mut() {
                keys.remove(key);
            }
            def.entries.retain(|_, keys| !keys.is_empty());
            if let Some(value) = value {
                for indexed in (def.extractor)(value) {
                    def.entries.entry(indexed).or_default().insert(key.clone());
                }
            }
        }
    }

    fn matches(query: &ListQuery, key: &NamespacedName, value: &Value) -> bool {
        if let Some(ns) = &query.namespace {
            if &key.namespace != ns {
                return false;
            }
        }
        if let Some((label_key, label_value)) = &query.label {
            let found = value
                .pointer(&format!("/metadata/labels/{}", label_key.replace('~', "~0").replace('/', "~1")))
                .and_then(Value::as_str);
            if found != Some(label_value.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Thread-safe in-memory [`Store`] + [`DynamicReader`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a kind visible to dynamic (group/version/resource) reads.
    pub fn register_kind<R: Resource>(&self) {
        let mut inner = self.inner.lock();
        inner.plurals.insert(R::PLURAL.to_string(), R::KIND);
        inner.objects.entry(R::KIND).or_default();
    }

    /// Install a named equality index over a kind. Existing objects are
    /// indexed immediately; writes keep the index current.
    pub fn register_index<R, F>(&self, name: &str, extract: F)
    where
        R: Resource,
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        self.register_kind::<R>();
        let extractor: Extractor = Box::new(move |value: &Value| {
            serde_json::from_value::<R>(value.clone())
                .map(|obj| extract(&obj))
                .unwrap_or_default()
        });

        let mut inner = self.inner.lock();
        let mut entries: HashMap<String, BTreeSet<NamespacedName>> = HashMap::new();
        if let Some(objects) = inner.objects.get(R::KIND) {
            for (key, value) in objects {
                for indexed in extractor(value) {
                    entries.entry(indexed).or_default().insert(key.clone());
                }
            }
        }
        inner
            .indexes
            .entry(R::KIND)
            .or_default()
            .insert(name.to_string(), IndexDef { extractor, entries });
        tracing::debug!(kind = R::KIND, index = name, "registered index");
    }

    fn decode<R: Resource>(value: &Value) -> Result<R, StoreError> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get<R: Resource>(&self, key: &NamespacedName) -> Result<R, StoreError> {
        let inner = self.inner.lock();
        let value = inner
            .objects
            .get(R::KIND)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            })?;
        Self::decode(value)
    }

    async fn list<R: Resource>(&self, query: ListQuery) -> Result<Vec<R>, StoreError> {
        let inner = self.inner.lock();

        if let Some((index_name, indexed_value)) = &query.index {
            let def = inner
                .indexes
                .get(R::KIND)
                .and_then(|defs| defs.get(index_name))
                .ok_or_else(|| StoreError::UnknownIndex {
                    kind: R::KIND,
                    index: index_name.clone(),
                })?;
            let keys = def.entries.get(indexed_value).cloned().unwrap_or_default();
            let objects = inner.objects.get(R::KIND);
            let mut out = Vec::with_capacity(keys.len());
            for key in keys {
                if let Some(value) = objects.and_then(|o| o.get(&key)) {
                    if Inner::matches(&query, &key, value) {
                        out.push(Self::decode(value)?);
                    }
                }
            }
            return Ok(out);
        }

        let mut out = Vec::new();
        if let Some(objects) = inner.objects.get(R::KIND) {
            for (key, value) in objects {
                if Inner::matches(&query, key, value) {
                    out.push(Self::decode(value)?);
                }
            }
        }
        Ok(out)
    }

    async fn create<R: Resource>(&self, obj: &R) -> Result<R, StoreError> {
        let mut obj = obj.clone();
        let key = obj.key();

        let mut inner = self.inner.lock();
        if inner
            .objects
            .get(R::KIND)
            .is_some_and(|objects| objects.contains_key(&key))
        {
            return Err(StoreError::AlreadyExists { kind: R::KIND, key });
        }

        let meta = obj.metadata_mut();
        meta.uid = uuid::Uuid::new_v4().to_string();
        meta.creation_time_ms = SystemClock.epoch_ms();
        meta.resource_version = inner.bump_version();

        let value = serde_json::to_value(&obj)?;
        inner.objects.entry(R::KIND).or_default().insert(key.clone(), value.clone());
        inner.reindex(R::KIND, &key, Some(&value));
        Ok(obj)
    }

    async fn update<R: Resource>(&self, obj: &R) -> Result<R, StoreError> {
        let key = obj.key();
        let mut inner = self.inner.lock();

        let stored = inner
            .objects
            .get(R::KIND)
            .and_then(|objects| objects.get(&key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            })?;

        let stored_version = stored
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if obj.metadata().resource_version != stored_version {
            return Err(StoreError::Conflict { kind: R::KIND, key });
        }

        let mut obj = obj.clone();
        {
            let meta = obj.metadata_mut();
            meta.resource_version = inner.bump_version();
        }
        let mut value = serde_json::to_value(&obj)?;
        // Status is a subresource: updates never write it.
        if let Some(previous_status) = stored.get("status") {
            value["status"] = previous_status.clone();
        }

        inner.objects.entry(R::KIND).or_default().insert(key.clone(), value.clone());
        inner.reindex(R::KIND, &key, Some(&value));
        Self::decode(&value)
    }

    async fn delete<R: Resource>(&self, key: &NamespacedName) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let removed = inner
            .objects
            .get_mut(R::KIND)
            .and_then(|objects| objects.remove(key));
        match removed {
            Some(_) => {
                inner.reindex(R::KIND, key, None);
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            }),
        }
    }

    async fn delete_all_of<R: Resource>(&self, query: ListQuery) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        let keys: Vec<NamespacedName> = inner
            .objects
            .get(R::KIND)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|(key, value)| Inner::matches(&query, key, value))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();

        for key in &keys {
            if let Some(objects) = inner.objects.get_mut(R::KIND) {
                objects.remove(key);
            }
            inner.reindex(R::KIND, key, None);
        }
        Ok(keys.len())
    }

    async fn patch_status<R: Resource>(&self, obj: &R) -> Result<R, StoreError> {
        let key = obj.key();
        let mut inner = self.inner.lock();

        let mut stored = inner
            .objects
            .get(R::KIND)
            .and_then(|objects| objects.get(&key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            })?;

        let incoming = serde_json::to_value(obj)?;
        match incoming.get("status") {
            Some(status) => stored["status"] = status.clone(),
            None => {
                if let Some(map) = stored.as_object_mut() {
                    map.remove("status");
                }
            }
        }
        stored["metadata"]["resourceVersion"] = Value::from(inner.bump_version());

        inner
            .objects
            .entry(R::KIND)
            .or_default()
            .insert(key.clone(), stored.clone());
        inner.reindex(R::KIND, &key, Some(&stored));
        Self::decode(&stored)
    }
}

#[async_trait]
impl DynamicReader for MemoryStore {
    async fn read(
        &self,
        gvr: &GroupVersionResource,
        name: &str,
        namespace: &str,
    ) -> Result<Value, StoreError> {
        let inner = self.inner.lock();
        let kind = inner
            .plurals
            .get(&gvr.resource)
            .copied()
            .ok_or_else(|| StoreError::UnknownResource {
                resource: gvr.resource.clone(),
            })?;
        let key = NamespacedName::new(namespace, name);
        inner
            .objects
            .get(kind)
            .and_then(|objects| objects.get(&key))
            .cloned()
            .ok_or(StoreError::NotFound { kind, key })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
