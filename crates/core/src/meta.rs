// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object identity and metadata shared by every stored resource.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// `namespace/name` identity of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `"namespace/name"`, or a bare name resolved against a default
    /// namespace.
    pub fn parse(key: &str, default_namespace: &str) -> Result<Self, ParseKeyError> {
        match key.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(ns, name))
            }
            Some(_) => Err(ParseKeyError {
                key: key.to_string(),
            }),
            None if key.is_empty() => Err(ParseKeyError {
                key: key.to_string(),
            }),
            None => Ok(Self::new(default_namespace, key)),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Error from parsing an object key.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid object key: {key:?}")]
pub struct ParseKeyError {
    pub key: String,
}

/// Relationship from a child object to the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
    /// True when the owner is the managing controller.
    #[serde(default)]
    pub controller: bool,
}

/// Metadata common to all stored resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Assigned by the store on create.
    #[serde(default)]
    pub uid: String,
    /// Optimistic-concurrency token; bumped by the store on every write.
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default)]
    pub creation_time_ms: u64,
    /// Set when the object is being torn down; readers treat the object as
    /// terminating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_time_ms: Option<u64>,
}

impl ObjectMeta {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(self.namespace.clone(), self.name.clone())
    }

    pub fn is_terminating(&self) -> bool {
        self.deletion_time_ms.is_some()
    }
}

/// A stored, typed resource.
pub trait Resource:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Type name, e.g. `"Workflow"`.
    const KIND: &'static str;
    /// Lowercase plural used by dynamic (group/version/resource) reads.
    const PLURAL: &'static str;

    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> NamespacedName {
        self.metadata().key()
    }
}

/// Reference to an object by name, optionally in another namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl LocalRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Resolve against the namespace of the referring object.
    pub fn resolve(&self, default_namespace: &str) -> NamespacedName {
        NamespacedName::new(
            self.namespace.clone().unwrap_or_else(|| default_namespace.to_string()),
            self.name.clone(),
        )
    }
}

/// Fully-qualified reference to an arbitrary typed resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(default)]
    pub group: String,
    pub version: String,
    /// Lowercase plural resource name, e.g. `"hardware"`.
    pub resource: String,
    pub name: String,
    pub namespace: String,
}

impl ResourceRef {
    pub fn gvr(&self) -> GroupVersionResource {
        GroupVersionResource {
            group: self.group.clone(),
            version: self.version.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// Dynamic-read coordinate: which API surface a resource lives on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
