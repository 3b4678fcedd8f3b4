// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! List/delete selection.

/// Narrowing for `list` and `delete_all_of`.
///
/// Selections compose: an index selection with a namespace restricts the
/// index hits to that namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub namespace: Option<String>,
    /// Label equality, `(key, value)`.
    pub label: Option<(String, String)>,
    /// Named-index equality, `(index name, indexed value)`.
    pub index: Option<(String, String)>,
}

impl ListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.label = Some((key.into(), value.into()));
        self
    }

    pub fn with_index(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.index = Some((name.into(), value.into()));
        self
    }
}
