// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tink-store: the object-store seam.
//!
//! The engine talks to the cluster through the [`Store`] and
//! [`DynamicReader`] traits only. [`MemoryStore`] is a faithful in-process
//! implementation (optimistic concurrency, status subresource semantics,
//! eagerly maintained indexes) used by every test in the workspace and by
//! embedded deployments.

mod error;
mod memory;
mod query;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::ListQuery;
pub use traits::{DynamicReader, Store};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod flaky;
#[cfg(any(test, feature = "test-support"))]
pub use flaky::{FlakyStore, StoreOp};
