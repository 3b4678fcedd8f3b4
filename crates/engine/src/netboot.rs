// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hardware mutator: the netboot flag flip.

use crate::reconciler::Reconciler;
use crate::ReconcileError;
use tink_core::{Clock, Hardware, IdGen, NamespacedName};
use tink_store::{DynamicReader, Store};
use tracing::{debug, info};

impl<S, D, C, I> Reconciler<S, D, C, I>
where
    S: Store,
    D: DynamicReader,
    C: Clock,
    I: IdGen,
{
    /// Set `allowPXE` on every interface of the hardware, creating netboot
    /// blocks where missing.
    ///
    /// Re-fetches and retries on resource-version conflict, up to the
    /// configured attempt budget. Idempotency across reconciles is the
    /// caller's job via the workflow's toggled flags.
    pub(crate) async fn toggle_allow_pxe(
        &self,
        hardware_key: &NamespacedName,
        allow: bool,
    ) -> Result<(), ReconcileError> {
        let mut attempt = 0u32;
        loop {
            let mut hardware: Hardware = self.store.get(hardware_key).await?;
            for interface in &mut hardware.spec.interfaces {
                interface
                    .netboot
                    .get_or_insert_with(Default::default)
                    .allow_pxe = Some(allow);
            }

            match self.store.update(&hardware).await {
                Ok(_) => {
                    info!(hardware = %hardware_key, allow, "netboot flag set");
                    return Ok(());
                }
                Err(e) if e.is_conflict() => {
                    attempt += 1;
                    if attempt >= self.config.hardware_update_retries {
                        return Err(ReconcileError::RetriesExhausted(hardware_key.to_string()));
                    }
                    debug!(hardware = %hardware_key, attempt, "conflict; refetching");
                    tokio::time::sleep(self.config.retry_backoff.delay(attempt - 1)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
#[path = "netboot_tests.rs"]
mod tests;
