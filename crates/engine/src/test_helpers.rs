// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::reconciler::{Reconciler, ReconcilerConfig};
use tink_core::{
    Backoff, BmcJob, FakeClock, Hardware, HardwareSpec, Interface, JobCondition, JobConditionType,
    LocalRef, NamespacedName, ObjectMeta, SequentialIdGen, Workflow,
};
use tink_store::{DynamicReader, MemoryStore, Store};

/// Zero-delay config so retry loops run instantly under test.
pub(crate) fn fast_config() -> ReconcilerConfig {
    ReconcilerConfig {
        retry_backoff: Backoff::none(),
        job_poll_backoff: Backoff::none(),
        job_poll_attempts: 0,
        ..Default::default()
    }
}

pub(crate) fn reconciler<S>(store: S, clock: FakeClock) -> Reconciler<S, S, FakeClock, SequentialIdGen>
where
    S: Store + DynamicReader,
{
    Reconciler::new(store.clone(), store, clock, SequentialIdGen::default())
        .with_config(fast_config())
}

pub(crate) fn machine_with_bmc(name: &str, macs: &[&str]) -> Hardware {
    Hardware {
        metadata: ObjectMeta::named("default", name),
        spec: HardwareSpec {
            interfaces: macs
                .iter()
                .map(|mac| Interface {
                    mac: mac.to_string(),
                    ..Default::default()
                })
                .collect(),
            bmc_ref: Some(LocalRef::named(format!("bmc-{name}"))),
            ..Default::default()
        },
    }
}

pub(crate) fn workflow(name: &str, hardware_ref: &str) -> Workflow {
    Workflow {
        metadata: ObjectMeta::named("default", name),
        spec: tink_core::WorkflowSpec {
            template_ref: "recipe".to_string(),
            hardware_ref: hardware_ref.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Flip a terminal condition on a stored BMC job, as the provider would.
pub(crate) async fn mark_job(
    store: &MemoryStore,
    name: &str,
    condition_type: JobConditionType,
    message: Option<&str>,
) {
    let key = NamespacedName::new("default", name);
    let mut job: BmcJob = store.get(&key).await.unwrap();
    job.status.conditions.push(JobCondition {
        condition_type,
        status: true,
        message: message.map(str::to_string),
        time: 0,
    });
    store.patch_status(&job).await.unwrap();
}
