// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! BMC-job sub-controller.
//!
//! A deterministic three-phase machine per derived job name, driven
//! entirely by the tracking record in the workflow status: delete any
//! stale job, create (or adopt) the new one, then follow it to a terminal
//! condition. Two reconciles that observe the same record do the same
//! work, which is what makes job creation at-most-once per purpose.

use crate::reconciler::Reconciler;
use crate::ReconcileError;
use std::fmt;
use tink_core::{
    BmcAction, BmcJob, BmcJobSpec, BmcTask, Clock, Condition, ConditionStatus, ConditionType,
    Hardware, IdGen, JobConditionType, NamespacedName, ObjectMeta, OwnerReference, Workflow,
    OWNING_JOB_LABEL,
};
use tink_store::{DynamicReader, ListQuery, Store};
use tracing::{debug, info, warn};

/// Why a job exists. Fixes the derived job name `<purpose>-<workflow>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPurpose {
    Netboot,
    IsoMount,
    IsoEject,
    CustombootPreparing,
    CustombootPost,
    PostOverride,
}

impl fmt::Display for JobPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobPurpose::Netboot => "netboot",
            JobPurpose::IsoMount => "iso-mount",
            JobPurpose::IsoEject => "iso-eject",
            JobPurpose::CustombootPreparing => "customboot-preparing",
            JobPurpose::CustombootPost => "customboot-post",
            JobPurpose::PostOverride => "post-override",
        };
        write!(f, "{s}")
    }
}

impl JobPurpose {
    pub fn job_name(&self, workflow_name: &str) -> String {
        format!("{self}-{workflow_name}")
    }
}

/// What `ensure_job` accomplished this reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    /// A lifecycle phase progressed; reconcile again immediately.
    Progressed,
    /// The job is still running; reconcile again after the capped step.
    Running,
    Complete,
    Failed(String),
}

impl<S, D, C, I> Reconciler<S, D, C, I>
where
    S: Store,
    D: DynamicReader,
    C: Clock,
    I: IdGen,
{
    /// Drive the named job one step toward completion.
    ///
    /// The caller has already validated that `hardware` carries a BMC
    /// reference and rendered the action list.
    pub(crate) async fn ensure_job(
        &self,
        workflow: &mut Workflow,
        hardware: &Hardware,
        purpose: JobPurpose,
        actions: Vec<BmcAction>,
    ) -> Result<JobOutcome, ReconcileError> {
        let job_name = purpose.job_name(&workflow.metadata.name);
        let namespace = workflow.metadata.namespace.clone();
        let job_key = NamespacedName::new(&namespace, &job_name);
        let now = self.clock.epoch_ms();

        let mut track = workflow
            .status
            .boot_options
            .jobs
            .get(&job_name)
            .cloned()
            .unwrap_or_default();

        if track.complete {
            return Ok(JobOutcome::Complete);
        }

        // Phase one: clear out any job left over from an earlier run of
        // this workflow, along with its child tasks.
        if !track.existing_job_deleted {
            match self.store.delete::<BmcJob>(&job_key).await {
                Ok(()) => info!(job = %job_key, "deleted stale job"),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            self.store
                .delete_all_of::<BmcTask>(
                    ListQuery::in_namespace(&namespace).with_label(OWNING_JOB_LABEL, &job_name),
                )
                .await?;

            track.existing_job_deleted = true;
            track.uid.clear();
            track.complete = false;
            workflow.status.boot_options.jobs.insert(job_name, track);
            return Ok(JobOutcome::Progressed);
        }

        // Phase two: create the job, or adopt one that already exists and
        // is not on its way out.
        if track.uid.is_empty() {
            match self.store.get::<BmcJob>(&job_key).await {
                Ok(existing) if !existing.metadata.is_terminating() => {
                    debug!(job = %job_key, uid = %existing.metadata.uid, "adopting existing job");
                    track.uid = existing.metadata.uid;
                }
                Ok(_) => {
                    // Still terminating; check again next reconcile.
                    workflow.status.boot_options.jobs.insert(job_name, track);
                    return Ok(JobOutcome::Progressed);
                }
                Err(e) if e.is_not_found() => {
                    let job = new_job(&job_name, &namespace, workflow, hardware, actions);
                    match self.store.create(&job).await {
                        Ok(created) => {
                            info!(job = %job_key, "created bmc job");
                            track.uid = created.metadata.uid;
                        }
                        Err(e) => {
                            workflow.status.conditions.set(
                                Condition::new(
                                    ConditionType::BootJobSetupFailed,
                                    ConditionStatus::True,
                                    now,
                                )
                                .with_reason("Error")
                                .with_message(e.to_string()),
                            );
                            return Err(e.into());
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }

            workflow.status.conditions.set(Condition::new(
                ConditionType::BootJobSetupComplete,
                ConditionStatus::True,
                now,
            ));
            workflow.status.boot_options.jobs.insert(job_name, track);
            return Ok(JobOutcome::Progressed);
        }

        // Phase three: follow the job to a terminal condition, polling a
        // bounded number of times before giving the slot back.
        let mut attempt = 0u32;
        loop {
            let job: BmcJob = self.store.get(&job_key).await?;

            if job.has_condition(JobConditionType::JobFailed) {
                let message = job
                    .condition_message(JobConditionType::JobFailed)
                    .unwrap_or("bmc job failed")
                    .to_string();
                warn!(job = %job_key, message = %message, "bmc job failed");
                workflow.status.conditions.set(
                    Condition::new(ConditionType::BootJobFailed, ConditionStatus::True, now)
                        .with_reason("Error")
                        .with_message(message.clone()),
                );
                return Ok(JobOutcome::Failed(message));
            }

            if job.has_condition(JobConditionType::JobCompleted) {
                info!(job = %job_key, "bmc job complete");
                track.complete = true;
                workflow.status.boot_options.jobs.insert(job_name, track);
                workflow.status.conditions.set(Condition::new(
                    ConditionType::BootJobComplete,
                    ConditionStatus::True,
                    now,
                ));
                return Ok(JobOutcome::Complete);
            }

            if attempt >= self.config.job_poll_attempts {
                workflow.status.conditions.set_if_different(Condition::new(
                    ConditionType::BootJobRunning,
                    ConditionStatus::True,
                    now,
                ));
                return Ok(JobOutcome::Running);
            }

            tokio::time::sleep(self.config.job_poll_backoff.delay(attempt)).await;
            attempt += 1;
        }
    }
}

fn new_job(
    job_name: &str,
    namespace: &str,
    workflow: &Workflow,
    hardware: &Hardware,
    actions: Vec<BmcAction>,
) -> BmcJob {
    let mut metadata = ObjectMeta::named(namespace, job_name);
    metadata
        .labels
        .insert(OWNING_JOB_LABEL.to_string(), job_name.to_string());
    metadata.owner_references.push(OwnerReference {
        kind: "Workflow".to_string(),
        name: workflow.metadata.name.clone(),
        uid: workflow.metadata.uid.clone(),
        controller: true,
    });

    // Caller validated the reference; an empty fallback never reaches a
    // provider because creation is gated on it upstream.
    let machine_ref = hardware.spec.bmc_ref.clone().unwrap_or_default();

    BmcJob {
        metadata,
        spec: BmcJobSpec {
            machine_ref,
            tasks: actions,
        },
        status: Default::default(),
    }
}

#[cfg(test)]
#[path = "bmc_tests.rs"]
mod tests;
