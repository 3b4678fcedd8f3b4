// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band (BMC) job resources.
//!
//! The engine owns job lifecycles (create, track, garbage-collect) but
//! never talks to a BMC itself. A provider controller consumes the job,
//! materializes one child task per action, and reports terminal conditions.

use crate::meta::{LocalRef, ObjectMeta, Resource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label a job stamps onto its child tasks, for stale-child cleanup.
pub const OWNING_JOB_LABEL: &str = "tink.job";

/// An ordered list of BMC actions to run against one machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmcJob {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BmcJobSpec,
    #[serde(default)]
    pub status: BmcJobStatus,
}

impl Resource for BmcJob {
    const KIND: &'static str = "BmcJob";
    const PLURAL: &'static str = "bmcjobs";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmcJobSpec {
    /// The BMC machine the provider should drive.
    pub machine_ref: LocalRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<BmcAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmcJobStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<JobCondition>,
}

impl BmcJob {
    pub fn has_condition(&self, condition_type: JobConditionType) -> bool {
        self.status
            .conditions
            .iter()
            .any(|c| c.condition_type == condition_type && c.status)
    }

    /// Message attached to the given condition, when present.
    pub fn condition_message(&self, condition_type: JobConditionType) -> Option<&str> {
        self.status
            .conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
            .and_then(|c| c.message.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub condition_type: JobConditionType,
    /// True/False as a plain boolean.
    #[serde(default)]
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobConditionType {
    JobRunning,
    JobCompleted,
    JobFailed,
}

/// One BMC operation. Externally tagged so the JSON document reads as
/// `{"powerAction": "on"}` or `{"virtualMediaAction": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BmcAction {
    PowerAction(PowerState),
    OneTimeBootDeviceAction {
        device: BootDevice,
        #[serde(default)]
        efi_boot: bool,
    },
    VirtualMediaAction {
        /// Image to mount; an empty URL ejects instead.
        #[serde(default, rename = "mediaURL")]
        media_url: String,
        kind: VirtualMediaKind,
    },
}

impl BmcAction {
    /// Short verb for logs.
    pub fn name(&self) -> &'static str {
        match self {
            BmcAction::PowerAction(PowerState::On) => "power-on",
            BmcAction::PowerAction(PowerState::Off) => "power-off",
            BmcAction::PowerAction(PowerState::HardOff) => "power-hard-off",
            BmcAction::OneTimeBootDeviceAction { .. } => "one-time-boot",
            BmcAction::VirtualMediaAction { media_url, .. } if media_url.is_empty() => {
                "media-eject"
            }
            BmcAction::VirtualMediaAction { .. } => "media-mount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    #[serde(rename = "hardoff")]
    HardOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootDevice {
    Pxe,
    Cdrom,
    Disk,
    Bios,
}

impl fmt::Display for BootDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BootDevice::Pxe => "pxe",
            BootDevice::Cdrom => "cdrom",
            BootDevice::Disk => "disk",
            BootDevice::Bios => "bios",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VirtualMediaKind {
    #[serde(rename = "CD")]
    Cd,
}

/// Child resource a BMC provider materializes per action. The engine only
/// ever deletes stale ones by owner label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmcTask {
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<BmcAction>,
}

impl Resource for BmcTask {
    const KIND: &'static str = "BmcTask";
    const PLURAL: &'static str = "bmctasks";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
#[path = "bmc_tests.rs"]
mod tests;
