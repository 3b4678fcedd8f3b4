// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hardware: the declarative description of one physical machine.
//!
//! Operators own the spec. The engine mutates exactly one thing here, the
//! per-interface `allowPXE` flag, and only through the conflict-retrying
//! mutator in the engine crate.

use crate::meta::{LocalRef, ObjectMeta, Resource, ResourceRef};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use thiserror::Error;

#[allow(clippy::expect_used)]
static MAC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-f]{2}:){5}[0-9a-f]{2}$").expect("constant regex pattern is valid")
});

/// A physical machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hardware {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: HardwareSpec,
}

impl Resource for Hardware {
    const KIND: &'static str = "Hardware";
    const PLURAL: &'static str = "hardware";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareSpec {
    /// Identity the on-machine agent reports, typically the primary MAC in
    /// lowercase colon form.
    #[serde(default, rename = "agentID", skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<Interface>,
    /// Cloud-init instance metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<Instance>,
    /// The out-of-band controller for this machine, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmc_ref: Option<LocalRef>,
    /// Named pointers to arbitrary typed resources, exposed to templates
    /// as `.references.<name>` subject to the reference access policy.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub references: IndexMap<String, ResourceRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<Disk>,
}

/// One network interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    /// Lowercase `aa:bb:cc:dd:ee:ff`.
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp: Option<Dhcp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netboot: Option<Netboot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_boot: Option<IsoBoot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    #[default]
    Ipv4,
    Ipv6,
}

/// DHCP reservation for an interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dhcp {
    #[serde(default)]
    pub family: IpFamily,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default = "default_lease_time")]
    pub lease_time_seconds: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_servers: Vec<String>,
    #[serde(default, rename = "vlanID", skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<String>,
    /// OS-visible interface name; `bond<N>phy<M>` names group into bonds in
    /// the generated network config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iface_name: Option<String>,
    #[serde(default)]
    pub uefi: bool,
    /// DHCP option 66. Must accompany `bootFileName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tftp_server_name: Option<String>,
    /// DHCP option 67. Requires `tftpServerName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_file_name: Option<String>,
    /// Classless static routes (RFC 3442).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_routes: Vec<StaticRoute>,
}

fn default_lease_time() -> u64 {
    86_400
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticRoute {
    /// CIDR destination, e.g. `10.0.0.0/8`.
    pub destination: String,
    pub gateway: String,
}

/// Network-boot settings for an interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Netboot {
    /// Tri-state: unset means the engine has never decided.
    #[serde(default, rename = "allowPXE", skip_serializing_if = "Option::is_none")]
    pub allow_pxe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipxe: Option<Ipxe>,
    /// Explicit iPXE binary override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipxe_binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osie: Option<Osie>,
}

/// iPXE script source: a URL to chain, or inline contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ipxe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

/// Location of the installation environment's kernel and initrd.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Osie {
    #[serde(default, rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initrd: Option<String>,
}

/// ISO boot source for an interface. HTTP/HTTPS only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsoBoot {
    pub url: String,
}

/// Cloud-init instance metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userdata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendordata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Bond mode (0–6) applied to `bond<N>phy<M>` interface groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonding_mode: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<OperatingSystem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<InstanceIp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatingSystem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceIp {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(default)]
    pub family: IpFamily,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub device: String,
}

/// All schema violations found on a Hardware spec.
#[derive(Debug, Error, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hardware: {}", self.violations.join("; "))
    }
}

impl Hardware {
    /// Validate the spec. Collects every violation instead of stopping at
    /// the first.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        for (i, iface) in self.spec.interfaces.iter().enumerate() {
            if !MAC_PATTERN.is_match(&iface.mac) {
                violations.push(format!(
                    "interfaces[{i}].mac {:?} is not a lowercase colon-form MAC",
                    iface.mac
                ));
            }

            if let Some(dhcp) = &iface.dhcp {
                if dhcp.family == IpFamily::Ipv4 {
                    if let Some(address) = &dhcp.address {
                        if address.parse::<Ipv4Addr>().is_err() {
                            violations.push(format!(
                                "interfaces[{i}].dhcp.address {address:?} is not a valid IPv4 address"
                            ));
                        }
                    }
                }
                if dhcp.boot_file_name.is_some() && dhcp.tftp_server_name.is_none() {
                    violations.push(format!(
                        "interfaces[{i}].dhcp.bootFileName requires tftpServerName"
                    ));
                }
            }

            if let Some(iso) = &iface.iso_boot {
                if !iso.url.starts_with("http://") && !iso.url.starts_with("https://") {
                    violations.push(format!(
                        "interfaces[{i}].isoBoot.url {:?} must be http or https",
                        iso.url
                    ));
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// True when any interface's DHCP reservation selects UEFI boot.
    pub fn any_uefi(&self) -> bool {
        self.spec
            .interfaces
            .iter()
            .any(|iface| iface.dhcp.as_ref().is_some_and(|d| d.uefi))
    }

    /// Interface carrying the given MAC, if any.
    pub fn interface_by_mac(&self, mac: &str) -> Option<&Interface> {
        self.spec.interfaces.iter().find(|iface| iface.mac == mac)
    }
}

#[cfg(test)]
#[path = "hardware_tests.rs"]
mod tests;
