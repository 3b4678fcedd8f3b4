// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NoCloud network-config generation (version 2).
//!
//! Interfaces whose DHCP `ifaceName` matches `bond<N>phy<M>` are grouped
//! into `bond<N>`; everything else becomes an ethernet stanza keyed by its
//! interface name (or a positional `eth<N>` fallback).

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tink_core::{Dhcp, Hardware};
use tink_render::helpers::netmask_to_prefix_length;

#[allow(clippy::expect_used)]
static BOND_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^bond(\d+)phy(\d+)$").expect("constant regex pattern is valid")
});

/// Bond mode integer (0–6) to its driver name.
pub fn bond_mode_name(mode: u8) -> Option<&'static str> {
    match mode {
        0 => Some("balance-rr"),
        1 => Some("active-backup"),
        2 => Some("balance-xor"),
        3 => Some("broadcast"),
        4 => Some("802.3ad"),
        5 => Some("balance-tlb"),
        6 => Some("balance-alb"),
        _ => None,
    }
}

const DEFAULT_BOND_MODE: u8 = 4;

/// Render the hardware's network block as a NoCloud version-2 document.
pub fn network_config(hardware: &Hardware) -> Value {
    let mut ethernets = Mapping::new();
    // bond number -> member interface names, in interface order.
    let mut bonds: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    // Address configuration for each bond, taken from its first member.
    let mut bond_config: BTreeMap<u32, Mapping> = BTreeMap::new();

    for (position, interface) in hardware.spec.interfaces.iter().enumerate() {
        let Some(dhcp_block) = interface.dhcp.as_ref() else {
            continue;
        };
        let iface_name = dhcp_block
            .iface_name
            .clone()
            .unwrap_or_else(|| format!("eth{position}"));

        if let Some(captures) = BOND_MEMBER.captures(&iface_name) {
            let bond: u32 = captures[1].parse().unwrap_or(0);
            bonds.entry(bond).or_default().push(iface_name.clone());
            bond_config
                .entry(bond)
                .or_insert_with(|| address_stanza(dhcp_block));

            // Members carry only their identity.
            let mut member = Mapping::new();
            member.insert(
                Value::from("match"),
                mapping([("macaddress", Value::from(interface.mac.clone()))]),
            );
            ethernets.insert(Value::from(iface_name), Value::from(member));
            continue;
        }

        let mut stanza = address_stanza(dhcp_block);
        stanza.insert(
            Value::from("match"),
            mapping([("macaddress", Value::from(interface.mac.clone()))]),
        );
        ethernets.insert(Value::from(iface_name), Value::from(stanza));
    }

    let mode = hardware
        .spec
        .instance
        .as_ref()
        .and_then(|instance| instance.bonding_mode)
        .filter(|mode| bond_mode_name(*mode).is_some())
        .unwrap_or(DEFAULT_BOND_MODE);

    let mut bonds_out = Mapping::new();
    for (bond, members) in bonds {
        let mut stanza = bond_config.remove(&bond).unwrap_or_default();
        stanza.insert(
            Value::from("interfaces"),
            Value::from(members.into_iter().map(Value::from).collect::<Vec<_>>()),
        );
        stanza.insert(
            Value::from("parameters"),
            mapping([(
                "mode",
                Value::from(bond_mode_name(mode).unwrap_or("802.3ad")),
            )]),
        );
        bonds_out.insert(Value::from(format!("bond{bond}")), Value::from(stanza));
    }

    let mut network = Mapping::new();
    network.insert(Value::from("version"), Value::from(2));
    if !ethernets.is_empty() {
        network.insert(Value::from("ethernets"), Value::from(ethernets));
    }
    if !bonds_out.is_empty() {
        network.insert(Value::from("bonds"), Value::from(bonds_out));
    }

    let mut root = Mapping::new();
    root.insert(Value::from("network"), Value::from(network));
    Value::from(root)
}

/// Addressing block shared by ethernets and bonds.
fn address_stanza(dhcp_block: &Dhcp) -> Mapping {
    let mut stanza = Mapping::new();

    match (&dhcp_block.address, &dhcp_block.netmask) {
        (Some(address), Some(netmask)) => {
            let prefix = netmask_to_prefix_length(netmask).unwrap_or(32);
            stanza.insert(
                Value::from("addresses"),
                Value::from(vec![Value::from(format!("{address}/{prefix}"))]),
            );
        }
        (Some(address), None) => {
            stanza.insert(
                Value::from("addresses"),
                Value::from(vec![Value::from(format!("{address}/32"))]),
            );
        }
        _ => {
            stanza.insert(Value::from("dhcp4"), Value::from(true));
        }
    }

    if let Some(gateway) = &dhcp_block.gateway {
        stanza.insert(Value::from("gateway4"), Value::from(gateway.clone()));
    }
    if !dhcp_block.name_servers.is_empty() {
        stanza.insert(
            Value::from("nameservers"),
            mapping([(
                "addresses",
                Value::from(
                    dhcp_block
                        .name_servers
                        .iter()
                        .cloned()
                        .map(Value::from)
                        .collect::<Vec<_>>(),
                ),
            )]),
        );
    }
    stanza
}

fn mapping<const N: usize>(entries: [(&str, Value); N]) -> Value {
    let mut map = Mapping::new();
    for (key, value) in entries {
        map.insert(Value::from(key), value);
    }
    Value::from(map)
}

#[cfg(test)]
#[path = "netconfig_tests.rs"]
mod tests;
