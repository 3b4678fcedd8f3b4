// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DHCP reservation translation.
//!
//! The DHCP server looks hardware up by MAC and turns the reservation
//! into an on-wire reply. The translation rules live here so every server
//! agrees on them.

use std::net::Ipv4Addr;
use tink_core::{Hardware, StaticRoute};
use tracing::warn;

/// Lease seconds clamp to what option 51 can carry.
pub fn clamp_lease(seconds: u64) -> u32 {
    seconds.min(u64::from(u32::MAX)) as u32
}

/// The reservation view a DHCP reply is assembled from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DhcpReply {
    pub mac: String,
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
    pub hostname: Option<String>,
    pub lease_time: u32,
    pub name_servers: Vec<String>,
    pub time_servers: Vec<String>,
    pub vlan_id: Option<String>,
    /// Options 66/67, present only as a pair.
    pub tftp_server_name: Option<String>,
    pub boot_file_name: Option<String>,
    /// Option 121 payload (RFC 3442), already encoded.
    pub classless_routes: Vec<u8>,
}

/// Build the reply view for the interface carrying `mac`, when it has a
/// DHCP reservation.
pub fn reply_for(hardware: &Hardware, mac: &str) -> Option<DhcpReply> {
    let interface = hardware.interface_by_mac(mac)?;
    let dhcp = interface.dhcp.as_ref()?;

    // Option 66/67 are meaningful only together.
    let (tftp_server_name, boot_file_name) =
        match (dhcp.tftp_server_name.clone(), dhcp.boot_file_name.clone()) {
            (Some(tftp), Some(boot_file)) => (Some(tftp), Some(boot_file)),
            _ => (None, None),
        };

    Some(DhcpReply {
        mac: interface.mac.clone(),
        address: dhcp.address.clone(),
        netmask: dhcp.netmask.clone(),
        gateway: dhcp.gateway.clone(),
        hostname: dhcp.hostname.clone(),
        lease_time: clamp_lease(dhcp.lease_time_seconds),
        name_servers: dhcp.name_servers.clone(),
        time_servers: dhcp.time_servers.clone(),
        vlan_id: dhcp.vlan_id.clone(),
        tftp_server_name,
        boot_file_name,
        classless_routes: encode_classless_routes(&dhcp.static_routes),
    })
}

/// RFC 3442 classless static route encoding: for each route, the prefix
/// length, the significant octets of the destination, then the gateway.
/// Unparseable routes are skipped.
pub fn encode_classless_routes(routes: &[StaticRoute]) -> Vec<u8> {
    let mut out = Vec::new();
    for route in routes {
        match encode_route(route) {
            Some(bytes) => out.extend(bytes),
            None => warn!(
                destination = %route.destination,
                gateway = %route.gateway,
                "skipping unencodable static route"
            ),
        }
    }
    out
}

fn encode_route(route: &StaticRoute) -> Option<Vec<u8>> {
    let (destination, prefix) = route.destination.split_once('/')?;
    let destination: Ipv4Addr = destination.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    let gateway: Ipv4Addr = route.gateway.parse().ok()?;

    let significant = usize::from(prefix.div_ceil(8));
    let mut bytes = Vec::with_capacity(1 + significant + 4);
    bytes.push(prefix);
    bytes.extend_from_slice(&destination.octets()[..significant]);
    bytes.extend_from_slice(&gateway.octets());
    Some(bytes)
}

#[cfg(test)]
#[path = "dhcp_tests.rs"]
mod tests;
