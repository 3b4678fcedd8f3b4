// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template helper functions and filters.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use tera::{Tera, Value};

/// Register every helper on a template engine instance.
pub fn register(tera: &mut Tera) {
    tera.register_function("format_partition", format_partition_fn);
    tera.register_filter("netmask_to_prefix_length", netmask_filter);
    tera.register_filter("to_yaml", to_yaml_filter);
    tera.register_filter("from_yaml", from_yaml_filter);
}

/// Append a partition number to a block device path.
///
/// NVMe namespaces need a `p` separator (`/dev/nvme0n1p2`); the classic
/// Linux block devices take the bare number (`/dev/sda2`). Anything else
/// passes through untouched.
pub fn format_partition(device: &str, number: u64) -> String {
    if device.starts_with("/dev/nvme") {
        return format!("{device}p{number}");
    }
    for prefix in ["/dev/sd", "/dev/vd", "/dev/xvd", "/dev/hd"] {
        if device.starts_with(prefix) {
            return format!("{device}{number}");
        }
    }
    device.to_string()
}

fn format_partition_fn(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let device = args
        .get("device")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("format_partition requires a string `device`"))?;
    let number = args
        .get("number")
        .and_then(Value::as_u64)
        .ok_or_else(|| tera::Error::msg("format_partition requires an integer `number`"))?;
    Ok(Value::from(format_partition(device, number)))
}

/// Convert a dotted-quad IPv4 netmask to its prefix length.
///
/// Only contiguous masks are valid: the ones, read from the top bit, must
/// not restart after the first zero.
pub fn netmask_to_prefix_length(netmask: &str) -> Option<u32> {
    let addr: Ipv4Addr = netmask.parse().ok()?;
    let bits = u32::from(addr);
    let prefix = bits.leading_ones();
    (bits.trailing_zeros() + prefix == 32 || bits == 0).then_some(prefix)
}

/// Inverse of [`netmask_to_prefix_length`].
pub fn prefix_length_to_netmask(prefix: u32) -> Option<Ipv4Addr> {
    if prefix > 32 {
        return None;
    }
    let bits = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    };
    Some(Ipv4Addr::from(bits))
}

fn netmask_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let netmask = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("netmask_to_prefix_length takes a string"))?;
    let prefix = netmask_to_prefix_length(netmask)
        .ok_or_else(|| tera::Error::msg(format!("{netmask:?} is not a contiguous IPv4 netmask")))?;
    Ok(Value::from(prefix))
}

fn to_yaml_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let yaml = serde_yaml::to_string(value)
        .map_err(|e| tera::Error::msg(format!("to_yaml: {e}")))?;
    Ok(Value::from(yaml))
}

fn from_yaml_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("from_yaml takes a string"))?;
    let parsed: Value = serde_yaml::from_str(text)
        .map_err(|e| tera::Error::msg(format!("from_yaml: {e}")))?;
    Ok(parsed)
}

#[cfg(test)]
#[path = "helpers_tests.rs"]
mod tests;
