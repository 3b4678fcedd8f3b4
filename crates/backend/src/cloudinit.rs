// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NoCloud datasource documents.
//!
//! The metadata endpoint serves four documents per machine: meta-data,
//! user-data, vendor-data, and network-config. Everything derives from
//! the hardware's instance block; the network config is generated unless
//! the operator supplied one verbatim.

use crate::netconfig;
use serde_yaml::{Mapping, Value};
use tink_core::Hardware;

/// The `meta-data` document.
pub fn meta_data(hardware: &Hardware) -> Value {
    let instance = hardware.spec.instance.as_ref();

    let mut doc = Mapping::new();
    let instance_id = instance
        .and_then(|i| i.id.clone())
        .unwrap_or_else(|| hardware.metadata.name.clone());
    doc.insert(Value::from("instance-id"), Value::from(instance_id));

    if let Some(hostname) = instance.and_then(|i| i.hostname.clone()) {
        doc.insert(Value::from("local-hostname"), Value::from(hostname));
    }
    if let Some(instance) = instance {
        if !instance.ssh_keys.is_empty() {
            doc.insert(
                Value::from("public-keys"),
                Value::from(
                    instance
                        .ssh_keys
                        .iter()
                        .cloned()
                        .map(Value::from)
                        .collect::<Vec<_>>(),
                ),
            );
        }
        if !instance.tags.is_empty() {
            doc.insert(
                Value::from("tags"),
                Value::from(
                    instance.tags.iter().cloned().map(Value::from).collect::<Vec<_>>(),
                ),
            );
        }
    }

    Value::from(doc)
}

/// The `user-data` document, exactly as authored.
pub fn user_data(hardware: &Hardware) -> Option<&str> {
    hardware
        .spec
        .instance
        .as_ref()
        .and_then(|i| i.userdata.as_deref())
}

/// The `vendor-data` document, exactly as authored.
pub fn vendor_data(hardware: &Hardware) -> Option<&str> {
    hardware
        .spec
        .instance
        .as_ref()
        .and_then(|i| i.vendordata.as_deref())
}

/// The `network-config` document: the operator's verbatim config when
/// present, otherwise generated from the interface reservations.
pub fn network_config(hardware: &Hardware) -> Result<Value, serde_yaml::Error> {
    if let Some(authored) = hardware
        .spec
        .instance
        .as_ref()
        .and_then(|i| i.network_config.as_deref())
    {
        return serde_yaml::from_str(authored);
    }
    Ok(netconfig::network_config(hardware))
}

#[cfg(test)]
#[path = "cloudinit_tests.rs"]
mod tests;
