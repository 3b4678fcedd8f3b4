// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-maintained index registration.

use tink_core::{
    BmcJob, BmcTask, Hardware, IpFamily, Secret, Template, Workflow, WorkflowRuleSet,
};
use tink_store::MemoryStore;

/// Hardware by interface MAC.
pub const HARDWARE_MAC_INDEX: &str = "hardware.mac";
/// Hardware by DHCP IPv4 address.
pub const HARDWARE_IP_INDEX: &str = "hardware.ip";
/// Workflow by `status.agentID`.
pub const WORKFLOW_AGENT_INDEX: &str = "workflow.agent-id";

/// Install the three backend indexes and register every kind the system
/// stores, so dynamic reads can resolve them.
pub fn register_indexes(store: &MemoryStore) {
    store.register_index::<Hardware, _>(HARDWARE_MAC_INDEX, |hardware| {
        hardware
            .spec
            .interfaces
            .iter()
            .map(|interface| interface.mac.clone())
            .collect()
    });

    store.register_index::<Hardware, _>(HARDWARE_IP_INDEX, |hardware| {
        hardware
            .spec
            .interfaces
            .iter()
            .filter_map(|interface| interface.dhcp.as_ref())
            .filter(|dhcp| dhcp.family == IpFamily::Ipv4)
            .filter_map(|dhcp| dhcp.address.clone())
            .collect()
    });

    store.register_index::<Workflow, _>(WORKFLOW_AGENT_INDEX, |workflow| {
        if workflow.status.agent_id.is_empty() {
            Vec::new()
        } else {
            vec![workflow.status.agent_id.clone()]
        }
    });

    store.register_kind::<Template>();
    store.register_kind::<Secret>();
    store.register_kind::<BmcJob>();
    store.register_kind::<BmcTask>();
    store.register_kind::<WorkflowRuleSet>();
}

#[cfg(test)]
#[path = "indexes_tests.rs"]
mod tests;
