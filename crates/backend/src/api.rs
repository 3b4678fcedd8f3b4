// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent-facing and server-facing query surface.

use crate::error::BackendError;
use crate::indexes::{HARDWARE_IP_INDEX, HARDWARE_MAC_INDEX, WORKFLOW_AGENT_INDEX};
use tink_core::{Hardware, NamespacedName, Resource, Workflow, WorkflowRuleSet};
use tink_store::{ListQuery, Store};
use tracing::debug;

/// Read interfaces over the store, plus the one write the agent transport
/// is allowed: workflow status updates.
#[derive(Clone)]
pub struct Backend<S> {
    store: S,
}

impl<S: Store> Backend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Hardware whose interface carries the MAC. At most one machine may
    /// own a MAC; several is a data error distinct from none.
    pub async fn hardware_by_mac(&self, mac: &str) -> Result<Option<Hardware>, BackendError> {
        let hits = self
            .store
            .list::<Hardware>(ListQuery::all().with_index(HARDWARE_MAC_INDEX, mac))
            .await?;
        Self::at_most_one(hits, "mac", mac)
    }

    /// Hardware whose DHCP reservation carries the IPv4 address.
    pub async fn hardware_by_ip(&self, ip: &str) -> Result<Option<Hardware>, BackendError> {
        let hits = self
            .store
            .list::<Hardware>(ListQuery::all().with_index(HARDWARE_IP_INDEX, ip))
            .await?;
        Self::at_most_one(hits, "ip", ip)
    }

    fn at_most_one(
        hits: Vec<Hardware>,
        field: &'static str,
        value: &str,
    ) -> Result<Option<Hardware>, BackendError> {
        match hits.len() {
            0 => Ok(None),
            1 => Ok(hits.into_iter().next()),
            count => Err(BackendError::MultipleMatches {
                kind: Hardware::KIND,
                field,
                value: value.to_string(),
                count,
            }),
        }
    }

    /// Every workflow addressed to the agent. The transport picks the
    /// active one.
    pub async fn workflows_for_agent(
        &self,
        agent_id: &str,
    ) -> Result<Vec<Workflow>, BackendError> {
        Ok(self
            .store
            .list::<Workflow>(ListQuery::all().with_index(WORKFLOW_AGENT_INDEX, agent_id))
            .await?)
    }

    /// Fetch one workflow. `id` is `namespace/name`, or a bare name
    /// resolved against `default_namespace`.
    pub async fn read_workflow(
        &self,
        id: &str,
        default_namespace: &str,
    ) -> Result<Workflow, BackendError> {
        let key = NamespacedName::parse(id, default_namespace)?;
        Ok(self.store.get(&key).await?)
    }

    /// Record agent-reported progress.
    ///
    /// Status only: a spec diff is rejected, and a workflow that already
    /// settled never moves again.
    pub async fn update_workflow_status(
        &self,
        incoming: &Workflow,
    ) -> Result<Workflow, BackendError> {
        let key = incoming.key();
        let stored: Workflow = self.store.get(&key).await?;

        if stored.status.state.is_terminal() {
            return Err(BackendError::TerminalWorkflow { key });
        }
        if incoming.spec != stored.spec {
            return Err(BackendError::SpecMutation { key });
        }

        debug!(workflow = %key, state = %incoming.status.state, "agent status update");
        Ok(self.store.patch_status(incoming).await?)
    }

    /// All auto-enrollment rule sets.
    pub async fn read_rule_sets(&self) -> Result<Vec<WorkflowRuleSet>, BackendError> {
        Ok(self.store.list(ListQuery::all()).await?)
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
