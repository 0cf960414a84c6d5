// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node address lookup for snapshots

use dlm_core::{NodeId, NodeResolver};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Addresses known up front, typically from the daemon config's `[nodes]`
/// table
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticNodeResolver {
    addresses: BTreeMap<NodeId, String>,
}

impl StaticNodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: impl Into<String>, address: impl Into<String>) -> Self {
        self.addresses.insert(NodeId::new(node), address.into());
        self
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl NodeResolver for StaticNodeResolver {
    fn address(&self, node: &NodeId) -> Option<String> {
        self.addresses.get(node).cloned()
    }
}

/// Resolver that knows no addresses
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNodeResolver;

impl NodeResolver for NoOpNodeResolver {
    fn address(&self, _node: &NodeId) -> Option<String> {
        None
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
