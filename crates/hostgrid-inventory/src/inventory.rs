//! The inventory snapshot — an arena of nodes with identity lookup.
//!
//! Parent and child never own each other: both are entries in the same
//! arena, linked by hostname. The parent/child index is built once at
//! construction and the snapshot is immutable afterwards, so every query
//! over the same snapshot yields the same answer.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{InventoryError, InventoryResult};
use crate::types::{ApplicationId, ClusterId, HostName, Node, NodeRole, NodeState};

/// A read-only snapshot of every node known to the fleet manager.
#[derive(Debug, Clone)]
pub struct Inventory {
    nodes: Vec<Node>,
    by_hostname: HashMap<HostName, usize>,
    children: HashMap<HostName, Vec<usize>>,
}

impl Inventory {
    /// Build a snapshot from the full node list.
    ///
    /// Duplicate hostnames and self-parenting are rejected outright. A
    /// parent hostname that resolves to no node in the snapshot is
    /// tolerated: the child behaves as standalone and a warning is logged.
    pub fn build(nodes: Vec<Node>) -> InventoryResult<Self> {
        let mut by_hostname = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if node.parent_hostname.as_deref() == Some(node.hostname.as_str()) {
                return Err(InventoryError::SelfParent(node.hostname.clone()));
            }
            if by_hostname.insert(node.hostname.clone(), index).is_some() {
                return Err(InventoryError::DuplicateHostname(node.hostname.clone()));
            }
        }

        let mut children: HashMap<HostName, Vec<usize>> = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            if let Some(parent) = &node.parent_hostname {
                if by_hostname.contains_key(parent) {
                    children.entry(parent.clone()).or_default().push(index);
                } else {
                    warn!(
                        node = %node.hostname,
                        parent = %parent,
                        "parent hostname does not resolve, treating node as standalone"
                    );
                }
            }
        }

        Ok(Self {
            nodes,
            by_hostname,
            children,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, hostname: &str) -> Option<&Node> {
        self.by_hostname.get(hostname).map(|&i| &self.nodes[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// The resolved parent of a node, if it has one in this snapshot.
    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        node.parent_hostname.as_deref().and_then(|p| self.get(p))
    }

    /// All children of the given host.
    pub fn children_of(&self, hostname: &str) -> impl Iterator<Item = &Node> {
        self.children
            .get(hostname)
            .into_iter()
            .flatten()
            .map(|&i| &self.nodes[i])
    }

    pub fn in_state(&self, state: NodeState) -> impl Iterator<Item = &Node> {
        self.iter().filter(move |n| n.state == state)
    }

    pub fn with_role(&self, role: NodeRole) -> impl Iterator<Item = &Node> {
        self.iter().filter(move |n| n.role == role)
    }

    pub fn owned_by<'a>(
        &'a self,
        application: &'a ApplicationId,
    ) -> impl Iterator<Item = &'a Node> {
        self.iter()
            .filter(move |n| n.owner() == Some(application))
    }

    /// Nodes allocated to the given application cluster, in any state.
    pub fn in_cluster<'a>(
        &'a self,
        application: &'a ApplicationId,
        cluster: &'a ClusterId,
    ) -> impl Iterator<Item = &'a Node> {
        self.iter()
            .filter(move |n| n.allocated_to(application, cluster))
    }
}
