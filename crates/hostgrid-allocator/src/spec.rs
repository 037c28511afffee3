//! Allocation request types and zone policy.

use serde::{Deserialize, Serialize};

use hostgrid_inventory::{ClusterId, ClusterType, Node, NodeRole, NodeState, Resources};

/// The cluster an allocation request targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub id: ClusterId,
    pub cluster_type: ClusterType,
    /// The group index this request is for, when the cluster is grouped.
    pub group: Option<u32>,
}

/// What kind of nodes an allocation request asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    /// An exact number of tenant nodes with the given per-node resources.
    Count {
        count: u32,
        resources: Resources,
        /// The application requires hosts of its own.
        exclusive: bool,
    },
    /// Every node of the given infrastructure role.
    Type { role: NodeRole },
}

impl NodeSpec {
    /// The node role this request allocates.
    pub fn role(&self) -> NodeRole {
        match self {
            NodeSpec::Count { .. } => NodeRole::Tenant,
            NodeSpec::Type { role } => *role,
        }
    }

    pub fn resources(&self) -> Option<&Resources> {
        match self {
            NodeSpec::Count { resources, .. } => Some(resources),
            NodeSpec::Type { .. } => None,
        }
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, NodeSpec::Count { exclusive: true, .. })
    }

    /// Whether the given number of healthy nodes fulfils this request.
    pub fn fulfilled_by(&self, count: usize) -> bool {
        match self {
            NodeSpec::Count { count: wanted, .. } => count >= *wanted as usize,
            // Type requests take whatever exists.
            NodeSpec::Type { .. } => true,
        }
    }

    /// Whether a node with `current` resources can be resized in place on a
    /// host with `host_free` remaining capacity.
    ///
    /// Never allowed while the group topology is changing or the cluster is
    /// shrinking, and growing the cluster while shrinking per-node resources
    /// is not allowed either. Otherwise the host must fit the new footprint
    /// once the node's current one is handed back.
    pub fn can_resize(
        &self,
        current: &Resources,
        host_free: &Resources,
        topology_change: bool,
        current_cluster_size: usize,
    ) -> bool {
        let NodeSpec::Count {
            count, resources, ..
        } = self
        else {
            return false;
        };
        if topology_change || current_cluster_size > *count as usize {
            return false;
        }
        if (*count as usize) > current_cluster_size && !resources.satisfies(current) {
            return false;
        }
        host_free.add(current).satisfies(resources)
    }
}

/// Per-zone allocation policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// The zone can create hosts on demand, so reserve capacity is always
    /// obtainable.
    pub dynamic_provisioning: bool,
    /// Number of hosts to hold back as spares for failure recovery.
    pub spare_count: usize,
}

/// Resolves what a host actually offers to children, which may differ from
/// its recorded hardware resources (overhead carve-outs, overcommit).
pub trait HostResourcesCalculator {
    fn advertised_resources(&self, host: &Node) -> Resources;
}

/// Advertises exactly the host's recorded resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawResourcesCalculator;

impl HostResourcesCalculator for RawResourcesCalculator {
    fn advertised_resources(&self, host: &Node) -> Resources {
        host.resources
    }
}

/// Whether a host should receive new tenant nodes: it must be active,
/// tenant-capable, and not marked for retirement.
pub fn can_receive_tenant_nodes(host: &Node) -> bool {
    host.role.can_host(NodeRole::Tenant)
        && host.state == NodeState::Active
        && !host.want_to_retire
}
