//! Domain types for the HostGrid node inventory.
//!
//! A [`Node`] is any machine or workload unit known to the fleet manager:
//! bare hosts, the tenant nodes running on them, and infrastructure roles.
//! Parent/child linkage is by hostname, never by ownership — both parent
//! and child are entries in the same inventory.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::resources::Resources;

/// Identity of a node or host.
pub type HostName = String;

/// Identity of a cluster within an application.
pub type ClusterId = String;

// ── Application ───────────────────────────────────────────────────

/// Identity of a deployed application instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId {
    pub tenant: String,
    pub application: String,
    pub instance: String,
}

impl ApplicationId {
    pub fn new(tenant: &str, application: &str, instance: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            application: application.to_string(),
            instance: instance.to_string(),
        }
    }

    /// Tester instances run ephemeral verification workloads and are never
    /// considered for relocation.
    pub fn is_tester(&self) -> bool {
        self.instance.ends_with("-t")
    }
}

// ── Roles and states ──────────────────────────────────────────────

/// What kind of machine or workload a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// A bare host capable of running tenant nodes.
    Host,
    /// A tenant workload unit.
    Tenant,
    /// An edge proxy.
    Proxy,
    /// A bare host dedicated to proxies.
    ProxyHost,
}

impl NodeRole {
    /// Whether a node of this role can host children of the given role.
    pub fn can_host(self, child: NodeRole) -> bool {
        matches!(
            (self, child),
            (NodeRole::Host, NodeRole::Tenant) | (NodeRole::ProxyHost, NodeRole::Proxy)
        )
    }
}

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Provisioned,
    Ready,
    Reserved,
    Active,
    Inactive,
    Failed,
    Parked,
    Deprovisioned,
}

// ── Allocation ────────────────────────────────────────────────────

/// The kind of cluster a node serves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    Stateless,
    Stateful,
    Admin,
}

/// A node's position within its cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub cluster: ClusterId,
    pub cluster_type: ClusterType,
    /// Group index within the cluster, when the cluster is grouped.
    pub group: Option<u32>,
    /// Node index within the cluster.
    pub index: u32,
    /// The node is being phased out but still serves traffic.
    pub retired: bool,
}

/// Binding of a node to an application cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub owner: ApplicationId,
    pub membership: Membership,
}

// ── Node ──────────────────────────────────────────────────────────

/// A machine or workload unit in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub hostname: HostName,
    pub role: NodeRole,
    pub state: NodeState,
    /// For hosts: recorded hardware resources (what a calculator advertises
    /// from). For children: the resource footprint requested for them.
    pub resources: Resources,
    /// Weak link to the owning host, if this node is a child.
    pub parent_hostname: Option<HostName>,
    /// Addresses assigned to this node.
    pub ip_addresses: Vec<IpAddr>,
    /// Addresses this node can hand out to children (hosts only).
    pub ip_pool: Vec<IpAddr>,
    /// Identity of the network switch this node is connected to.
    pub switch_hostname: Option<String>,
    /// Host is reserved for one tenant's use.
    pub reserved_to: Option<String>,
    /// Host is exclusively owned by one application.
    pub exclusive_to: Option<ApplicationId>,
    /// An operator has asked for this node to be retired.
    pub want_to_retire: bool,
    pub allocation: Option<Allocation>,
}

impl Node {
    /// Whether this node is retired within its cluster (still serving, but
    /// being phased out).
    pub fn is_retired(&self) -> bool {
        self.allocation
            .as_ref()
            .is_some_and(|a| a.membership.retired)
    }

    pub fn owner(&self) -> Option<&ApplicationId> {
        self.allocation.as_ref().map(|a| &a.owner)
    }

    /// Whether this node is allocated to the given application and cluster.
    pub fn allocated_to(&self, application: &ApplicationId, cluster: &ClusterId) -> bool {
        self.allocation
            .as_ref()
            .is_some_and(|a| a.owner == *application && a.membership.cluster == *cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{DiskSpeed, StorageClass};

    fn sample_node() -> Node {
        Node {
            hostname: "node1.example.net".to_string(),
            role: NodeRole::Tenant,
            state: NodeState::Active,
            resources: Resources {
                vcpu_millis: 2000,
                memory_bytes: 8 << 30,
                disk_bytes: 100 << 30,
                bandwidth_mbps: 1000,
                disk_speed: DiskSpeed::Fast,
                storage: StorageClass::Local,
            },
            parent_hostname: Some("host1.example.net".to_string()),
            ip_addresses: vec!["10.0.0.11".parse().unwrap()],
            ip_pool: Vec::new(),
            switch_hostname: Some("switch1".to_string()),
            reserved_to: None,
            exclusive_to: None,
            want_to_retire: false,
            allocation: Some(Allocation {
                owner: ApplicationId::new("acme", "search", "default"),
                membership: Membership {
                    cluster: "content".to_string(),
                    cluster_type: ClusterType::Stateful,
                    group: Some(0),
                    index: 3,
                    retired: false,
                },
            }),
        }
    }

    #[test]
    fn tester_instances_are_detected() {
        assert!(ApplicationId::new("acme", "search", "default-t").is_tester());
        assert!(!ApplicationId::new("acme", "search", "default").is_tester());
    }

    #[test]
    fn role_capabilities() {
        assert!(NodeRole::Host.can_host(NodeRole::Tenant));
        assert!(NodeRole::ProxyHost.can_host(NodeRole::Proxy));
        assert!(!NodeRole::Host.can_host(NodeRole::Proxy));
        assert!(!NodeRole::Tenant.can_host(NodeRole::Tenant));
    }

    #[test]
    fn retired_flag_comes_from_membership() {
        let mut node = sample_node();
        assert!(!node.is_retired());

        node.allocation.as_mut().unwrap().membership.retired = true;
        assert!(node.is_retired());

        node.allocation = None;
        assert!(!node.is_retired());
    }

    #[test]
    fn allocated_to_matches_owner_and_cluster() {
        let node = sample_node();
        let owner = ApplicationId::new("acme", "search", "default");
        let other = ApplicationId::new("acme", "billing", "default");

        assert!(node.allocated_to(&owner, &"content".to_string()));
        assert!(!node.allocated_to(&owner, &"container".to_string()));
        assert!(!node.allocated_to(&other, &"content".to_string()));
    }

    #[test]
    fn node_serializes_roundtrip() {
        let node = sample_node();
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
