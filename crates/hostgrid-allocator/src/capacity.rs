//! Capacity accounting for hosts.
//!
//! All calculations run over one immutable inventory snapshot, so repeated
//! queries against the same snapshot always agree. Nothing here mutates
//! state or performs I/O.

use std::cmp::Ordering;
use std::collections::{HashSet, hash_set};

use hostgrid_inventory::{HostName, Inventory, Node, NodeRole, NodeState, Resources};

use crate::spec::HostResourcesCalculator;

/// Computes free capacity, free IP addresses, and spare-host selection for
/// every host in a snapshot.
pub struct HostCapacity<'a> {
    inventory: &'a Inventory,
    calculator: &'a dyn HostResourcesCalculator,
}

impl<'a> HostCapacity<'a> {
    pub fn new(inventory: &'a Inventory, calculator: &'a dyn HostResourcesCalculator) -> Self {
        Self {
            inventory,
            calculator,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        self.inventory
    }

    /// The remaining capacity of a host: advertised resources minus the sum
    /// of every child's footprint. Roles that cannot host tenant nodes have
    /// no capacity at all.
    ///
    /// With `exclude_inactive`, children that are inactive or retired do not
    /// count as used — their capacity is reclaimable.
    pub fn free_capacity_of(&self, host: &Node, exclude_inactive: bool) -> Resources {
        if !host.role.can_host(NodeRole::Tenant) {
            return Resources::none();
        }
        let mut free = self.calculator.advertised_resources(host);
        for child in self.inventory.children_of(&host.hostname) {
            if exclude_inactive && is_inactive_or_retired(child) {
                continue;
            }
            free = free.subtract(&child.resources);
        }
        free
    }

    /// Number of addresses in the host's pool not held by any node in the
    /// inventory.
    pub fn free_ips(&self, host: &Node) -> usize {
        let used: HashSet<_> = self
            .inventory
            .iter()
            .flat_map(|n| n.ip_addresses.iter())
            .collect();
        host.ip_pool.iter().filter(|ip| !used.contains(ip)).count()
    }

    /// Whether the host could take on a node with the requested resources:
    /// free capacity (counting inactive and retired children as
    /// reclaimable) must satisfy every dimension, and at least one pool
    /// address must be free.
    pub fn has_capacity(&self, host: &Node, requested: &Resources) -> bool {
        self.free_capacity_of(host, true).satisfies(requested) && self.free_ips(host) > 0
    }

    /// The hosts reserved for failure recovery: among active bare hosts
    /// with at least one free IP, the `count` hosts with the most free
    /// capacity, ignoring inactive and retired children (they could have
    /// been moved to make room in the first place). Ties go to the host
    /// with the most free IPs, then to hostname order, so the selection is
    /// deterministic and monotone in `count`.
    pub fn find_spare_hosts(&self, count: usize) -> SpareHosts {
        let mut hosts: Vec<&Node> = self
            .inventory
            .with_role(NodeRole::Host)
            .filter(|h| h.state == NodeState::Active)
            .filter(|h| self.free_ips(h) > 0)
            .collect();
        hosts.sort_by(|a, b| self.compare_without_inactive(a, b));
        SpareHosts(
            hosts
                .into_iter()
                .take(count)
                .map(|h| h.hostname.clone())
                .collect(),
        )
    }

    /// In zones that create hosts on demand, a host counts as spare simply
    /// if nothing runs on it yet — replacements are always obtainable, so
    /// no ranking is needed.
    pub fn find_spare_hosts_in_dynamically_provisioned_zones(&self) -> SpareHosts {
        SpareHosts(
            self.inventory
                .with_role(NodeRole::Host)
                .filter(|h| h.state == NodeState::Active)
                .filter(|h| self.inventory.children_of(&h.hostname).next().is_none())
                .map(|h| h.hostname.clone())
                .collect(),
        )
    }

    fn compare_without_inactive(&self, a: &Node, b: &Node) -> Ordering {
        self.free_capacity_of(b, true)
            .compare_size(&self.free_capacity_of(a, true))
            .then_with(|| self.free_ips(b).cmp(&self.free_ips(a)))
            .then_with(|| a.hostname.cmp(&b.hostname))
    }
}

fn is_inactive_or_retired(node: &Node) -> bool {
    node.state == NodeState::Inactive || node.is_retired()
}

/// The set of hosts currently reserved as spare capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpareHosts(HashSet<HostName>);

impl SpareHosts {
    pub fn contains(&self, hostname: &str) -> bool {
        self.0.contains(hostname)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_subset(&self, other: &SpareHosts) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn iter(&self) -> hash_set::Iter<'_, HostName> {
        self.0.iter()
    }
}
