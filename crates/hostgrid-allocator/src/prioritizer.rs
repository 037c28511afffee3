//! Candidate enumeration and prioritization for one allocation request.
//!
//! Builds up the data structures needed to rank every node that could
//! serve a request: nodes the application already has, surplus nodes from
//! an in-flight downsize, ready unallocated nodes, and hypothetical new
//! children on hosts with room. The ranking itself lives in
//! [`NodeCandidate`].
//!
//! Insufficient capacity is never an error here — the returned list is
//! simply shorter than the caller hoped, and rejecting an
//! under-provisioned request is the caller's decision.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use hostgrid_inventory::{ApplicationId, Inventory, Node, NodeState};

use crate::capacity::{HostCapacity, SpareHosts};
use crate::candidate::NodeCandidate;
use crate::spec::{
    ClusterSpec, HostResourcesCalculator, NodeSpec, ZoneConfig, can_receive_tenant_nodes,
};

/// Enumerates and ranks all placement candidates for one allocation
/// request. Constructed fresh per request against an immutable snapshot;
/// the same snapshot and request always produce the same list.
pub struct NodePrioritizer<'a> {
    inventory: &'a Inventory,
    capacity: HostCapacity<'a>,
    application: ApplicationId,
    cluster: ClusterSpec,
    requested: NodeSpec,
    candidates: Vec<NodeCandidate>,
    spare_hosts: SpareHosts,
    topology_change: bool,
    current_cluster_size: usize,
    /// Spare hosts may be consumed to replace failed nodes, or freely in
    /// zones that provision hosts on demand.
    can_use_spare_hosts: bool,
    can_allocate_new: bool,
}

impl<'a> NodePrioritizer<'a> {
    pub fn new(
        inventory: &'a Inventory,
        application: ApplicationId,
        cluster: ClusterSpec,
        requested: NodeSpec,
        wanted_groups: u32,
        zone: &ZoneConfig,
        calculator: &'a dyn HostResourcesCalculator,
    ) -> Self {
        let capacity = HostCapacity::new(inventory, calculator);
        let spare_hosts = if zone.dynamic_provisioning {
            capacity.find_spare_hosts_in_dynamically_provisioned_zones()
        } else {
            capacity.find_spare_hosts(zone.spare_count)
        };

        let in_cluster: Vec<&Node> = inventory.in_cluster(&application, &cluster.id).collect();
        let failed = in_cluster
            .iter()
            .filter(|n| n.state == NodeState::Failed)
            .count();

        let active_groups: HashSet<u32> = in_cluster
            .iter()
            .filter(|n| n.state == NodeState::Active && !n.is_retired())
            .filter_map(|n| n.allocation.as_ref().and_then(|a| a.membership.group))
            .collect();
        let topology_change = active_groups.len() != wanted_groups as usize;

        let current_cluster_size = in_cluster
            .iter()
            .filter(|n| n.state == NodeState::Active && !n.is_retired())
            .filter(|n| {
                n.allocation
                    .as_ref()
                    .is_some_and(|a| a.membership.group == cluster.group)
            })
            .count();

        let is_replacement =
            failed > 0 && !requested.fulfilled_by(in_cluster.len() - failed);
        // In dynamically provisioned zones spare hosts may always be taken,
        // since new ones can be provisioned on demand; the candidate order
        // keeps them unused until there is no room elsewhere.
        let can_use_spare_hosts = is_replacement || zone.dynamic_provisioning;
        // Exclusive deployments in dynamically provisioned zones get freshly
        // provisioned hosts instead of sharing existing ones.
        let can_allocate_new = matches!(requested, NodeSpec::Count { .. })
            && (!zone.dynamic_provisioning || !requested.is_exclusive());

        Self {
            inventory,
            capacity,
            application,
            cluster,
            requested,
            candidates: Vec::new(),
            spare_hosts,
            topology_change,
            current_cluster_size,
            can_use_spare_hosts,
            can_allocate_new,
        }
    }

    /// Whether the requested group count differs from the groups currently
    /// active in the cluster.
    pub fn topology_change(&self) -> bool {
        self.topology_change
    }

    /// Collects all candidates for this request and returns them in
    /// most-to-least preferred order. The caller takes a prefix of the
    /// result to satisfy the request.
    pub fn collect(mut self, surplus_nodes: &[Node]) -> Vec<NodeCandidate> {
        self.add_application_nodes();
        self.add_surplus_nodes(surplus_nodes);
        self.add_ready_nodes();
        self.add_new_nodes();
        self.prioritize()
    }

    /// Existing nodes already allocated to this application and cluster.
    fn add_application_nodes(&mut self) {
        const LEGAL_STATES: [NodeState; 3] =
            [NodeState::Active, NodeState::Inactive, NodeState::Reserved];

        let inventory = self.inventory;
        for node in inventory.iter() {
            if node.role != self.requested.role() {
                continue;
            }
            if !LEGAL_STATES.contains(&node.state) {
                continue;
            }
            if !node.allocated_to(&self.application, &self.cluster.id) {
                continue;
            }
            // A non-active node on a host we no longer want to fill (e.g.
            // one being retired) is not offered back to the application.
            if node.state != NodeState::Active && !self.can_still_allocate_to_parent_of(node) {
                continue;
            }
            let candidate = self.candidate_from(node);
            self.candidates.push(candidate);
        }
        debug!(
            candidates = self.candidates.len(),
            application = %self.application.application,
            cluster = %self.cluster.id,
            "gathered existing application nodes"
        );
    }

    /// Nodes freed by downsizing a cluster earlier in the same operation.
    fn add_surplus_nodes(&mut self, surplus_nodes: &[Node]) {
        for node in surplus_nodes {
            let candidate = self.candidate_from(node).as_surplus();
            if !candidate.violates_spares || self.can_use_spare_hosts {
                self.candidates.push(candidate);
            }
        }
    }

    /// Nodes already provisioned but not allocated to any application.
    fn add_ready_nodes(&mut self) {
        let inventory = self.inventory;
        for node in inventory.iter() {
            if node.role != self.requested.role() || node.state != NodeState::Ready {
                continue;
            }
            let candidate = self.candidate_from(node).as_ready();
            if !candidate.violates_spares || self.can_use_spare_hosts {
                self.candidates.push(candidate);
            }
        }
    }

    /// A hypothetical new node on every host with room for the requested
    /// resources.
    fn add_new_nodes(&mut self) {
        if !self.can_allocate_new {
            return;
        }
        let Some(requested) = self.requested.resources().copied() else {
            return;
        };

        let before = self.candidates.len();
        let inventory = self.inventory;
        for host in inventory.iter() {
            if !can_receive_tenant_nodes(host) {
                continue;
            }
            if let Some(tenant) = &host.reserved_to
                && *tenant != self.application.tenant
            {
                continue;
            }
            // Never allocate new nodes onto exclusively owned hosts.
            if host.exclusive_to.is_some() {
                continue;
            }
            let is_spare = self.spare_hosts.contains(&host.hostname);
            if is_spare && !self.can_use_spare_hosts {
                continue;
            }
            if !self.capacity.has_capacity(host, &requested) {
                continue;
            }
            // One node per application cluster per host.
            if inventory
                .children_of(&host.hostname)
                .any(|c| c.allocated_to(&self.application, &self.cluster.id))
            {
                continue;
            }
            let free_after = self
                .capacity
                .free_capacity_of(host, false)
                .subtract(&requested);
            self.candidates
                .push(NodeCandidate::new_child(requested, host, free_after, is_spare));
        }
        debug!(
            added = self.candidates.len() - before,
            "synthesized new-child candidates"
        );
    }

    fn candidate_from(&self, node: &Node) -> NodeCandidate {
        match self.inventory.parent_of(node) {
            Some(parent) => {
                let free = self.capacity.free_capacity_of(parent, false);
                let resizable = parent.exclusive_to.is_none()
                    && self.requested.can_resize(
                        &node.resources,
                        &free,
                        self.topology_change,
                        self.current_cluster_size,
                    );
                NodeCandidate::existing_child(
                    node.clone(),
                    parent,
                    free,
                    self.spare_hosts.contains(&parent.hostname),
                    resizable,
                )
            }
            None => NodeCandidate::existing_standalone(node.clone()),
        }
    }

    fn can_still_allocate_to_parent_of(&self, node: &Node) -> bool {
        if node.parent_hostname.is_none() {
            return true;
        }
        match self.inventory.parent_of(node) {
            Some(parent) => can_receive_tenant_nodes(parent),
            None => false,
        }
    }

    /// Enforce switch exclusivity per switch, then sort everything by the
    /// candidate preference order.
    fn prioritize(mut self) -> Vec<NodeCandidate> {
        let mut by_switch: HashMap<Option<String>, Vec<NodeCandidate>> = HashMap::new();
        for candidate in self.candidates.drain(..) {
            by_switch
                .entry(candidate.switch_id.clone())
                .or_default()
                .push(candidate);
        }

        let mut ranked = Vec::new();
        for (switch, mut group) in by_switch {
            // Candidates without a switch identity are exclusive by default.
            if switch.is_none() || group.len() == 1 {
                ranked.extend(group);
                continue;
            }
            group.sort_by(|a, b| a.compare(b));
            let mut group = group.into_iter();
            ranked.extend(group.next());
            ranked.extend(group.map(|c| c.with_exclusive_switch(false)));
        }

        ranked.sort_by(|a, b| a.compare(b));
        debug!(total = ranked.len(), "prioritized candidates");
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CandidateKind;
    use crate::spec::RawResourcesCalculator;
    use hostgrid_inventory::{
        Allocation, ClusterType, DiskSpeed, Membership, NodeRole, Resources, StorageClass,
    };

    fn quantities(vcpu_millis: u32, memory_bytes: u64, disk_bytes: u64) -> Resources {
        Resources {
            vcpu_millis,
            memory_bytes,
            disk_bytes,
            bandwidth_mbps: 0,
            disk_speed: DiskSpeed::Any,
            storage: StorageClass::Any,
        }
    }

    fn make_host(hostname: &str, resources: Resources, pool: &[&str]) -> Node {
        Node {
            hostname: hostname.to_string(),
            role: NodeRole::Host,
            state: NodeState::Active,
            resources,
            parent_hostname: None,
            ip_addresses: Vec::new(),
            ip_pool: pool.iter().map(|ip| ip.parse().unwrap()).collect(),
            switch_hostname: None,
            reserved_to: None,
            exclusive_to: None,
            want_to_retire: false,
            allocation: None,
        }
    }

    fn make_tenant(hostname: &str, parent: Option<&str>, state: NodeState) -> Node {
        Node {
            hostname: hostname.to_string(),
            role: NodeRole::Tenant,
            state,
            resources: quantities(1000, 2 << 30, 10 << 30),
            parent_hostname: parent.map(str::to_string),
            ip_addresses: Vec::new(),
            ip_pool: Vec::new(),
            switch_hostname: None,
            reserved_to: None,
            exclusive_to: None,
            want_to_retire: false,
            allocation: None,
        }
    }

    fn allocated(mut node: Node, cluster: &str, group: u32) -> Node {
        node.allocation = Some(Allocation {
            owner: app(),
            membership: Membership {
                cluster: cluster.to_string(),
                cluster_type: ClusterType::Stateless,
                group: Some(group),
                index: 0,
                retired: false,
            },
        });
        node
    }

    fn app() -> ApplicationId {
        ApplicationId::new("acme", "shop", "default")
    }

    fn web_cluster() -> ClusterSpec {
        ClusterSpec {
            id: "web".to_string(),
            cluster_type: ClusterType::Stateless,
            group: Some(0),
        }
    }

    fn one_node(resources: Resources) -> NodeSpec {
        NodeSpec::Count {
            count: 1,
            resources,
            exclusive: false,
        }
    }

    fn prioritizer<'a>(
        inventory: &'a Inventory,
        requested: NodeSpec,
        wanted_groups: u32,
        zone: &ZoneConfig,
    ) -> NodePrioritizer<'a> {
        NodePrioritizer::new(
            inventory,
            app(),
            web_cluster(),
            requested,
            wanted_groups,
            zone,
            &RawResourcesCalculator,
        )
    }

    #[test]
    fn prefers_the_tightest_fitting_host_for_new_nodes() {
        // Host A: 4 CPU / 8 GB / 100 GB. Host B: 2 CPU / 4 GB / 50 GB.
        let inventory = Inventory::build(vec![
            make_host("hosta", quantities(4000, 8 << 30, 100 << 30), &["10.0.0.2"]),
            make_host("hostb", quantities(2000, 4 << 30, 50 << 30), &["10.0.1.2"]),
        ])
        .unwrap();

        let requested = quantities(1000, 2 << 30, 10 << 30);
        let ranked = prioritizer(&inventory, one_node(requested), 1, &ZoneConfig::default())
            .collect(&[]);

        assert_eq!(ranked.len(), 2);
        assert!(matches!(ranked[0].kind, CandidateKind::NewChild { .. }));
        // B has less left over after placement, so it is the tighter fit.
        assert_eq!(ranked[0].parent.as_deref(), Some("hostb"));

        // Re-running the identical request yields the identical order.
        let again = prioritizer(&inventory, one_node(requested), 1, &ZoneConfig::default())
            .collect(&[]);
        assert_eq!(again, ranked);
    }

    #[test]
    fn existing_active_nodes_outrank_new_ones_and_suppress_their_host() {
        let inventory = Inventory::build(vec![
            make_host("hosta", quantities(4000, 8 << 30, 100 << 30), &["10.0.0.2"]),
            make_host("hostb", quantities(4000, 8 << 30, 100 << 30), &["10.0.1.2"]),
            allocated(
                make_tenant("node1", Some("hosta"), NodeState::Active),
                "web",
                0,
            ),
        ])
        .unwrap();

        let ranked = prioritizer(
            &inventory,
            one_node(quantities(1000, 2 << 30, 10 << 30)),
            1,
            &ZoneConfig::default(),
        )
        .collect(&[]);

        assert!(matches!(ranked[0].kind, CandidateKind::ExistingNode { .. }));
        assert!(ranked[0].retains_active);
        // hosta already hosts a node of this cluster, so no new child there.
        assert!(
            !ranked.iter().any(|c| matches!(c.kind, CandidateKind::NewChild { .. })
                && c.parent.as_deref() == Some("hosta"))
        );
    }

    #[test]
    fn ready_nodes_are_reused_before_creating_new_ones() {
        let inventory = Inventory::build(vec![
            make_host("hosta", quantities(4000, 8 << 30, 100 << 30), &["10.0.0.2"]),
            make_host("hostb", quantities(4000, 8 << 30, 100 << 30), &["10.0.1.2"]),
            make_tenant("ready1", Some("hosta"), NodeState::Ready),
        ])
        .unwrap();

        let ranked = prioritizer(
            &inventory,
            one_node(quantities(1000, 2 << 30, 10 << 30)),
            1,
            &ZoneConfig::default(),
        )
        .collect(&[]);

        assert!(matches!(ranked[0].kind, CandidateKind::ReadyNode { .. }));
        assert_eq!(ranked[0].node().unwrap().hostname, "ready1");
    }

    #[test]
    fn surplus_nodes_from_another_cluster_are_folded_in() {
        let inventory = Inventory::build(vec![
            make_host("hosta", quantities(4000, 8 << 30, 100 << 30), &["10.0.0.2"]),
            allocated(
                make_tenant("surplus1", Some("hosta"), NodeState::Active),
                "search",
                0,
            ),
        ])
        .unwrap();
        let surplus = inventory.get("surplus1").unwrap().clone();

        let ranked = prioritizer(
            &inventory,
            one_node(quantities(1000, 2 << 30, 10 << 30)),
            1,
            &ZoneConfig::default(),
        )
        .collect(&[surplus]);

        let kinds: Vec<_> = ranked.iter().map(|c| c.kind.clone()).collect();
        assert!(
            kinds
                .iter()
                .any(|k| matches!(k, CandidateKind::SurplusNode { .. }))
        );
        // Surplus reuse still beats synthesizing a brand-new node.
        assert!(matches!(ranked[0].kind, CandidateKind::SurplusNode { .. }));
    }

    #[test]
    fn spare_hosts_are_off_limits_until_replacement() {
        // host1 is the freest host and becomes the single spare.
        let nodes = vec![
            make_host("host1", quantities(8000, 32 << 30, 500 << 30), &["10.0.0.2"]),
            make_host("host2", quantities(4000, 8 << 30, 100 << 30), &["10.0.1.2"]),
            make_host("host3", quantities(4000, 8 << 30, 100 << 30), &["10.0.2.2"]),
        ];
        let zone = ZoneConfig {
            dynamic_provisioning: false,
            spare_count: 1,
        };

        let inventory = Inventory::build(nodes.clone()).unwrap();
        let ranked = prioritizer(
            &inventory,
            one_node(quantities(1000, 2 << 30, 10 << 30)),
            1,
            &zone,
        )
        .collect(&[]);

        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|c| c.parent.as_deref() != Some("host1")));

        // With a failed node the request cannot be fulfilled without the
        // spare, so it becomes usable — flagged, and ranked last.
        let mut with_failure = nodes;
        with_failure.push(allocated(
            make_tenant("node1", Some("host2"), NodeState::Failed),
            "web",
            0,
        ));
        with_failure.push(allocated(
            make_tenant("node2", Some("host2"), NodeState::Active),
            "web",
            0,
        ));
        let inventory = Inventory::build(with_failure).unwrap();
        let ranked = prioritizer(
            &inventory,
            NodeSpec::Count {
                count: 2,
                resources: quantities(1000, 2 << 30, 10 << 30),
                exclusive: false,
            },
            1,
            &zone,
        )
        .collect(&[]);

        let on_spare: Vec<_> = ranked
            .iter()
            .filter(|c| c.parent.as_deref() == Some("host1"))
            .collect();
        assert_eq!(on_spare.len(), 1);
        assert!(on_spare[0].violates_spares);
        // The spare violation never outranks a clean candidate of its tier.
        let clean_new = ranked
            .iter()
            .position(|c| {
                matches!(c.kind, CandidateKind::NewChild { .. }) && !c.violates_spares
            })
            .unwrap();
        let spare_new = ranked
            .iter()
            .position(|c| {
                matches!(c.kind, CandidateKind::NewChild { .. }) && c.violates_spares
            })
            .unwrap();
        assert!(clean_new < spare_new);
    }

    #[test]
    fn detects_topology_change_and_blocks_in_place_resize() {
        let nodes = vec![
            make_host("hosta", quantities(8000, 32 << 30, 500 << 30), &["10.0.0.2"]),
            allocated(
                make_tenant("node1", Some("hosta"), NodeState::Active),
                "web",
                0,
            ),
            allocated(
                make_tenant("node2", Some("hosta"), NodeState::Active),
                "web",
                1,
            ),
        ];
        let requested = NodeSpec::Count {
            count: 2,
            resources: quantities(2000, 4 << 30, 20 << 30),
            exclusive: false,
        };

        // Groups {0, 1} are active but only one group is wanted.
        let inventory = Inventory::build(nodes).unwrap();
        let shrinking = prioritizer(&inventory, requested.clone(), 1, &ZoneConfig::default());
        assert!(shrinking.topology_change());
        let ranked = shrinking.collect(&[]);
        assert!(ranked.iter().all(|c| !c.resizable));

        // Keeping both groups allows resizing in place.
        let stable = prioritizer(&inventory, requested, 2, &ZoneConfig::default());
        assert!(!stable.topology_change());
        let ranked = stable.collect(&[]);
        assert!(ranked.iter().any(|c| c.resizable));
    }

    #[test]
    fn shared_switch_keeps_a_single_exclusive_candidate() {
        let mut hosta = make_host("hosta", quantities(4000, 8 << 30, 100 << 30), &["10.0.0.2"]);
        hosta.switch_hostname = Some("switch1".to_string());
        let mut hostb = make_host("hostb", quantities(4000, 8 << 30, 100 << 30), &["10.0.1.2"]);
        hostb.switch_hostname = Some("switch1".to_string());
        let inventory = Inventory::build(vec![hosta, hostb]).unwrap();

        let ranked = prioritizer(
            &inventory,
            one_node(quantities(1000, 2 << 30, 10 << 30)),
            1,
            &ZoneConfig::default(),
        )
        .collect(&[]);

        assert_eq!(ranked.len(), 2);
        let exclusive: Vec<_> = ranked.iter().filter(|c| c.exclusive_switch).collect();
        assert_eq!(exclusive.len(), 1);
        // The exclusive candidate sorts ahead of its demoted switch-mate.
        assert!(ranked[0].exclusive_switch);
        assert!(!ranked[1].exclusive_switch);
    }

    #[test]
    fn dynamic_zones_never_share_hosts_with_exclusive_requests() {
        let inventory = Inventory::build(vec![make_host(
            "hosta",
            quantities(4000, 8 << 30, 100 << 30),
            &["10.0.0.2"],
        )])
        .unwrap();
        let zone = ZoneConfig {
            dynamic_provisioning: true,
            spare_count: 0,
        };

        let exclusive = NodeSpec::Count {
            count: 1,
            resources: quantities(1000, 2 << 30, 10 << 30),
            exclusive: true,
        };
        assert!(prioritizer(&inventory, exclusive, 1, &zone).collect(&[]).is_empty());

        // A non-exclusive request may still share, and the empty host is a
        // dynamic-zone spare: usable but flagged.
        let shared = one_node(quantities(1000, 2 << 30, 10 << 30));
        let ranked = prioritizer(&inventory, shared, 1, &zone).collect(&[]);
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].violates_spares);
    }

    #[test]
    fn inactive_nodes_on_retiring_hosts_are_not_offered() {
        let mut retiring = make_host("hosta", quantities(4000, 8 << 30, 100 << 30), &["10.0.0.2"]);
        retiring.want_to_retire = true;
        let inventory = Inventory::build(vec![
            retiring,
            allocated(
                make_tenant("inactive1", Some("hosta"), NodeState::Inactive),
                "web",
                0,
            ),
            allocated(
                make_tenant("active1", Some("hosta"), NodeState::Active),
                "web",
                0,
            ),
        ])
        .unwrap();

        let ranked = prioritizer(
            &inventory,
            NodeSpec::Count {
                count: 2,
                resources: quantities(1000, 2 << 30, 10 << 30),
                exclusive: false,
            },
            1,
            &ZoneConfig::default(),
        )
        .collect(&[]);

        // The active node survives; the inactive one on the retiring host
        // does not, and the retiring host gets no new children either.
        let names: Vec<_> = ranked
            .iter()
            .filter_map(|c| c.node().map(|n| n.hostname.as_str()))
            .collect();
        assert_eq!(names, vec!["active1"]);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn capacity_shortfall_returns_fewer_candidates_not_an_error() {
        let inventory = Inventory::build(vec![make_host(
            "hosta",
            quantities(2000, 4 << 30, 50 << 30),
            &["10.0.0.2"],
        )])
        .unwrap();

        let ranked = prioritizer(
            &inventory,
            NodeSpec::Count {
                count: 3,
                resources: quantities(8000, 64 << 30, 1000 << 30),
                exclusive: false,
            },
            1,
            &ZoneConfig::default(),
        )
        .collect(&[]);

        assert!(ranked.is_empty());
    }
}
