//! One placement option, with the metadata that ranks it.
//!
//! Candidates are constructed fresh for each allocation request and
//! discarded after use — they never outlive one prioritization pass.

use std::cmp::Ordering;

use hostgrid_inventory::{HostName, Node, NodeState, Resources};

/// How a candidate came to exist, carrying only what that origin knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateKind {
    /// A node already allocated to the requesting application and cluster.
    ExistingNode { node: Node },
    /// A node freed by downsizing a cluster within the same operation.
    SurplusNode { node: Node },
    /// A provisioned node not yet allocated to any application.
    ReadyNode { node: Node },
    /// A hypothetical node, sized to the request, on a host with room.
    NewChild { resources: Resources },
}

impl CandidateKind {
    /// Preference rank among kinds: reusing existing state beats creating
    /// new state.
    fn rank(&self) -> u8 {
        match self {
            CandidateKind::ExistingNode { .. } => 0,
            CandidateKind::SurplusNode { .. } => 1,
            CandidateKind::ReadyNode { .. } => 2,
            CandidateKind::NewChild { .. } => 3,
        }
    }
}

/// A ranked placement option for one allocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCandidate {
    pub kind: CandidateKind,
    /// The resolved parent host, when the candidate has one.
    pub parent: Option<HostName>,
    /// Switch identity of the candidate's placement, from the parent when
    /// present.
    pub switch_id: Option<String>,
    /// Free capacity of the parent host after this placement. Drives the
    /// tightest-fit preference.
    pub free_after: Resources,
    /// Placing here would consume a reserved spare host.
    pub violates_spares: bool,
    /// No better candidate of the same application shares this switch.
    pub exclusive_switch: bool,
    /// The candidate keeps an allocation that is already active.
    pub retains_active: bool,
    /// The node can be resized in place to the requested resources.
    pub resizable: bool,
}

impl NodeCandidate {
    /// A candidate from a node with a resolved parent host.
    pub fn existing_child(
        node: Node,
        parent: &Node,
        free_after: Resources,
        violates_spares: bool,
        resizable: bool,
    ) -> Self {
        let retains_active = node.state == NodeState::Active && node.allocation.is_some();
        Self {
            switch_id: parent.switch_hostname.clone(),
            parent: Some(parent.hostname.clone()),
            kind: CandidateKind::ExistingNode { node },
            free_after,
            violates_spares,
            exclusive_switch: true,
            retains_active,
            resizable,
        }
    }

    /// A candidate from a node with no parent in the snapshot.
    pub fn existing_standalone(node: Node) -> Self {
        let retains_active = node.state == NodeState::Active && node.allocation.is_some();
        Self {
            switch_id: node.switch_hostname.clone(),
            parent: None,
            kind: CandidateKind::ExistingNode { node },
            free_after: Resources::none(),
            violates_spares: false,
            exclusive_switch: true,
            retains_active,
            resizable: false,
        }
    }

    /// A hypothetical new child on the given host.
    pub fn new_child(
        resources: Resources,
        host: &Node,
        free_after: Resources,
        violates_spares: bool,
    ) -> Self {
        Self {
            kind: CandidateKind::NewChild { resources },
            parent: Some(host.hostname.clone()),
            switch_id: host.switch_hostname.clone(),
            free_after,
            violates_spares,
            exclusive_switch: true,
            retains_active: false,
            resizable: false,
        }
    }

    /// Reclassify as a surplus-node candidate. Surplus reuse never retains
    /// an active allocation — the node is leaving its cluster.
    pub fn as_surplus(mut self) -> Self {
        if let CandidateKind::ExistingNode { node } = self.kind {
            self.kind = CandidateKind::SurplusNode { node };
        }
        self.retains_active = false;
        self
    }

    /// Reclassify as a ready-node candidate.
    pub fn as_ready(mut self) -> Self {
        if let CandidateKind::ExistingNode { node } = self.kind {
            self.kind = CandidateKind::ReadyNode { node };
        }
        self.retains_active = false;
        self
    }

    /// The existing node behind this candidate, when there is one.
    pub fn node(&self) -> Option<&Node> {
        match &self.kind {
            CandidateKind::ExistingNode { node }
            | CandidateKind::SurplusNode { node }
            | CandidateKind::ReadyNode { node } => Some(node),
            CandidateKind::NewChild { .. } => None,
        }
    }

    /// The resource footprint this candidate would occupy.
    pub fn resources(&self) -> &Resources {
        match &self.kind {
            CandidateKind::ExistingNode { node }
            | CandidateKind::SurplusNode { node }
            | CandidateKind::ReadyNode { node } => &node.resources,
            CandidateKind::NewChild { resources } => resources,
        }
    }

    /// Identity used for the final deterministic tie-break: the node's own
    /// hostname, or the host's for a node that does not exist yet.
    pub fn identity(&self) -> &str {
        match self.node() {
            Some(node) => &node.hostname,
            None => self.parent.as_deref().unwrap_or_default(),
        }
    }

    /// A copy demoted from switch exclusivity because a better candidate on
    /// the same switch was already selected.
    pub fn with_exclusive_switch(mut self, exclusive: bool) -> Self {
        self.exclusive_switch = exclusive;
        self
    }

    /// The total preference order, most-preferred first. The first
    /// differing tier decides: keeping an active allocation, then not
    /// consuming a spare host, then switch exclusivity, then reusing
    /// existing state over creating it, then tightest post-placement fit,
    /// then identity so the order is total.
    pub fn compare(&self, other: &Self) -> Ordering {
        other
            .retains_active
            .cmp(&self.retains_active)
            .then_with(|| self.violates_spares.cmp(&other.violates_spares))
            .then_with(|| other.exclusive_switch.cmp(&self.exclusive_switch))
            .then_with(|| self.kind.rank().cmp(&other.kind.rank()))
            .then_with(|| self.free_after.compare_size(&other.free_after))
            .then_with(|| self.identity().cmp(other.identity()))
    }
}
