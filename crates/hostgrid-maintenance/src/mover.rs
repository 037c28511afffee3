//! The generic best-move search shared by node-moving maintainers.

use std::cmp::Ordering;

use tracing::debug;

use hostgrid_allocator::{HostCapacity, HostResourcesCalculator, can_receive_tenant_nodes};
use hostgrid_inventory::{ApplicationId, Inventory, Node, NodeRole, NodeState};

/// How long after a deployment an application's nodes are left alone.
/// Recent deployments should settle before being disturbed.
pub const DEPLOY_COOLDOWN_SECS: u64 = 600;

/// Where the last deployment time of an application can be looked up.
pub trait DeployHistory {
    /// Unix time of the application's last deployment, if this manager
    /// knows it.
    fn last_deploy_epoch(&self, application: &ApplicationId) -> Option<u64>;

    /// Whether this manager is the one that deploys the given application.
    /// Applications deployed elsewhere have unknown deploy times and are
    /// conservatively treated as recently deployed.
    fn is_authoritative(&self, _application: &ApplicationId) -> bool {
        false
    }
}

/// A maintainer's notion of a relocation: how to describe one, and which
/// of two descriptions is better.
pub trait MoveAdvisor {
    type Move;

    /// The sentinel meaning "no move found yet".
    fn empty_move(&self) -> Self::Move;

    /// Describe relocating `node` from `from_host` to `to_host`, or the
    /// empty move if this relocation brings nothing.
    fn suggest(
        &self,
        node: &Node,
        from_host: &Node,
        to_host: &Node,
        inventory: &Inventory,
    ) -> Self::Move;

    /// Preference between two moves; `Greater` means `a` is preferred.
    fn compare(&self, a: &Self::Move, b: &Self::Move) -> Ordering;
}

/// Search every (node, target host) pair for the single best move.
///
/// Nodes of tester instances are never moved, and neither are nodes of
/// applications deployed within the cooldown window — or with unknown
/// deploy history, unless this manager is authoritative for them.
pub fn find_best_move<A: MoveAdvisor>(
    advisor: &A,
    inventory: &Inventory,
    calculator: &dyn HostResourcesCalculator,
    deploys: &dyn DeployHistory,
    now_epoch: u64,
) -> A::Move {
    let capacity = HostCapacity::new(inventory, calculator);
    let mut best = advisor.empty_move();
    let mut considered = 0usize;

    for node in inventory.with_role(NodeRole::Tenant) {
        if node.state != NodeState::Active {
            continue;
        }
        let Some(from_host) = inventory.parent_of(node) else {
            continue;
        };
        let Some(owner) = node.owner() else {
            continue;
        };
        if owner.is_tester() {
            continue;
        }
        if deployed_recently(deploys, owner, now_epoch) {
            continue;
        }
        for to_host in inventory.iter().filter(|h| can_receive_tenant_nodes(h)) {
            if to_host.hostname == from_host.hostname {
                continue;
            }
            if !capacity
                .free_capacity_of(to_host, false)
                .satisfies(&node.resources)
            {
                continue;
            }
            considered += 1;
            let suggested = advisor.suggest(node, from_host, to_host, inventory);
            if advisor.compare(&suggested, &best) == Ordering::Greater {
                best = suggested;
            }
        }
    }

    debug!(considered, "searched candidate moves");
    best
}

/// True if no active node is retiring or flagged for retirement. Callers
/// gate moves on this: relocating nodes while the zone is already in flux
/// is unsafe.
pub fn zone_is_stable(inventory: &Inventory) -> bool {
    inventory
        .in_state(NodeState::Active)
        .all(|n| !n.is_retired() && !n.want_to_retire)
}

fn deployed_recently(deploys: &dyn DeployHistory, owner: &ApplicationId, now_epoch: u64) -> bool {
    match deploys.last_deploy_epoch(owner) {
        Some(last) => now_epoch < last.saturating_add(DEPLOY_COOLDOWN_SECS),
        None => !deploys.is_authoritative(owner),
    }
}
