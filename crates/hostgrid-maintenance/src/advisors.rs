//! Concrete move representations for the node-moving maintainers.

use std::cmp::Ordering;

use tracing::debug;

use hostgrid_allocator::{HostCapacity, HostResourcesCalculator};
use hostgrid_inventory::{HostName, Inventory, Node, Resources};

use crate::mover::MoveAdvisor;

/// One suggested relocation, or nothing worth doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    None,
    /// Shift load from a busy host to a calmer one.
    Rebalance {
        node: HostName,
        from: HostName,
        to: HostName,
        /// Utilization improvement, in parts per million.
        benefit_ppm: u64,
    },
    /// Get a node off a host that wants to retire.
    Evacuate {
        node: HostName,
        from: HostName,
        to: HostName,
        /// Destination free capacity once the node has landed.
        free_after: Resources,
    },
}

impl Move {
    pub fn is_none(&self) -> bool {
        matches!(self, Move::None)
    }
}

/// Suggests moves that take memory load off the busiest hosts.
///
/// A move is worth suggesting when the source host's utilization before
/// the move exceeds the destination's utilization after it; the benefit is
/// that difference. Ties break on node then destination hostname, so the
/// search result is deterministic.
pub struct RebalanceAdvisor<'a> {
    calculator: &'a dyn HostResourcesCalculator,
}

impl<'a> RebalanceAdvisor<'a> {
    pub fn new(calculator: &'a dyn HostResourcesCalculator) -> Self {
        Self { calculator }
    }

    fn utilization_ppm(&self, capacity: &HostCapacity<'_>, host: &Node, extra: u64) -> u64 {
        let advertised = self.calculator.advertised_resources(host).memory_bytes;
        if advertised == 0 {
            return 1_000_000;
        }
        let free = capacity.free_capacity_of(host, false).memory_bytes;
        let used = advertised.saturating_sub(free).saturating_add(extra);
        used.saturating_mul(1_000_000) / advertised
    }
}

impl MoveAdvisor for RebalanceAdvisor<'_> {
    type Move = Move;

    fn empty_move(&self) -> Move {
        Move::None
    }

    fn suggest(
        &self,
        node: &Node,
        from_host: &Node,
        to_host: &Node,
        inventory: &Inventory,
    ) -> Move {
        let capacity = HostCapacity::new(inventory, self.calculator);
        let from_before = self.utilization_ppm(&capacity, from_host, 0);
        let to_after = self.utilization_ppm(&capacity, to_host, node.resources.memory_bytes);

        let Some(benefit_ppm) = from_before.checked_sub(to_after).filter(|b| *b > 0) else {
            return Move::None;
        };
        debug!(
            node = %node.hostname,
            from = %from_host.hostname,
            to = %to_host.hostname,
            benefit_ppm,
            "rebalance move found"
        );
        Move::Rebalance {
            node: node.hostname.clone(),
            from: from_host.hostname.clone(),
            to: to_host.hostname.clone(),
            benefit_ppm,
        }
    }

    fn compare(&self, a: &Move, b: &Move) -> Ordering {
        match (a, b) {
            (Move::None, Move::None) => Ordering::Equal,
            (Move::None, _) => Ordering::Less,
            (_, Move::None) => Ordering::Greater,
            (
                Move::Rebalance {
                    benefit_ppm: benefit_a,
                    node: node_a,
                    to: to_a,
                    ..
                },
                Move::Rebalance {
                    benefit_ppm: benefit_b,
                    node: node_b,
                    to: to_b,
                    ..
                },
            ) => benefit_a
                .cmp(benefit_b)
                .then_with(|| node_b.cmp(node_a))
                .then_with(|| to_b.cmp(to_a)),
            // An advisor only ever ranks moves it produced itself.
            _ => Ordering::Equal,
        }
    }
}

/// Suggests moves off hosts flagged for retirement, preferring the
/// destination that is left with the least slack — the tightest fit.
pub struct EvacuationAdvisor<'a> {
    calculator: &'a dyn HostResourcesCalculator,
}

impl<'a> EvacuationAdvisor<'a> {
    pub fn new(calculator: &'a dyn HostResourcesCalculator) -> Self {
        Self { calculator }
    }
}

impl MoveAdvisor for EvacuationAdvisor<'_> {
    type Move = Move;

    fn empty_move(&self) -> Move {
        Move::None
    }

    fn suggest(
        &self,
        node: &Node,
        from_host: &Node,
        to_host: &Node,
        inventory: &Inventory,
    ) -> Move {
        if !from_host.want_to_retire {
            return Move::None;
        }
        let capacity = HostCapacity::new(inventory, self.calculator);
        let free_after = capacity
            .free_capacity_of(to_host, false)
            .subtract(&node.resources);
        debug!(
            node = %node.hostname,
            from = %from_host.hostname,
            to = %to_host.hostname,
            "evacuation move found"
        );
        Move::Evacuate {
            node: node.hostname.clone(),
            from: from_host.hostname.clone(),
            to: to_host.hostname.clone(),
            free_after,
        }
    }

    fn compare(&self, a: &Move, b: &Move) -> Ordering {
        match (a, b) {
            (Move::None, Move::None) => Ordering::Equal,
            (Move::None, _) => Ordering::Less,
            (_, Move::None) => Ordering::Greater,
            (
                Move::Evacuate {
                    free_after: free_a,
                    node: node_a,
                    to: to_a,
                    ..
                },
                Move::Evacuate {
                    free_after: free_b,
                    node: node_b,
                    to: to_b,
                    ..
                },
            ) => free_b
                .compare_size(free_a)
                .then_with(|| node_b.cmp(node_a))
                .then_with(|| to_b.cmp(to_a)),
            // An advisor only ever ranks moves it produced itself.
            _ => Ordering::Equal,
        }
    }
}
