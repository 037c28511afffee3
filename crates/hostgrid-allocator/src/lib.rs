//! hostgrid-allocator — placement decisions for the HostGrid fleet manager.
//!
//! Given an inventory snapshot and an allocation request, this crate
//! decides which nodes could serve the request and ranks them into a
//! single deterministic preference order. It never mutates node state:
//! the caller commits (a prefix of) the ranked list under its own
//! transaction and re-validates capacity if it delays.
//!
//! # Components
//!
//! - **`spec`** — Allocation requests, zone policy, resource advertisement
//! - **`capacity`** — Free capacity and free IPs per host, spare selection
//! - **`candidate`** — One placement option with its ranking metadata
//! - **`prioritizer`** — Candidate enumeration and final ordering

pub mod capacity;
pub mod candidate;
pub mod prioritizer;
pub mod spec;

pub use capacity::{HostCapacity, SpareHosts};
pub use candidate::{CandidateKind, NodeCandidate};
pub use prioritizer::NodePrioritizer;
pub use spec::{
    ClusterSpec, HostResourcesCalculator, NodeSpec, RawResourcesCalculator, ZoneConfig,
    can_receive_tenant_nodes,
};
