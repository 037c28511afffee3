//! hostgrid-inventory — the node inventory for HostGrid.
//!
//! Domain types for hosts, nodes, and allocations, plus the read-only
//! snapshot index the allocation core operates on. The inventory never
//! mutates node state itself; the surrounding repository owns all state
//! transitions and hands this crate an immutable copy.
//!
//! # Components
//!
//! - **`resources`** — Resource vectors (CPU, memory, disk, bandwidth)
//! - **`types`** — Hosts, nodes, allocations, cluster membership
//! - **`inventory`** — Arena-backed snapshot with parent/child lookup

pub mod error;
pub mod inventory;
pub mod resources;
pub mod types;

pub use error::{InventoryError, InventoryResult};
pub use inventory::Inventory;
pub use resources::{DiskSpeed, Resources, StorageClass};
pub use types::*;
