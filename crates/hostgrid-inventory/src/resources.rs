//! Resource vectors for hosts and nodes.
//!
//! [`Resources`] is an immutable vector of resource quantities plus two
//! qualitative attributes (disk speed, storage class). Subtraction and the
//! `satisfies` predicate are the building blocks of all capacity accounting.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Disk speed advertised by a host or required by a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskSpeed {
    Fast,
    Slow,
    /// Matches any speed on the other side of a comparison.
    Any,
}

impl DiskSpeed {
    fn compatible_with(self, other: DiskSpeed) -> bool {
        self == DiskSpeed::Any || other == DiskSpeed::Any || self == other
    }
}

/// Storage class: node-local disk or network-attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    Local,
    Remote,
    /// Matches any storage class on the other side of a comparison.
    Any,
}

impl StorageClass {
    fn compatible_with(self, other: StorageClass) -> bool {
        self == StorageClass::Any || other == StorageClass::Any || self == other
    }
}

/// An immutable vector of resource quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// CPU in milli-cores.
    pub vcpu_millis: u32,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
    /// Network bandwidth in megabits per second.
    pub bandwidth_mbps: u32,
    pub disk_speed: DiskSpeed,
    pub storage: StorageClass,
}

impl Resources {
    /// The all-zero vector with unconstrained qualitative attributes.
    pub fn none() -> Self {
        Self {
            vcpu_millis: 0,
            memory_bytes: 0,
            disk_bytes: 0,
            bandwidth_mbps: 0,
            disk_speed: DiskSpeed::Any,
            storage: StorageClass::Any,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.vcpu_millis == 0
            && self.memory_bytes == 0
            && self.disk_bytes == 0
            && self.bandwidth_mbps == 0
    }

    /// Per-dimension saturating subtraction. Qualitative attributes are
    /// carried from `self` unchanged.
    pub fn subtract(&self, other: &Resources) -> Resources {
        Resources {
            vcpu_millis: self.vcpu_millis.saturating_sub(other.vcpu_millis),
            memory_bytes: self.memory_bytes.saturating_sub(other.memory_bytes),
            disk_bytes: self.disk_bytes.saturating_sub(other.disk_bytes),
            bandwidth_mbps: self.bandwidth_mbps.saturating_sub(other.bandwidth_mbps),
            disk_speed: self.disk_speed,
            storage: self.storage,
        }
    }

    /// Per-dimension saturating addition. Qualitative attributes are
    /// carried from `self` unchanged.
    pub fn add(&self, other: &Resources) -> Resources {
        Resources {
            vcpu_millis: self.vcpu_millis.saturating_add(other.vcpu_millis),
            memory_bytes: self.memory_bytes.saturating_add(other.memory_bytes),
            disk_bytes: self.disk_bytes.saturating_add(other.disk_bytes),
            bandwidth_mbps: self.bandwidth_mbps.saturating_add(other.bandwidth_mbps),
            disk_speed: self.disk_speed,
            storage: self.storage,
        }
    }

    /// True iff every numeric dimension of `requested` fits within `self`
    /// and the qualitative attributes are compatible. `Any` on either side
    /// of a qualitative attribute matches.
    pub fn satisfies(&self, requested: &Resources) -> bool {
        self.vcpu_millis >= requested.vcpu_millis
            && self.memory_bytes >= requested.memory_bytes
            && self.disk_bytes >= requested.disk_bytes
            && self.bandwidth_mbps >= requested.bandwidth_mbps
            && self.disk_speed.compatible_with(requested.disk_speed)
            && self.storage.compatible_with(requested.storage)
    }

    /// Deterministic size order over the numeric dimensions: memory, then
    /// CPU, then disk, then bandwidth. Qualitative attributes do not
    /// participate.
    pub fn compare_size(&self, other: &Resources) -> Ordering {
        self.memory_bytes
            .cmp(&other.memory_bytes)
            .then_with(|| self.vcpu_millis.cmp(&other.vcpu_millis))
            .then_with(|| self.disk_bytes.cmp(&other.disk_bytes))
            .then_with(|| self.bandwidth_mbps.cmp(&other.bandwidth_mbps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn satisfies_requires_every_dimension() {
        let free = quantities(4000, 8 << 30, 100 << 30);

        assert!(free.satisfies(&quantities(1000, 2 << 30, 10 << 30)));
        assert!(free.satisfies(&free));
        assert!(!free.satisfies(&quantities(5000, 2 << 30, 10 << 30)));
        assert!(!free.satisfies(&quantities(1000, 16 << 30, 10 << 30)));
        assert!(!free.satisfies(&quantities(1000, 2 << 30, 200 << 30)));
    }

    #[test]
    fn satisfies_checks_qualitative_compatibility() {
        let mut free = quantities(4000, 8 << 30, 100 << 30);
        free.disk_speed = DiskSpeed::Fast;
        free.storage = StorageClass::Local;

        let mut wants_fast = quantities(1000, 1 << 30, 1 << 30);
        wants_fast.disk_speed = DiskSpeed::Fast;
        assert!(free.satisfies(&wants_fast));

        let mut wants_slow = wants_fast;
        wants_slow.disk_speed = DiskSpeed::Slow;
        assert!(!free.satisfies(&wants_slow));

        let mut wants_any = wants_fast;
        wants_any.disk_speed = DiskSpeed::Any;
        assert!(free.satisfies(&wants_any));

        let mut wants_remote = wants_fast;
        wants_remote.storage = StorageClass::Remote;
        assert!(!free.satisfies(&wants_remote));
    }

    #[test]
    fn subtract_saturates_and_keeps_qualitatives() {
        let mut a = quantities(1000, 4 << 30, 50 << 30);
        a.disk_speed = DiskSpeed::Fast;
        let b = quantities(2000, 1 << 30, 10 << 30);

        let diff = a.subtract(&b);
        assert_eq!(diff.vcpu_millis, 0); // Saturated, not wrapped.
        assert_eq!(diff.memory_bytes, 3 << 30);
        assert_eq!(diff.disk_bytes, 40 << 30);
        assert_eq!(diff.disk_speed, DiskSpeed::Fast);
    }

    #[test]
    fn add_then_subtract_round_trips() {
        let a = quantities(1500, 3 << 30, 20 << 30);
        let b = quantities(500, 1 << 30, 5 << 30);

        assert_eq!(a.add(&b).subtract(&b), a);
    }

    #[test]
    fn compare_size_orders_memory_first() {
        let small = quantities(8000, 2 << 30, 500 << 30);
        let large = quantities(1000, 4 << 30, 10 << 30);

        // More memory wins regardless of the other dimensions.
        assert_eq!(small.compare_size(&large), Ordering::Less);
        assert_eq!(large.compare_size(&small), Ordering::Greater);

        let tie_a = quantities(2000, 4 << 30, 10 << 30);
        let tie_b = quantities(1000, 4 << 30, 10 << 30);
        assert_eq!(tie_b.compare_size(&tie_a), Ordering::Less);
    }

    #[test]
    fn none_is_zero() {
        assert!(Resources::none().is_zero());
        assert!(!quantities(0, 1, 0).is_zero());
    }
}
