//! Metrics collection for scenario analysis.

use hashbrown::HashMap;
use lampmesh::LampId;

/// Counters accumulated over a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimMetrics {
    /// Emission batches drained from any node's transmitter.
    pub transmissions: u64,
    /// Byte runs delivered to a receiver.
    pub deliveries: u64,
    /// Byte runs dropped by link loss.
    pub losses: u64,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Gradient state of the whole field at one instant.
#[derive(Debug, Clone)]
pub struct HopSnapshot {
    pub hops: HashMap<LampId, u8>,
}

impl HopSnapshot {
    pub fn new() -> Self {
        Self {
            hops: HashMap::new(),
        }
    }

    pub fn record(&mut self, id: LampId, hop: u8) {
        self.hops.insert(id, hop);
    }

    pub fn hop(&self, id: &LampId) -> Option<u8> {
        self.hops.get(id).copied()
    }

    /// True when every lamp has left the uninitialized hop.
    pub fn all_surveyed(&self) -> bool {
        self.hops
            .values()
            .all(|&h| h != lampmesh::INITIAL_HOP)
    }

    /// Largest distance in the field.
    pub fn max_hop(&self) -> u8 {
        self.hops.values().copied().max().unwrap_or(0)
    }
}

impl Default for HopSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_surveyed() {
        let mut snap = HopSnapshot::new();
        snap.record(*b"102a", 1);
        snap.record(*b"203b", 2);
        assert!(snap.all_surveyed());
        assert_eq!(snap.max_hop(), 2);

        snap.record(*b"304c", lampmesh::INITIAL_HOP);
        assert!(!snap.all_surveyed());
    }
}
