//! Deduplication cache: a bounded ring of (source, hash) pairs.
//!
//! Flood loops are broken here. A packet is re-emitted only when its
//! (src, hash) pair is absent from the ring; kinds without a content hash
//! (INIT, SOS) use the sentinel hash 0, so a single source contributes at
//! most one unsuppressed header-only flood per cache lifetime.

use alloc::vec::Vec;

use crate::types::LampId;

/// Bounded ring of (src, hash) pairs with an insertion cursor.
///
/// At most one slot matches a given pair; insertion overwrites the slot at
/// the cursor and advances it modulo the capacity.
pub struct DedupCache {
    slots: Vec<(LampId, u16)>,
    cursor: usize,
    capacity: usize,
}

impl DedupCache {
    /// Create a cache with the given number of slots.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            slots: Vec::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Test-and-insert: returns true (and records the pair) iff no slot
    /// already holds it. A duplicate leaves the cache untouched.
    pub fn check_and_insert(&mut self, src: LampId, hash: u16) -> bool {
        if self.slots.iter().any(|&(s, h)| s == src && h == hash) {
            return false;
        }
        if self.slots.len() < self.capacity {
            self.slots.push((src, hash));
        } else {
            self.slots[self.cursor] = (src, hash);
        }
        self.cursor = (self.cursor + 1) % self.capacity;
        true
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when nothing has been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: LampId = *b"102a";
    const B: LampId = *b"203b";
    const C: LampId = *b"304c";
    const D: LampId = *b"405d";

    #[test]
    fn test_first_insert_is_new() {
        let mut cache = DedupCache::new(3);
        assert!(cache.check_and_insert(A, 0x1234));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duplicate_is_suppressed() {
        let mut cache = DedupCache::new(3);
        assert!(cache.check_and_insert(A, 0x1234));
        assert!(!cache.check_and_insert(A, 0x1234));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_src_and_hash_both_distinguish() {
        let mut cache = DedupCache::new(3);
        assert!(cache.check_and_insert(A, 0x1234));
        assert!(cache.check_and_insert(B, 0x1234));
        assert!(cache.check_and_insert(A, 0x5678));
    }

    #[test]
    fn test_ring_eviction() {
        let mut cache = DedupCache::new(3);
        assert!(cache.check_and_insert(A, 1));
        assert!(cache.check_and_insert(B, 2));
        assert!(cache.check_and_insert(C, 3));
        // Fourth insertion overwrites the oldest slot.
        assert!(cache.check_and_insert(D, 4));
        assert!(cache.check_and_insert(A, 1));
        // B and C are still resident.
        assert!(!cache.check_and_insert(C, 3));
    }

    #[test]
    fn test_sentinel_suppresses_repeat_sos() {
        let mut cache = DedupCache::new(3);
        assert!(cache.check_and_insert(A, crate::types::SENTINEL_HASH));
        // The same lamp's SOS arriving over a second path is a duplicate.
        assert!(!cache.check_and_insert(A, crate::types::SENTINEL_HASH));
    }

    #[test]
    fn test_replaying_a_sequence_is_idempotent() {
        let seq = [(A, 10u16), (B, 20), (A, 30), (C, 40)];

        let mut once = DedupCache::new(8);
        for &(src, h) in &seq {
            once.check_and_insert(src, h);
        }
        let snapshot_once = once.slots.clone();

        let mut twice = DedupCache::new(8);
        for _ in 0..2 {
            for &(src, h) in &seq {
                twice.check_and_insert(src, h);
            }
        }
        assert_eq!(snapshot_once, twice.slots);
    }
}
