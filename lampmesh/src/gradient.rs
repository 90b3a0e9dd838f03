//! Distance-to-HQ gradient state.
//!
//! Each INIT flood wave carries a 2-char epoch id. Within one epoch a lamp's
//! hop may only strictly improve, which prevents oscillation; a new epoch
//! overwrites the hop unconditionally, which is how the operator forces a
//! re-survey after lamps move or fail.

use crate::types::{INITIAL_HOP, MAX_HOP};

/// Outcome of feeding one INIT observation into the gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientUpdate {
    /// Same epoch, strictly better distance adopted.
    Improved { from: u8, to: u8 },
    /// Same epoch, observation did not improve on the current hop.
    Unchanged,
    /// New epoch: state replaced regardless of the previous hop.
    EpochReset { to: u8 },
}

/// Per-lamp gradient state. HQ holds none; its hop is the constant 0.
pub struct Gradient {
    last_init_id: Option<[u8; 2]>,
    my_hop: u8,
}

impl Gradient {
    /// Fresh state: no epoch seen, hop at the uninitialized ceiling.
    pub fn new() -> Self {
        Self {
            last_init_id: None,
            my_hop: INITIAL_HOP,
        }
    }

    /// This lamp's current distance to HQ.
    pub fn hop(&self) -> u8 {
        self.my_hop
    }

    /// The epoch id of the last INIT wave observed, if any.
    pub fn last_init_id(&self) -> Option<[u8; 2]> {
        self.last_init_id
    }

    /// Feed one received INIT (its epoch id and the hop it carried).
    pub fn on_init(&mut self, init_id: [u8; 2], received_hop: u8) -> GradientUpdate {
        let next = received_hop.saturating_add(1).min(MAX_HOP);
        if self.last_init_id == Some(init_id) {
            // Strict improvement only: received + 1 must beat the current hop.
            if received_hop < self.my_hop.saturating_sub(1) {
                let from = self.my_hop;
                self.my_hop = next;
                GradientUpdate::Improved {
                    from,
                    to: self.my_hop,
                }
            } else {
                GradientUpdate::Unchanged
            }
        } else {
            self.last_init_id = Some(init_id);
            self.my_hop = next;
            GradientUpdate::EpochReset { to: self.my_hop }
        }
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self::new()
    }
}

/// Suppression test for upstream-bound traffic (SOS, MESSAGE).
///
/// A node farther from HQ than the previous hop plus the tolerance would
/// push the packet away from HQ; it must stay silent. K > 0 leaves one ring
/// of lateral redundancy.
pub fn within_gradient(my_hop: u8, msg_hop: u8, tolerance: u8) -> bool {
    my_hop as u16 <= msg_hop as u16 + tolerance as u16
}

/// Hop carried by a re-emitted upstream packet: one step closer, floor 0.
pub fn decrement_hop(msg_hop: u8) -> u8 {
    msg_hop.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_init_is_epoch_reset() {
        let mut g = Gradient::new();
        assert_eq!(g.hop(), INITIAL_HOP);
        assert_eq!(g.on_init(*b"01", 0), GradientUpdate::EpochReset { to: 1 });
        assert_eq!(g.hop(), 1);
        assert_eq!(g.last_init_id(), Some(*b"01"));
    }

    #[test]
    fn test_same_epoch_strict_improvement_only() {
        let mut g = Gradient::new();
        g.on_init(*b"01", 4); // hop = 5
        assert_eq!(g.on_init(*b"01", 2), GradientUpdate::Improved { from: 5, to: 3 });
        // received + 1 == current hop: no change.
        assert_eq!(g.on_init(*b"01", 2), GradientUpdate::Unchanged);
        // Worse observation within the epoch never regresses the hop.
        assert_eq!(g.on_init(*b"01", 9), GradientUpdate::Unchanged);
        assert_eq!(g.hop(), 3);
    }

    #[test]
    fn test_hop_monotonic_within_epoch() {
        let mut g = Gradient::new();
        g.on_init(*b"07", 6);
        let mut last = g.hop();
        for &observed in &[5u8, 8, 2, 2, 90, 1] {
            g.on_init(*b"07", observed);
            assert!(g.hop() <= last);
            last = g.hop();
        }
    }

    #[test]
    fn test_new_epoch_resets_unconditionally() {
        let mut g = Gradient::new();
        g.on_init(*b"01", 0); // hop = 1
        assert_eq!(g.on_init(*b"02", 6), GradientUpdate::EpochReset { to: 7 });
        assert_eq!(g.hop(), 7);
        assert_eq!(g.last_init_id(), Some(*b"02"));
    }

    #[test]
    fn test_hop_saturates_at_field_ceiling() {
        let mut g = Gradient::new();
        g.on_init(*b"01", 99);
        assert_eq!(g.hop(), MAX_HOP);
    }

    #[test]
    fn test_within_gradient() {
        // A at hop 1 forwards a hop-2 packet; B at hop 3 stays silent (K=1).
        assert!(within_gradient(1, 2, 1));
        assert!(!within_gradient(3, 2, 1));
        // Equal distance passes, one ring past passes, two rings past fails.
        assert!(within_gradient(2, 2, 1));
        assert!(within_gradient(3, 2, 2));
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        assert_eq!(decrement_hop(5), 4);
        assert_eq!(decrement_hop(1), 0);
        assert_eq!(decrement_hop(0), 0);
    }
}
