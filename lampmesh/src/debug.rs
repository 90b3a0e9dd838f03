//! Debug events for protocol tracing.
//!
//! The engine records a bounded trail of typed events instead of formatting
//! log text; the simulator and tests drain them with
//! [`crate::node::Node::take_debug_events`].

use crate::types::LampId;

/// Maximum retained events; older entries are dropped first.
pub(crate) const DEBUG_RING_CAPACITY: usize = 64;

/// Protocol trace events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// Partial segment abandoned after carrier silence.
    SegmentTimeout,
    /// Segment with no valid header shape dropped.
    SegmentDiscarded { len: usize },
    /// A header-only packet arrived while a message segment was pending.
    SegmentLost,
    /// Pending header dropped; its message segment never arrived.
    HeaderTimeout,
    /// Header failed to decode.
    HeaderRejected,
    /// Recomputed content hash does not match the header.
    HashMismatch { src: LampId, expected: u16, got: u16 },
    /// Packet already seen; not re-emitted, not re-delivered.
    DuplicateDropped { src: LampId, hash: u16 },
    /// Too far downstream to re-emit (expected behavior, not an error).
    GradientSuppressed { my_hop: u8, msg_hop: u8 },
    /// Hop improved within the current survey epoch.
    GradientImproved { from: u8, to: u8 },
    /// New survey epoch adopted.
    GradientEpochReset { init_id: [u8; 2], hop: u8 },
    /// Packet re-emitted into the mesh.
    Forwarded { type_byte: u8 },
    /// Packet tracked for timed redundancy.
    RetransmitQueued,
    /// Scheduled retransmission emitted.
    RetransmitFired { emission: u8 },
    /// No free slot; redundancy dropped for this packet.
    RetransmitQueueFull,
    /// SOS press ignored inside the cooldown window.
    SosCooldownDropped,
    /// Held LiFi message re-driven on the rebroadcast schedule.
    LifiRebroadcast,
}
