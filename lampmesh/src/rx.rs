//! Receive-side reassembly.
//!
//! The infrared carrier delivers one character at a time; an ASCII space
//! terminates a segment. A packet is one segment (INIT, SOS) or two
//! (header then message). Reassembly therefore runs in two stages:
//!
//! 1. [`SegmentAssembler`] accumulates characters into segments, abandoning
//!    a partial segment when the carrier goes quiet for 2 s.
//! 2. [`PacketAssembler`] pairs header segments with their message segment,
//!    with a timeout on the pending header and a reset when a header-only
//!    packet interrupts the wait.

use alloc::vec::Vec;

use crate::time::{Duration, Timestamp};
use crate::types::{
    HEADER_LEN_INIT, HEADER_LEN_MESSAGE, HEADER_LEN_SOS, HEADER_LEN_STANDARD, MAX_MESSAGE_LEN,
    SEGMENT_TERMINATOR, TYPE_BROADCAST, TYPE_INIT, TYPE_MESSAGE, TYPE_SOS, TYPE_TARGETED,
};

/// Character accumulator for one space-terminated segment.
pub struct SegmentAssembler {
    buf: Vec<u8>,
    last_char: Timestamp,
}

impl SegmentAssembler {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            last_char: Timestamp::ZERO,
        }
    }

    /// Abandon a partial segment if the carrier has been quiet too long.
    /// Returns true if a partial segment was dropped.
    pub fn expire(&mut self, now: Timestamp, timeout: Duration) -> bool {
        if !self.buf.is_empty() && now.saturating_since(self.last_char) > timeout {
            self.buf.clear();
            true
        } else {
            false
        }
    }

    /// Feed one received character; a space yields the completed segment.
    pub fn push_byte(&mut self, byte: u8, now: Timestamp) -> Option<Vec<u8>> {
        if byte == SEGMENT_TERMINATOR {
            return Some(core::mem::take(&mut self.buf));
        }
        if self.buf.len() >= MAX_MESSAGE_LEN {
            // Oversized run: restart accumulation; the truncated remainder
            // will be discarded at the packet stage as an unknown length.
            self.buf.clear();
        }
        self.buf.push(byte);
        self.last_char = now;
        None
    }
}

impl Default for SegmentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// What became of a segment fed to the packet stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentDisposition {
    /// Stored as a pending header; a message segment must follow.
    Held,
    /// A packet is complete.
    Complete {
        header: Vec<u8>,
        message: Option<Vec<u8>>,
        /// True when a header-only packet interrupted a pending two-segment
        /// packet, whose message segment is presumed lost.
        dropped_pending: bool,
    },
    /// Not a valid header shape; dropped.
    Discarded { len: usize },
}

/// Two-state machine pairing header segments with message segments.
pub struct PacketAssembler {
    pending: Option<(Vec<u8>, Timestamp)>,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// True while a header is waiting for its message segment.
    pub fn awaiting_message(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop a pending header whose message segment never arrived.
    /// Returns true if one was dropped.
    pub fn expire(&mut self, now: Timestamp, timeout: Duration) -> bool {
        if let Some((_, held_at)) = self.pending {
            if now.saturating_since(held_at) > timeout {
                self.pending = None;
                return true;
            }
        }
        false
    }

    /// Feed one completed segment.
    pub fn on_segment(&mut self, segment: Vec<u8>, now: Timestamp) -> SegmentDisposition {
        if let Some((header, _)) = self.pending.take() {
            if is_header_only(&segment) {
                // The message for the held header is not coming; the new
                // header-only packet stands on its own.
                return SegmentDisposition::Complete {
                    header: segment,
                    message: None,
                    dropped_pending: true,
                };
            }
            return SegmentDisposition::Complete {
                header,
                message: Some(segment),
                dropped_pending: false,
            };
        }

        if is_header_only(&segment) {
            return SegmentDisposition::Complete {
                header: segment,
                message: None,
                dropped_pending: false,
            };
        }
        if is_two_segment_header(&segment) {
            self.pending = Some((segment, now));
            return SegmentDisposition::Held;
        }
        SegmentDisposition::Discarded {
            len: segment.len(),
        }
    }
}

impl Default for PacketAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// INIT and SOS are complete in a single segment. Note INIT's type byte is
/// its last byte; SOS carries the type at byte 8 like the standard kinds.
fn is_header_only(segment: &[u8]) -> bool {
    (segment.len() == HEADER_LEN_INIT && segment[HEADER_LEN_INIT - 1] == TYPE_INIT)
        || (segment.len() == HEADER_LEN_SOS && segment[8] == TYPE_SOS)
}

fn is_two_segment_header(segment: &[u8]) -> bool {
    (segment.len() == HEADER_LEN_STANDARD
        && (segment[8] == TYPE_BROADCAST || segment[8] == TYPE_TARGETED))
        || (segment.len() == HEADER_LEN_MESSAGE && segment[8] == TYPE_MESSAGE)
}
