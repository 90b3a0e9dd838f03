//! Core types and constants for the lampmesh protocol.

use alloc::vec::Vec;
use core::fmt;

use crate::time::Duration;

/// 4-byte printable ASCII lamp identifier.
pub type LampId = [u8; 4];

/// Message payload bytes (printable ASCII, space-free on the mesh).
pub type Payload = Vec<u8>;

/// Reserved destination id meaning "every lamp".
pub const BROADCAST_ID: LampId = *b"FFFF";

/// Hop value of a lamp that has never seen an INIT flood.
pub const INITIAL_HOP: u8 = 99;

/// Ceiling of the two-decimal-digit hop field.
pub const MAX_HOP: u8 = 99;

/// Cache sentinel for packet kinds that carry no content hash (INIT, SOS).
pub const SENTINEL_HASH: u16 = 0;

/// Upper bound on message bytes accepted by the receive path.
pub const MAX_MESSAGE_LEN: usize = 96;

// Wire type bytes. INIT places its type byte last (byte 8 of 9); every
// other kind places it at byte 8 of a longer header.
pub const TYPE_INIT: u8 = b'0';
pub const TYPE_BROADCAST: u8 = b'1';
pub const TYPE_TARGETED: u8 = b'2';
pub const TYPE_SOS: u8 = b'3';
pub const TYPE_MESSAGE: u8 = b'4';

// Header lengths for validation.
pub const HEADER_LEN_INIT: usize = 9;
pub const HEADER_LEN_SOS: usize = 11;
pub const HEADER_LEN_STANDARD: usize = 13;
pub const HEADER_LEN_MESSAGE: usize = 15;

/// Segment terminator on the infrared carrier.
pub const SEGMENT_TERMINATOR: u8 = b' ';

// NEC carrier timing. The receiver's decode budget needs ~100 ms per
// character; the header->message gap lets it re-arm between segments.
pub const IR_CHAR_GAP: Duration = Duration::from_millis(100);
pub const IR_SEGMENT_GAP: Duration = Duration::from_millis(50);

/// Inter-character timeout after which a partial segment is abandoned.
pub const SEGMENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Emitter directions, in burst order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Front,
    Right,
    Back,
    Left,
}

impl Direction {
    /// Clockwise burst order.
    pub const ALL: [Direction; 4] = [
        Direction::Front,
        Direction::Right,
        Direction::Back,
        Direction::Left,
    ];

    /// Index into per-direction storage.
    pub const fn index(self) -> usize {
        match self {
            Direction::Front => 0,
            Direction::Right => 1,
            Direction::Back => 2,
            Direction::Left => 3,
        }
    }
}

/// Events surfaced by the node for the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An SOS reached this node and it is an authorized HQ.
    SosAlert {
        /// Lamp that pressed the button.
        src: LampId,
        /// Hop distance carried by the packet when it arrived.
        hops: u8,
    },
    /// A MESSAGE packet addressed to HQ was delivered locally.
    MessageDelivered {
        src: LampId,
        message: Payload,
        hops: u8,
    },
    /// The lamp should modulate its light with this message, now and on the
    /// periodic rebroadcast schedule.
    LifiTransmit { message: Payload },
    /// Drive the status LED (mirrors the original firmware's blink points).
    Indicator(Blink),
}

/// Status LED pulse reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blink {
    Forward,
    Sos,
    Delivery,
}

/// Error type for node origination operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Message exceeds the receive buffer bound.
    MessageTooLong,
    /// SOS pressed again inside the cooldown window.
    SosCooldown,
    /// Operation only valid on an authorized HQ node.
    NotHq,
    /// Operation only valid on a lamp node.
    NotLamp,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MessageTooLong => write!(f, "message too long"),
            Error::SosCooldown => write!(f, "sos cooldown active"),
            Error::NotHq => write!(f, "not an hq node"),
            Error::NotLamp => write!(f, "not a lamp node"),
        }
    }
}
