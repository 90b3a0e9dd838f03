//! Wire format: the five packet kinds and their header codecs.
//!
//! Headers are fixed-width ASCII, one length per kind:
//!
//! ```text
//! INIT      (9)  src(4) initId(2) hop(2)  '0'            header-only
//! BROADCAST (13) src(4) dst(4)    '1'     hash(4)        + message segment
//! TARGETED  (13) src(4) dst(4)    '2'     hash(4)        + message segment
//! SOS       (11) src(4) dst(4)    '3'     hop(2)         header-only
//! MESSAGE   (15) src(4) dst(4)    '4'     hash(4) hop(2) + message segment
//! ```
//!
//! INIT is the odd one out: its type byte is the *last* byte of the header,
//! while every other kind carries it at byte 8. Both positions happen to be
//! offset 8, but only because the INIT header is exactly 9 bytes; the parser
//! keeps them as separate arms so the asymmetry stays explicit.

use alloc::vec::Vec;
use core::fmt;

use crate::hash::{parse_hex4, parse_hop, render_hex4, render_hop};
use crate::types::{
    LampId, HEADER_LEN_INIT, HEADER_LEN_MESSAGE, HEADER_LEN_SOS, HEADER_LEN_STANDARD,
    TYPE_BROADCAST, TYPE_INIT, TYPE_MESSAGE, TYPE_SOS, TYPE_TARGETED,
};

// Field offsets, shared by every kind that has the field.
const OFF_SRC: core::ops::Range<usize> = 0..4;
const OFF_DST: core::ops::Range<usize> = 4..8;
const OFF_TYPE: usize = 8;
const OFF_INIT_ID: core::ops::Range<usize> = 4..6;
const OFF_INIT_HOP: core::ops::Range<usize> = 6..8;
const OFF_HASH: core::ops::Range<usize> = 9..13;
const OFF_SOS_HOP: core::ops::Range<usize> = 9..11;
const OFF_MSG_HOP: core::ops::Range<usize> = 13..15;

/// Header decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No packet kind has a header of this length.
    UnknownLength(usize),
    /// The type byte does not match the kind implied by the length.
    TypeMismatch(u8),
    /// An id field contains non-printable or reserved bytes.
    BadId,
    /// A hop field is not two decimal digits.
    BadHop,
    /// A hash field is not four hex digits.
    BadHash,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownLength(len) => write!(f, "unknown header length {}", len),
            ParseError::TypeMismatch(b) => write!(f, "type byte {:#04x} does not match length", b),
            ParseError::BadId => write!(f, "invalid id field"),
            ParseError::BadHop => write!(f, "invalid hop field"),
            ParseError::BadHash => write!(f, "invalid hash field"),
        }
    }
}

/// A decoded packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Gradient survey wave, spreading outward from HQ.
    Init {
        src: LampId,
        init_id: [u8; 2],
        hop: u8,
    },
    /// HQ announcement for every lamp's LiFi downlink.
    Broadcast { src: LampId, dst: LampId, hash: u16 },
    /// HQ announcement for one lamp's LiFi downlink.
    Targeted { src: LampId, dst: LampId, hash: u16 },
    /// Emergency alert climbing the gradient toward HQ.
    Sos { src: LampId, dst: LampId, hop: u8 },
    /// Telemetry climbing the gradient toward HQ.
    Message {
        src: LampId,
        dst: LampId,
        hash: u16,
        hop: u8,
    },
}

impl Packet {
    /// Source lamp id.
    pub fn src(&self) -> LampId {
        match self {
            Packet::Init { src, .. }
            | Packet::Broadcast { src, .. }
            | Packet::Targeted { src, .. }
            | Packet::Sos { src, .. }
            | Packet::Message { src, .. } => *src,
        }
    }

    /// Wire type byte.
    pub fn type_byte(&self) -> u8 {
        match self {
            Packet::Init { .. } => TYPE_INIT,
            Packet::Broadcast { .. } => TYPE_BROADCAST,
            Packet::Targeted { .. } => TYPE_TARGETED,
            Packet::Sos { .. } => TYPE_SOS,
            Packet::Message { .. } => TYPE_MESSAGE,
        }
    }

    /// True for kinds that are followed by a message segment.
    pub fn carries_message(&self) -> bool {
        matches!(
            self,
            Packet::Broadcast { .. } | Packet::Targeted { .. } | Packet::Message { .. }
        )
    }

    /// Decode a header from its wire bytes.
    pub fn parse(header: &[u8]) -> Result<Packet, ParseError> {
        match header.len() {
            HEADER_LEN_INIT => {
                // INIT: type byte is the final byte, after the hop field.
                if header[HEADER_LEN_INIT - 1] != TYPE_INIT {
                    return Err(ParseError::TypeMismatch(header[HEADER_LEN_INIT - 1]));
                }
                Ok(Packet::Init {
                    src: parse_id(&header[OFF_SRC])?,
                    init_id: [header[OFF_INIT_ID.start], header[OFF_INIT_ID.start + 1]],
                    hop: parse_hop(&header[OFF_INIT_HOP]).ok_or(ParseError::BadHop)?,
                })
            }
            HEADER_LEN_SOS => {
                if header[OFF_TYPE] != TYPE_SOS {
                    return Err(ParseError::TypeMismatch(header[OFF_TYPE]));
                }
                Ok(Packet::Sos {
                    src: parse_id(&header[OFF_SRC])?,
                    dst: parse_id(&header[OFF_DST])?,
                    hop: parse_hop(&header[OFF_SOS_HOP]).ok_or(ParseError::BadHop)?,
                })
            }
            HEADER_LEN_STANDARD => {
                let src = parse_id(&header[OFF_SRC])?;
                let dst = parse_id(&header[OFF_DST])?;
                let hash = parse_hex4(&header[OFF_HASH]).ok_or(ParseError::BadHash)?;
                match header[OFF_TYPE] {
                    TYPE_BROADCAST => Ok(Packet::Broadcast { src, dst, hash }),
                    TYPE_TARGETED => Ok(Packet::Targeted { src, dst, hash }),
                    other => Err(ParseError::TypeMismatch(other)),
                }
            }
            HEADER_LEN_MESSAGE => {
                if header[OFF_TYPE] != TYPE_MESSAGE {
                    return Err(ParseError::TypeMismatch(header[OFF_TYPE]));
                }
                Ok(Packet::Message {
                    src: parse_id(&header[OFF_SRC])?,
                    dst: parse_id(&header[OFF_DST])?,
                    hash: parse_hex4(&header[OFF_HASH]).ok_or(ParseError::BadHash)?,
                    hop: parse_hop(&header[OFF_MSG_HOP]).ok_or(ParseError::BadHop)?,
                })
            }
            other => Err(ParseError::UnknownLength(other)),
        }
    }

    /// Encode the header to its wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN_MESSAGE);
        match self {
            Packet::Init { src, init_id, hop } => {
                out.extend_from_slice(src);
                out.extend_from_slice(init_id);
                out.extend_from_slice(&render_hop(*hop));
                out.push(TYPE_INIT);
            }
            Packet::Broadcast { src, dst, hash } => {
                out.extend_from_slice(src);
                out.extend_from_slice(dst);
                out.push(TYPE_BROADCAST);
                out.extend_from_slice(&render_hex4(*hash));
            }
            Packet::Targeted { src, dst, hash } => {
                out.extend_from_slice(src);
                out.extend_from_slice(dst);
                out.push(TYPE_TARGETED);
                out.extend_from_slice(&render_hex4(*hash));
            }
            Packet::Sos { src, dst, hop } => {
                out.extend_from_slice(src);
                out.extend_from_slice(dst);
                out.push(TYPE_SOS);
                out.extend_from_slice(&render_hop(*hop));
            }
            Packet::Message {
                src,
                dst,
                hash,
                hop,
            } => {
                out.extend_from_slice(src);
                out.extend_from_slice(dst);
                out.push(TYPE_MESSAGE);
                out.extend_from_slice(&render_hex4(*hash));
                out.extend_from_slice(&render_hop(*hop));
            }
        }
        out
    }
}

/// Ids are printable ASCII; space is reserved for framing.
fn parse_id(field: &[u8]) -> Result<LampId, ParseError> {
    let mut id = [0u8; 4];
    for (slot, &b) in id.iter_mut().zip(field) {
        if !(0x21..=0x7E).contains(&b) {
            return Err(ParseError::BadId);
        }
        *slot = b;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_roundtrip() {
        let pkt = Packet::Init {
            src: *b"000h",
            init_id: *b"01",
            hop: 0,
        };
        let wire = pkt.encode();
        assert_eq!(wire, b"000h01000");
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn test_init_type_byte_is_last() {
        // Same offset 8 as the other kinds, but it follows the hop field.
        let wire = b"000h01070";
        match Packet::parse(wire).unwrap() {
            Packet::Init { init_id, hop, .. } => {
                assert_eq!(&init_id, b"01");
                assert_eq!(hop, 7);
            }
            other => panic!("expected Init, got {:?}", other),
        }
        // A '0' at byte 8 of a 13-byte header is not INIT.
        assert_eq!(
            Packet::parse(b"000hFFFF02100"),
            Err(ParseError::TypeMismatch(b'0'))
        );
    }

    #[test]
    fn test_broadcast_roundtrip() {
        let pkt = Packet::Broadcast {
            src: *b"000h",
            dst: crate::types::BROADCAST_ID,
            hash: 0x28B2,
        };
        let wire = pkt.encode();
        assert_eq!(wire, b"000hFFFF128B2");
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn test_targeted_roundtrip() {
        let pkt = Packet::Targeted {
            src: *b"000h",
            dst: *b"102a",
            hash: 0x000A,
        };
        let wire = pkt.encode();
        assert_eq!(wire, b"000h102a2000A");
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn test_sos_roundtrip() {
        let pkt = Packet::Sos {
            src: *b"102a",
            dst: *b"000h",
            hop: 4,
        };
        let wire = pkt.encode();
        assert_eq!(wire, b"102a000h304");
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn test_message_roundtrip() {
        let pkt = Packet::Message {
            src: *b"203b",
            dst: *b"000h",
            hash: 0xBEEF,
            hop: 12,
        };
        let wire = pkt.encode();
        assert_eq!(wire, b"203b000h4BEEF12");
        assert_eq!(Packet::parse(&wire).unwrap(), pkt);
    }

    #[test]
    fn test_lowercase_hash_accepted_uppercase_emitted() {
        let pkt = Packet::parse(b"000hFFFF1beef").unwrap();
        assert_eq!(
            pkt,
            Packet::Broadcast {
                src: *b"000h",
                dst: *b"FFFF",
                hash: 0xBEEF,
            }
        );
        assert_eq!(pkt.encode(), b"000hFFFF1BEEF");
    }

    #[test]
    fn test_rejects_unknown_lengths() {
        assert_eq!(Packet::parse(b""), Err(ParseError::UnknownLength(0)));
        assert_eq!(Packet::parse(b"000h0100"), Err(ParseError::UnknownLength(8)));
        assert_eq!(
            Packet::parse(b"000hFFFF128B2X"),
            Err(ParseError::UnknownLength(14))
        );
        assert_eq!(
            Packet::parse(b"000hFFFF128B2XYZ"),
            Err(ParseError::UnknownLength(16))
        );
    }

    #[test]
    fn test_rejects_wrong_type_for_length() {
        // 11-byte header must carry '3'.
        assert_eq!(
            Packet::parse(b"102a000h104"),
            Err(ParseError::TypeMismatch(b'1'))
        );
        // 15-byte header must carry '4'.
        assert_eq!(
            Packet::parse(b"203b000h1BEEF12"),
            Err(ParseError::TypeMismatch(b'1'))
        );
    }

    #[test]
    fn test_rejects_bad_fields() {
        assert_eq!(Packet::parse(b"000h01XY0"), Err(ParseError::BadHop));
        assert_eq!(Packet::parse(b"000hFFFF1WXYZ"), Err(ParseError::BadHash));
        assert_eq!(Packet::parse(b"00 h01000"), Err(ParseError::BadId));
    }
}
