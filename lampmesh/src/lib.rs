//! lampmesh - Flood-routed infrared mesh for street-lamp networks
//!
//! A field of lamps relays short ASCII packets through four directional
//! infrared emitters and one shared receiver, coordinated by a single
//! headquarters node. There are no links, no neighbor tables and no
//! acknowledgements: reliability comes from controlled flooding,
//! source-plus-hash deduplication, timed retransmission, and a
//! distance-to-HQ gradient that suppresses back-flow.
//!
//! # Key Properties
//!
//! - Five packet kinds (INIT, BROADCAST, TARGETED, SOS, MESSAGE) with
//!   fixed-width ASCII headers and space-terminated framing
//! - A bounded (src, hash) ring breaks flood loops
//! - INIT waves build a hop gradient; SOS and MESSAGE climb it toward HQ
//! - Blind retransmission inside a fixed redundancy window replaces ACKs
//! - Single-threaded cooperative loop; transmission blocks while the
//!   shared-channel receiver is gated off
//!
//! # Example
//!
//! ```no_run
//! use lampmesh::{IrLink, Clock, Delay, LampConfig, Node};
//!
//! // Implement IrLink/Clock/Delay for your hardware...
//!
//! // let mut node = Node::<_, _, _, LampConfig>::new(link, clock, delay, *b"102a", *b"000h");
//! // loop {
//! //     while let Some(event) = node.poll() {
//! //         // drive the lamp light, status LED, or host port
//! //     }
//! // }
//! ```
//!
//! # Module Structure
//!
//! - [`types`] - Core types and protocol constants
//! - [`time`] - Explicit timestamp/duration types
//! - [`hash`] - Content hash and field codecs
//! - [`wire`] - Packet model and header codecs
//! - [`cache`] - Deduplication ring
//! - [`gradient`] - Distance-to-HQ state
//! - [`rx`] - Segment and packet reassembly
//! - [`retransmit`] - Timed redundancy queue
//! - [`tx`] - Four-direction emission bursts
//! - [`traits`] - IrLink, Clock, Delay platform seams
//! - [`config`] - Compile-time tuning (lamp vs HQ)
//! - [`node`] - The engine driven by `poll()`
//! - [`bridge`] - HQ host command channel
//! - [`debug`] - Typed protocol trace events

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bridge;
pub mod cache;
pub mod config;
pub mod debug;
pub mod gradient;
pub mod hash;
pub mod node;
pub mod retransmit;
pub mod rx;
pub mod time;
pub mod traits;
pub mod tx;
pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use config::{HqConfig, LampConfig, MeshConfig};
pub use debug::DebugEvent;
pub use node::Node;
pub use time::{Duration, Timestamp};
pub use traits::{Clock, Delay, IrLink};
pub use types::{
    Blink, Direction, Error, Event, LampId, Payload, BROADCAST_ID, INITIAL_HOP, MAX_MESSAGE_LEN,
};
pub use wire::{Packet, ParseError};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::test_impls::{MockDelay, MockLink, SharedClock};

    #[test]
    fn test_lamp_node_creation() {
        let node: Node<_, _, _, LampConfig> = Node::new(
            MockLink::new(),
            SharedClock::new(),
            MockDelay::new(),
            *b"102a",
            *b"000h",
        );

        assert!(!node.is_hq());
        assert_eq!(node.hop(), INITIAL_HOP);
        assert_eq!(node.last_init_id(), None);
    }

    #[test]
    fn test_hq_node_creation() {
        let node: Node<_, _, _, HqConfig> = Node::new(
            MockLink::new(),
            SharedClock::new(),
            MockDelay::new(),
            *b"000h",
            *b"000h",
        );

        assert!(node.is_hq());
        assert_eq!(node.hop(), 0);
    }

    #[test]
    fn test_packet_roundtrip() {
        let packet = Packet::Sos {
            src: *b"102a",
            dst: *b"000h",
            hop: 7,
        };
        let wire = packet.encode();
        assert_eq!(Packet::parse(&wire).unwrap(), packet);
    }
}
