//! The protocol engine: one street lamp (or HQ) on the mesh.
//!
//! `Node` owns every piece of process-lifetime state (dedup cache, gradient,
//! retransmit queue, reassemblers, LiFi rebroadcast state) and is driven by
//! a single-threaded cooperative loop:
//!
//! ```ignore
//! let mut node = Node::<_, _, _, LampConfig>::new(link, clock, delay, *b"102a", *b"000h");
//! loop {
//!     while let Some(event) = node.poll() {
//!         // drive the lamp light, status LED, or host port
//!     }
//! }
//! ```
//!
//! Each `poll` drains the receiver, pumps the retransmit queue and the LiFi
//! rebroadcast schedule, and hands back at most one application event.
//! Transmission is blocking by design: the receiver shares the IR channel
//! and is stopped for the duration of a burst.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::bridge::{self, CommandError, HostCommand, REPLY_OK};
use crate::cache::DedupCache;
use crate::config::{LampConfig, MeshConfig};
use crate::debug::{DebugEvent, DEBUG_RING_CAPACITY};
use crate::gradient::{decrement_hop, within_gradient, Gradient, GradientUpdate};
use crate::hash::content_hash;
use crate::retransmit::RetransmitQueue;
use crate::rx::{PacketAssembler, SegmentAssembler, SegmentDisposition};
use crate::time::Timestamp;
use crate::traits::{Clock, Delay, IrLink};
use crate::tx::transmit_burst;
use crate::types::{
    Blink, Error, Event, LampId, Payload, BROADCAST_ID, MAX_HOP, MAX_MESSAGE_LEN, SEGMENT_TIMEOUT,
    SENTINEL_HASH, TYPE_INIT,
};
use crate::wire::Packet;

/// The protocol node.
///
/// Generic over:
/// - `L`: infrared driver
/// - `Clk`: time source
/// - `D`: blocking delay used inside TX bursts
/// - `Cfg`: protocol configuration (defaults to [`LampConfig`])
///
/// A node is HQ exactly when its own id appears in the authorized-HQ list.
pub struct Node<L, Clk, D, Cfg: MeshConfig = LampConfig> {
    // Dependencies (injected)
    link: L,
    clock: Clk,
    delay: D,

    _config: PhantomData<Cfg>,

    // Identity
    id: LampId,
    authorized_hq: Vec<LampId>,

    // Protocol state
    cache: DedupCache,
    gradient: Gradient,
    retransmits: RetransmitQueue,
    segments: SegmentAssembler,
    packets: PacketAssembler,

    // LiFi downlink state
    latest_lifi: Option<Payload>,
    last_lifi_at: Timestamp,

    // SOS debounce
    last_sos: Option<Timestamp>,

    // Outputs
    events: VecDeque<Event>,
    debug_ring: VecDeque<DebugEvent>,
}

impl<L, Clk, D, Cfg> Node<L, Clk, D, Cfg>
where
    L: IrLink,
    Clk: Clock,
    D: Delay,
    Cfg: MeshConfig,
{
    /// Create a node. `primary_hq` is the id SOS and telemetry route toward;
    /// a node whose own id equals an authorized HQ id takes the HQ role.
    pub fn new(link: L, clock: Clk, delay: D, id: LampId, primary_hq: LampId) -> Self {
        let mut authorized_hq = Vec::with_capacity(1);
        authorized_hq.push(primary_hq);
        Self {
            link,
            clock,
            delay,
            _config: PhantomData,
            id,
            authorized_hq,
            cache: DedupCache::new(Cfg::CACHE_SIZE),
            gradient: Gradient::new(),
            retransmits: RetransmitQueue::new(Cfg::RETRANSMIT_SLOTS),
            segments: SegmentAssembler::new(),
            packets: PacketAssembler::new(),
            latest_lifi: None,
            last_lifi_at: Timestamp::ZERO,
            last_sos: None,
            events: VecDeque::new(),
            debug_ring: VecDeque::new(),
        }
    }

    /// Honor control traffic from an additional HQ id.
    pub fn add_authorized_hq(&mut self, hq: LampId) {
        if !self.authorized_hq.contains(&hq) {
            self.authorized_hq.push(hq);
        }
    }

    /// This node's id.
    pub fn id(&self) -> LampId {
        self.id
    }

    /// True when this node is an authorized headquarters.
    pub fn is_hq(&self) -> bool {
        self.authorized_hq.contains(&self.id)
    }

    /// Current distance to HQ. HQ always reports 0.
    pub fn hop(&self) -> u8 {
        if self.is_hq() {
            0
        } else {
            self.gradient.hop()
        }
    }

    /// Epoch id of the last survey wave observed.
    pub fn last_init_id(&self) -> Option<[u8; 2]> {
        self.gradient.last_init_id()
    }

    /// The message currently held for LiFi rebroadcast.
    pub fn lifi_message(&self) -> Option<&[u8]> {
        self.latest_lifi.as_deref()
    }

    /// Access the infrared driver (simulation and test harnesses).
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Drain the protocol trace.
    pub fn take_debug_events(&mut self) -> Vec<DebugEvent> {
        self.debug_ring.drain(..).collect()
    }

    /// One loop iteration: drain the receiver, pump timers, return at most
    /// one application event.
    pub fn poll(&mut self) -> Option<Event> {
        let now = self.clock.now();

        if self.segments.expire(now, SEGMENT_TIMEOUT) {
            self.trace(DebugEvent::SegmentTimeout);
        }
        if self.packets.expire(now, Cfg::IR_MESSAGE_TIMEOUT) {
            self.trace(DebugEvent::HeaderTimeout);
        }

        while let Some(byte) = self.link.poll_byte() {
            if let Some(segment) = self.segments.push_byte(byte, now) {
                match self.packets.on_segment(segment, now) {
                    SegmentDisposition::Held => {}
                    SegmentDisposition::Discarded { len } => {
                        self.trace(DebugEvent::SegmentDiscarded { len });
                    }
                    SegmentDisposition::Complete {
                        header,
                        message,
                        dropped_pending,
                    } => {
                        if dropped_pending {
                            self.trace(DebugEvent::SegmentLost);
                        }
                        self.process_packet(&header, message, now);
                    }
                }
            }
        }

        self.pump_retransmits(now);
        self.pump_lifi(now);

        self.events.pop_front()
    }

    // ---- origination ------------------------------------------------------

    /// HQ: start a gradient survey wave with a fresh 2-char epoch id.
    pub fn start_survey(&mut self, epoch: [u8; 2]) -> Result<(), Error> {
        if !self.is_hq() {
            return Err(Error::NotHq);
        }
        let now = self.clock.now();
        let header = Packet::Init {
            src: self.id,
            init_id: epoch,
            hop: 0,
        }
        .encode();
        self.emit_and_track(header, None, now);
        Ok(())
    }

    /// HQ: announce to every lamp's LiFi downlink.
    pub fn send_broadcast(&mut self, dst: LampId, message: &[u8]) -> Result<(), Error> {
        if !self.is_hq() {
            return Err(Error::NotHq);
        }
        let hash = self.prepare_content(message)?;
        let now = self.clock.now();
        let header = Packet::Broadcast {
            src: self.id,
            dst,
            hash,
        }
        .encode();
        self.emit_and_track(header, Some(message.to_vec()), now);
        Ok(())
    }

    /// HQ: announce to one lamp's LiFi downlink.
    pub fn send_targeted(&mut self, dst: LampId, message: &[u8]) -> Result<(), Error> {
        if !self.is_hq() {
            return Err(Error::NotHq);
        }
        let hash = self.prepare_content(message)?;
        let now = self.clock.now();
        let header = Packet::Targeted {
            src: self.id,
            dst,
            hash,
        }
        .encode();
        self.emit_and_track(header, Some(message.to_vec()), now);
        Ok(())
    }

    /// Originate a MESSAGE packet. Lamps address their telemetry to HQ and
    /// stamp their own hop; HQ stamps 00.
    pub fn send_message(&mut self, dst: LampId, message: &[u8]) -> Result<(), Error> {
        let hash = self.prepare_content(message)?;
        let now = self.clock.now();
        let header = Packet::Message {
            src: self.id,
            dst,
            hash,
            hop: self.hop(),
        }
        .encode();
        self.emit_and_track(header, Some(message.to_vec()), now);
        Ok(())
    }

    /// Lamp: debounced SOS button press.
    pub fn press_sos(&mut self) -> Result<(), Error> {
        if self.is_hq() {
            return Err(Error::NotLamp);
        }
        let now = self.clock.now();
        if let Some(last) = self.last_sos {
            if now.saturating_since(last) < Cfg::SOS_COOLDOWN {
                self.trace(DebugEvent::SosCooldownDropped);
                return Err(Error::SosCooldown);
            }
        }
        self.last_sos = Some(now);
        // Own pair goes in first so the flood cannot rebound through us.
        self.cache.check_and_insert(self.id, SENTINEL_HASH);
        let header = Packet::Sos {
            src: self.id,
            dst: self.authorized_hq[0],
            hop: self.hop(),
        }
        .encode();
        self.events.push_back(Event::Indicator(Blink::Sos));
        self.emit_and_track(header, None, now);
        Ok(())
    }

    /// HQ: handle one host command line, returning the reply line.
    pub fn handle_host_command(&mut self, line: &[u8]) -> &'static str {
        if !self.is_hq() {
            return CommandError::Field.reply();
        }
        let outcome = match bridge::parse_command(line) {
            Err(e) => return e.reply(),
            Ok(HostCommand::Init { epoch }) => self.start_survey(epoch),
            Ok(HostCommand::Broadcast { dst, message }) => self.send_broadcast(dst, &message),
            Ok(HostCommand::Targeted { dst, message }) => self.send_targeted(dst, &message),
            Ok(HostCommand::Message { dst, message }) => self.send_message(dst, &message),
        };
        match outcome {
            Ok(()) => REPLY_OK,
            Err(_) => CommandError::Field.reply(),
        }
    }

    // ---- forwarding -------------------------------------------------------

    fn process_packet(&mut self, header: &[u8], message: Option<Payload>, now: Timestamp) {
        let packet = match Packet::parse(header) {
            Ok(p) => p,
            Err(_) => {
                self.trace(DebugEvent::HeaderRejected);
                return;
            }
        };
        match packet {
            Packet::Init { src, init_id, hop } => self.handle_init(src, init_id, hop, now),
            Packet::Sos { src, dst, hop } => self.handle_sos(src, dst, hop, now),
            Packet::Broadcast { src, dst, hash } => {
                self.handle_announcement(false, src, dst, hash, message.unwrap_or_default(), now)
            }
            Packet::Targeted { src, dst, hash } => {
                self.handle_announcement(true, src, dst, hash, message.unwrap_or_default(), now)
            }
            Packet::Message {
                src,
                dst,
                hash,
                hop,
            } => self.handle_message(src, dst, hash, hop, message.unwrap_or_default(), now),
        }
    }

    fn handle_init(&mut self, src: LampId, init_id: [u8; 2], hop: u8, now: Timestamp) {
        if self.is_hq() {
            // HQ originates survey waves; an echo carries no information.
            return;
        }
        match self.gradient.on_init(init_id, hop) {
            GradientUpdate::Improved { from, to } => {
                self.trace(DebugEvent::GradientImproved { from, to });
            }
            GradientUpdate::EpochReset { to } => {
                self.trace(DebugEvent::GradientEpochReset { init_id, hop: to });
            }
            GradientUpdate::Unchanged => {}
        }
        if self.cache.check_and_insert(src, SENTINEL_HASH) {
            // Spread outward: the re-emitted wave is one hop farther out.
            let header = Packet::Init {
                src,
                init_id,
                hop: hop.saturating_add(1).min(MAX_HOP),
            }
            .encode();
            self.emit_and_track(header, None, now);
            self.trace(DebugEvent::Forwarded { type_byte: TYPE_INIT });
        } else {
            self.trace(DebugEvent::DuplicateDropped {
                src,
                hash: SENTINEL_HASH,
            });
        }
    }

    fn handle_sos(&mut self, src: LampId, dst: LampId, msg_hop: u8, now: Timestamp) {
        let my_hop = self.hop();
        if !within_gradient(my_hop, msg_hop, Cfg::GRADIENT_TOLERANCE) {
            self.trace(DebugEvent::GradientSuppressed { my_hop, msg_hop });
            return;
        }
        if !self.cache.check_and_insert(src, SENTINEL_HASH) {
            self.trace(DebugEvent::DuplicateDropped {
                src,
                hash: SENTINEL_HASH,
            });
            return;
        }
        let packet = Packet::Sos {
            src,
            dst,
            hop: decrement_hop(msg_hop),
        };
        let type_byte = packet.type_byte();
        self.emit_and_track(packet.encode(), None, now);
        self.trace(DebugEvent::Forwarded { type_byte });
        self.events.push_back(Event::Indicator(Blink::Forward));

        if self.is_hq() && dst == self.id {
            self.events.push_back(Event::SosAlert { src, hops: msg_hop });
            self.events.push_back(Event::Indicator(Blink::Delivery));
        }
    }

    /// BROADCAST and TARGETED: no gradient check, header re-emitted
    /// unchanged; the destination decides only who drives LiFi.
    fn handle_announcement(
        &mut self,
        targeted: bool,
        src: LampId,
        dst: LampId,
        claimed: u16,
        message: Payload,
        now: Timestamp,
    ) {
        let computed = content_hash(&message);
        if computed != claimed {
            self.trace(DebugEvent::HashMismatch {
                src,
                expected: claimed,
                got: computed,
            });
            return;
        }
        if !self.cache.check_and_insert(src, claimed) {
            self.trace(DebugEvent::DuplicateDropped { src, hash: claimed });
            return;
        }

        let packet = if targeted {
            Packet::Targeted {
                src,
                dst,
                hash: claimed,
            }
        } else {
            Packet::Broadcast {
                src,
                dst,
                hash: claimed,
            }
        };
        let type_byte = packet.type_byte();
        self.emit_and_track(packet.encode(), Some(message.clone()), now);
        self.trace(DebugEvent::Forwarded { type_byte });
        self.events.push_back(Event::Indicator(Blink::Forward));

        // Delivery is a separate decision from forwarding.
        let for_me = if targeted {
            dst == self.id
        } else {
            dst == BROADCAST_ID
        };
        if !self.is_hq() && self.is_authorized_hq(src) && for_me {
            self.deliver_lifi(message, now);
        }
    }

    /// MESSAGE: gradient-routed toward HQ like SOS, but content-carrying.
    fn handle_message(
        &mut self,
        src: LampId,
        dst: LampId,
        claimed: u16,
        msg_hop: u8,
        message: Payload,
        now: Timestamp,
    ) {
        let computed = content_hash(&message);
        if computed != claimed {
            self.trace(DebugEvent::HashMismatch {
                src,
                expected: claimed,
                got: computed,
            });
            return;
        }
        let my_hop = self.hop();
        if !within_gradient(my_hop, msg_hop, Cfg::GRADIENT_TOLERANCE) {
            self.trace(DebugEvent::GradientSuppressed { my_hop, msg_hop });
            return;
        }
        if !self.cache.check_and_insert(src, claimed) {
            self.trace(DebugEvent::DuplicateDropped { src, hash: claimed });
            return;
        }

        let packet = Packet::Message {
            src,
            dst,
            hash: claimed,
            hop: decrement_hop(msg_hop),
        };
        let type_byte = packet.type_byte();
        self.emit_and_track(packet.encode(), Some(message.clone()), now);
        self.trace(DebugEvent::Forwarded { type_byte });
        self.events.push_back(Event::Indicator(Blink::Forward));

        if self.is_hq() && dst == self.id {
            self.events.push_back(Event::MessageDelivered {
                src,
                message,
                hops: msg_hop,
            });
            self.events.push_back(Event::Indicator(Blink::Delivery));
        }
    }

    fn deliver_lifi(&mut self, message: Payload, now: Timestamp) {
        self.latest_lifi = Some(message.clone());
        self.last_lifi_at = now;
        self.events.push_back(Event::LifiTransmit { message });
    }

    // ---- pumps ------------------------------------------------------------

    fn pump_retransmits(&mut self, now: Timestamp) {
        let due = self.retransmits.pump(
            now,
            Cfg::RETRANSMIT_INTERVAL,
            Cfg::REDUNDANCY_WINDOW,
            Cfg::RETRANSMIT_COUNT,
        );
        for entry in due {
            // Raw path: a retry is never re-enqueued.
            transmit_burst(
                &mut self.link,
                &mut self.delay,
                Cfg::IR_DIRECTION_GAP,
                &entry.header,
                entry.message.as_deref(),
            );
            self.trace(DebugEvent::RetransmitFired {
                emission: entry.emission,
            });
        }
    }

    fn pump_lifi(&mut self, now: Timestamp) {
        let Some(message) = self.latest_lifi.clone() else {
            return;
        };
        if now.saturating_since(self.last_lifi_at) >= Cfg::LIFI_REBROADCAST_INTERVAL {
            self.last_lifi_at = now;
            self.events.push_back(Event::LifiTransmit { message });
            self.trace(DebugEvent::LifiRebroadcast);
        }
    }

    // ---- helpers ----------------------------------------------------------

    fn is_authorized_hq(&self, src: LampId) -> bool {
        self.authorized_hq.contains(&src)
    }

    /// Hash and cache-prime an outgoing message so the node's own flood
    /// cannot come back through it.
    fn prepare_content(&mut self, message: &[u8]) -> Result<u16, Error> {
        if message.len() > MAX_MESSAGE_LEN {
            return Err(Error::MessageTooLong);
        }
        let hash = content_hash(message);
        self.cache.check_and_insert(self.id, hash);
        Ok(hash)
    }

    /// First transmission plus redundancy tracking.
    fn emit_and_track(&mut self, header: Vec<u8>, message: Option<Payload>, now: Timestamp) {
        transmit_burst(
            &mut self.link,
            &mut self.delay,
            Cfg::IR_DIRECTION_GAP,
            &header,
            message.as_deref(),
        );
        if self.retransmits.enqueue(header, message, now) {
            self.trace(DebugEvent::RetransmitQueued);
        } else {
            self.trace(DebugEvent::RetransmitQueueFull);
        }
    }

    fn trace(&mut self, event: DebugEvent) {
        if self.debug_ring.len() == DEBUG_RING_CAPACITY {
            self.debug_ring.pop_front();
        }
        self.debug_ring.push_back(event);
    }
}
