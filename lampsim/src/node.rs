//! Simulated nodes: engine instances behind captured-queue trait impls.

use std::cell::Cell;
use std::rc::Rc;
use std::collections::VecDeque;

use lampmesh::traits::{Clock, Delay, IrLink};
use lampmesh::{
    DebugEvent, Direction, Duration, Error, Event, LampId, MeshConfig, Node, Timestamp,
};

/// Simulation config for lamps: deployment timing with the short test-rig
/// SOS cooldown so scenarios stay fast.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimLampConfig;

impl MeshConfig for SimLampConfig {
    const CACHE_SIZE: usize = 3;
    const RETRANSMIT_SLOTS: usize = 3;
    const RETRANSMIT_COUNT: u8 = 2;
    const RETRANSMIT_INTERVAL: Duration = Duration::from_secs(10);
    const REDUNDANCY_WINDOW: Duration = Duration::from_secs(60);
    const GRADIENT_TOLERANCE: u8 = 1;
    const IR_DIRECTION_GAP: Duration = Duration::from_millis(100);
    const IR_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);
    const LIFI_REBROADCAST_INTERVAL: Duration = Duration::from_secs(60);
    const SOS_COOLDOWN: Duration = Duration::from_secs(10);
}

/// Simulation config for HQ: the larger dedup ring.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimHqConfig;

impl MeshConfig for SimHqConfig {
    const CACHE_SIZE: usize = 8;
    const RETRANSMIT_SLOTS: usize = 3;
    const RETRANSMIT_COUNT: u8 = 2;
    const RETRANSMIT_INTERVAL: Duration = Duration::from_secs(10);
    const REDUNDANCY_WINDOW: Duration = Duration::from_secs(60);
    const GRADIENT_TOLERANCE: u8 = 1;
    const IR_DIRECTION_GAP: Duration = Duration::from_millis(100);
    const IR_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);
    const LIFI_REBROADCAST_INTERVAL: Duration = Duration::from_secs(60);
    const SOS_COOLDOWN: Duration = Duration::from_secs(10);
}

/// Clock shared between the simulator and every node it owns.
#[derive(Clone, Default)]
pub struct SimClock(Rc<Cell<u64>>);

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, t: Timestamp) {
        self.0.set(t.as_millis());
    }
}

impl Clock for SimClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.0.get())
    }
}

/// Bursts are instantaneous in simulated time; char pacing is covered by
/// the engine's own transmit tests.
pub struct NopDelay;

impl Delay for NopDelay {
    fn delay(&mut self, _d: Duration) {}
}

/// Captured-queue infrared driver.
pub struct SimLink {
    rx: VecDeque<u8>,
    tx: [Vec<u8>; 4],
    receiver_running: bool,
    /// Bytes that arrived while the receiver was gated off (lost on air).
    pub dropped_while_stopped: u64,
}

impl SimLink {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            tx: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
            receiver_running: true,
            dropped_while_stopped: 0,
        }
    }

    /// Deliver a byte run from a neighbor.
    pub fn push_rx(&mut self, bytes: &[u8]) {
        if self.receiver_running {
            self.rx.extend(bytes.iter().copied());
        } else {
            self.dropped_while_stopped += bytes.len() as u64;
        }
    }

    /// Drain everything transmitted since the last call.
    ///
    /// The four directional emitters must carry identical bytes; the
    /// canonical copy is returned once and delivered per neighbor.
    pub fn take_tx(&mut self) -> Option<Vec<u8>> {
        if self.tx.iter().all(|t| t.is_empty()) {
            return None;
        }
        assert!(
            self.tx.iter().all(|t| *t == self.tx[0]),
            "directional emitters diverged"
        );
        let bytes = std::mem::take(&mut self.tx[0]);
        for t in &mut self.tx[1..] {
            t.clear();
        }
        Some(bytes)
    }
}

impl Default for SimLink {
    fn default() -> Self {
        Self::new()
    }
}

impl IrLink for SimLink {
    fn tx_byte(&mut self, dir: Direction, byte: u8) {
        self.tx[dir.index()].push(byte);
    }

    fn poll_byte(&mut self) -> Option<u8> {
        if self.receiver_running {
            self.rx.pop_front()
        } else {
            None
        }
    }

    fn receiver_stop(&mut self) {
        self.receiver_running = false;
    }

    fn receiver_start(&mut self) {
        self.receiver_running = true;
    }
}

type LampNode = Node<SimLink, SimClock, NopDelay, SimLampConfig>;
type HqNode = Node<SimLink, SimClock, NopDelay, SimHqConfig>;

/// One simulated node: a lamp or the headquarters.
pub enum SimNode {
    Lamp(LampNode),
    Hq(HqNode),
}

impl SimNode {
    pub fn lamp(id: LampId, hq: LampId, clock: SimClock) -> Self {
        SimNode::Lamp(Node::new(SimLink::new(), clock, NopDelay, id, hq))
    }

    pub fn hq(id: LampId, clock: SimClock) -> Self {
        SimNode::Hq(Node::new(SimLink::new(), clock, NopDelay, id, id))
    }

    pub fn id(&self) -> LampId {
        match self {
            SimNode::Lamp(n) => n.id(),
            SimNode::Hq(n) => n.id(),
        }
    }

    pub fn is_hq(&self) -> bool {
        matches!(self, SimNode::Hq(_))
    }

    pub fn hop(&self) -> u8 {
        match self {
            SimNode::Lamp(n) => n.hop(),
            SimNode::Hq(n) => n.hop(),
        }
    }

    pub fn last_init_id(&self) -> Option<[u8; 2]> {
        match self {
            SimNode::Lamp(n) => n.last_init_id(),
            SimNode::Hq(n) => n.last_init_id(),
        }
    }

    pub fn lifi_message(&self) -> Option<&[u8]> {
        match self {
            SimNode::Lamp(n) => n.lifi_message(),
            SimNode::Hq(n) => n.lifi_message(),
        }
    }

    /// Run the node's poll loop to quiescence, collecting its events.
    pub fn pump(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        match self {
            SimNode::Lamp(n) => {
                while let Some(e) = n.poll() {
                    events.push(e);
                }
            }
            SimNode::Hq(n) => {
                while let Some(e) = n.poll() {
                    events.push(e);
                }
            }
        }
        events
    }

    pub fn press_sos(&mut self) -> Result<(), Error> {
        match self {
            SimNode::Lamp(n) => n.press_sos(),
            SimNode::Hq(n) => n.press_sos(),
        }
    }

    pub fn send_message(&mut self, dst: LampId, message: &[u8]) -> Result<(), Error> {
        match self {
            SimNode::Lamp(n) => n.send_message(dst, message),
            SimNode::Hq(n) => n.send_message(dst, message),
        }
    }

    pub fn handle_host_command(&mut self, line: &[u8]) -> &'static str {
        match self {
            SimNode::Lamp(n) => n.handle_host_command(line),
            SimNode::Hq(n) => n.handle_host_command(line),
        }
    }

    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.link_mut().push_rx(bytes);
    }

    pub fn take_tx(&mut self) -> Option<Vec<u8>> {
        self.link_mut().take_tx()
    }

    pub fn take_debug_events(&mut self) -> Vec<DebugEvent> {
        match self {
            SimNode::Lamp(n) => n.take_debug_events(),
            SimNode::Hq(n) => n.take_debug_events(),
        }
    }

    fn link_mut(&mut self) -> &mut SimLink {
        match self {
            SimNode::Lamp(n) => n.link_mut(),
            SimNode::Hq(n) => n.link_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_tx_returns_canonical_copy_once() {
        let clock = SimClock::new();
        let mut node = SimNode::hq(*b"000h", clock);
        node.handle_host_command(b"TX|FFFF|0|01");
        let bytes = node.take_tx().unwrap();
        assert_eq!(bytes, b"000h01000 ");
        assert!(node.take_tx().is_none());
    }

    #[test]
    fn test_rx_roundtrip_through_engine() {
        let clock = SimClock::new();
        let mut node = SimNode::lamp(*b"102a", *b"000h", clock);
        node.push_rx(b"000h01000 ");
        node.pump();
        assert_eq!(node.hop(), 1);
        assert_eq!(node.take_tx().unwrap(), b"000h01010 ");
    }
}
