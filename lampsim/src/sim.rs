//! Deterministic simulator for lampmesh fields.
//!
//! Time advances in fixed polling ticks (the cooperative loop of each node)
//! interleaved with an event queue ordered by `(time, seq)`. Every source of
//! nondeterminism is seeded: node iteration follows creation order, neighbor
//! lists are sorted, and link loss draws from a seeded LCG.

use std::collections::BinaryHeap;

use hashbrown::HashMap;
use lampmesh::bridge;
use lampmesh::types::{TYPE_MESSAGE, TYPE_SOS};
use lampmesh::{Duration, Event as NodeEvent, LampId, Timestamp};

use crate::event::{Event, ScenarioAction, ScheduledEvent};
use crate::metrics::{HopSnapshot, SimMetrics};
use crate::node::{SimClock, SimNode};
use crate::topology::Topology;

/// Default polling cadence of every simulated node's main loop.
const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Discrete simulator over a set of lamps and one HQ.
pub struct Simulator {
    nodes: HashMap<LampId, SimNode>,
    /// Creation order, used for deterministic per-tick polling.
    order: Vec<LampId>,
    topology: Topology,
    current_time: Timestamp,
    queue: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
    clock: SimClock,
    metrics: SimMetrics,
    rng_state: u64,
    tick: Duration,
    hq_id: Option<LampId>,
    host_replies: Vec<String>,
    host_events: Vec<String>,
    node_events: HashMap<LampId, Vec<NodeEvent>>,
}

impl Simulator {
    /// Create a simulator with the given loss-draw seed.
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            topology: Topology::new(),
            current_time: Timestamp::ZERO,
            queue: BinaryHeap::new(),
            next_seq: 0,
            clock: SimClock::new(),
            metrics: SimMetrics::new(),
            rng_state: seed,
            tick: DEFAULT_TICK,
            hq_id: None,
            host_replies: Vec::new(),
            host_events: Vec::new(),
            node_events: HashMap::new(),
        }
    }

    /// Set the network topology.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Add the headquarters node.
    pub fn add_hq(&mut self, id: LampId) {
        self.nodes.insert(id, SimNode::hq(id, self.clock.clone()));
        self.order.push(id);
        self.hq_id = Some(id);
    }

    /// Add a lamp that treats `hq` as its authorized headquarters.
    pub fn add_lamp(&mut self, id: LampId, hq: LampId) {
        self.nodes
            .insert(id, SimNode::lamp(id, hq, self.clock.clone()));
        self.order.push(id);
    }

    pub fn node(&self, id: &LampId) -> Option<&SimNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &LampId) -> Option<&mut SimNode> {
        self.nodes.get_mut(id)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Replies HQ wrote back on the host port.
    pub fn host_replies(&self) -> &[String] {
        &self.host_replies
    }

    /// Event lines HQ emitted toward the host (`<src> <type> <message>`).
    pub fn host_events(&self) -> &[String] {
        &self.host_events
    }

    /// Drain the engine events a node produced so far.
    pub fn take_events(&mut self, id: &LampId) -> Vec<NodeEvent> {
        self.node_events.remove(id).unwrap_or_default()
    }

    /// Snapshot every node's hop distance.
    pub fn hops(&self) -> HopSnapshot {
        let mut snap = HopSnapshot::new();
        for (&id, node) in &self.nodes {
            snap.record(id, node.hop());
        }
        snap
    }

    /// Queue a host command line for HQ.
    pub fn send_host_command(&mut self, at: Timestamp, line: &[u8]) {
        self.schedule(at, Event::HostCommand {
            line: line.to_vec(),
        });
    }

    /// Queue an SOS button press on a lamp.
    pub fn press_sos(&mut self, at: Timestamp, node: LampId) {
        self.schedule(at, Event::PressSos { node });
    }

    /// Queue a lamp telemetry MESSAGE toward HQ.
    pub fn send_telemetry(&mut self, at: Timestamp, node: LampId, message: &[u8]) {
        self.schedule(at, Event::Telemetry {
            node,
            message: message.to_vec(),
        });
    }

    /// Queue a scenario action.
    pub fn schedule_action(&mut self, at: Timestamp, action: ScenarioAction) {
        self.schedule(at, Event::Action(action));
    }

    fn schedule(&mut self, time: Timestamp, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent { time, seq, event });
    }

    /// Advance the simulation.
    pub fn run_for(&mut self, duration: Duration) {
        let end = self.current_time + duration;
        while self.current_time < end {
            let mut boundary = self.current_time + self.tick;
            if end < boundary {
                boundary = end;
            }

            while let Some(scheduled) = self.pop_due(boundary) {
                if self.current_time < scheduled.time {
                    self.current_time = scheduled.time;
                }
                self.clock.set(self.current_time);
                self.dispatch(scheduled.event);
            }

            self.current_time = boundary;
            self.clock.set(boundary);
            let order = self.order.clone();
            for id in order {
                self.pump_node(id);
            }
        }
    }

    fn pop_due(&mut self, bound: Timestamp) -> Option<ScheduledEvent> {
        if self.queue.peek().is_some_and(|e| e.time <= bound) {
            self.queue.pop()
        } else {
            None
        }
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Deliver { to, bytes } => {
                if let Some(node) = self.nodes.get_mut(&to) {
                    node.push_rx(&bytes);
                }
            }
            Event::PressSos { node } => {
                if let Some(sim_node) = self.nodes.get_mut(&node) {
                    // A press inside the cooldown is silently dropped.
                    let _ = sim_node.press_sos();
                }
                self.pump_node(node);
            }
            Event::Telemetry { node, message } => {
                let Some(hq) = self.hq_id else { return };
                if let Some(sim_node) = self.nodes.get_mut(&node) {
                    let _ = sim_node.send_message(hq, &message);
                }
                self.pump_node(node);
            }
            Event::HostCommand { line } => {
                let Some(hq) = self.hq_id else { return };
                if let Some(node) = self.nodes.get_mut(&hq) {
                    let reply = node.handle_host_command(&line);
                    self.host_replies.push(reply.to_string());
                }
                self.pump_node(hq);
            }
            Event::Action(action) => self.apply_action(action),
        }
    }

    fn apply_action(&mut self, action: ScenarioAction) {
        match action {
            ScenarioAction::DisableLink { a, b } => {
                if let Some(link) = self.topology.get_link_mut(a, b) {
                    link.active = false;
                }
            }
            ScenarioAction::EnableLink { a, b } => {
                if let Some(link) = self.topology.get_link_mut(a, b) {
                    link.active = true;
                }
            }
            ScenarioAction::SetGlobalLossRate { rate } => {
                self.topology.set_global_loss_rate(rate);
            }
        }
    }

    /// Poll a node to quiescence, collect its events, route its output.
    fn pump_node(&mut self, id: LampId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let events = node.pump();
        if !events.is_empty() {
            if Some(id) == self.hq_id {
                for event in &events {
                    match event {
                        NodeEvent::SosAlert { src, .. } => {
                            self.host_events
                                .push(bridge::event_line(src, TYPE_SOS, bridge::SOS_BODY));
                        }
                        NodeEvent::MessageDelivered { src, message, .. } => {
                            self.host_events
                                .push(bridge::event_line(src, TYPE_MESSAGE, message));
                        }
                        _ => {}
                    }
                }
            }
            self.node_events.entry(id).or_default().extend(events);
        }
        self.route_tx(id);
    }

    /// Deliver whatever a node just transmitted to each reachable neighbor.
    fn route_tx(&mut self, id: LampId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let Some(bytes) = node.take_tx() else {
            return;
        };
        self.metrics.transmissions += 1;

        let neighbors = self.topology.neighbors(id);
        for neighbor in neighbors {
            let Some(link) = self.topology.get_link(id, neighbor) else {
                continue;
            };
            let (loss_rate, delay) = (link.loss_rate, link.delay);
            if loss_rate > 0.0 && self.next_unit() < loss_rate {
                self.metrics.losses += 1;
                continue;
            }
            self.metrics.deliveries += 1;
            let at = self.current_time + delay;
            self.schedule(at, Event::Deliver {
                to: neighbor,
                bytes: bytes.clone(),
            });
        }
    }

    /// Seeded LCG draw in [0, 1).
    fn next_unit(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.rng_state >> 33) & 0x7FFF_FFFF) as f64 / (1u64 << 31) as f64
    }
}
