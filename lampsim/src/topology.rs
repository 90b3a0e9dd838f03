//! Network topology and link properties.
//!
//! Infrared range is short and directional in reality; the simulator models
//! reachability as an undirected graph and delivers each burst once per
//! neighbor (the four directional copies carry identical bytes).

use hashbrown::HashMap;
use lampmesh::{Duration, LampId};

/// Properties of a link between two lamps.
#[derive(Debug, Clone)]
pub struct Link {
    /// Packet loss rate (0.0 to 1.0), applied per burst.
    pub loss_rate: f64,
    /// Propagation plus decode delay before the receiver sees the bytes.
    pub delay: Duration,
    /// Whether the link is currently active.
    pub active: bool,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            delay: Duration::from_millis(5),
            active: true,
        }
    }
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Connectivity between lamps. Links are bidirectional.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    links: HashMap<(LampId, LampId), Link>,
}

impl Topology {
    pub fn new() -> Self {
        Self {
            links: HashMap::new(),
        }
    }

    /// Chain: each node sees only its predecessor and successor.
    pub fn chain(nodes: &[LampId]) -> Self {
        let mut topo = Self::new();
        for pair in nodes.windows(2) {
            topo.add_link(pair[0], pair[1], Link::default());
        }
        topo
    }

    /// Star: the first node sees everyone, the rest see only the hub.
    pub fn star(nodes: &[LampId]) -> Self {
        let mut topo = Self::new();
        if let Some((&hub, spokes)) = nodes.split_first() {
            for &spoke in spokes {
                topo.add_link(hub, spoke, Link::default());
            }
        }
        topo
    }

    /// Every pair in range of each other.
    pub fn fully_connected(nodes: &[LampId]) -> Self {
        let mut topo = Self::new();
        for (i, &a) in nodes.iter().enumerate() {
            for &b in nodes.iter().skip(i + 1) {
                topo.add_link(a, b, Link::default());
            }
        }
        topo
    }

    /// Street grid: nodes laid out row-major in `cols` columns, each linked
    /// to its right and down neighbors.
    pub fn grid(nodes: &[LampId], cols: usize) -> Self {
        let mut topo = Self::new();
        if cols == 0 {
            return topo;
        }
        for (i, &node) in nodes.iter().enumerate() {
            if (i + 1) % cols != 0 {
                if let Some(&right) = nodes.get(i + 1) {
                    topo.add_link(node, right, Link::default());
                }
            }
            if let Some(&down) = nodes.get(i + cols) {
                topo.add_link(node, down, Link::default());
            }
        }
        topo
    }

    /// Add a bidirectional link.
    pub fn add_link(&mut self, a: LampId, b: LampId, link: Link) {
        self.links.insert(Self::canonical_pair(a, b), link);
    }

    pub fn get_link(&self, a: LampId, b: LampId) -> Option<&Link> {
        self.links.get(&Self::canonical_pair(a, b))
    }

    pub fn get_link_mut(&mut self, a: LampId, b: LampId) -> Option<&mut Link> {
        self.links.get_mut(&Self::canonical_pair(a, b))
    }

    /// Link exists and is active.
    pub fn is_connected(&self, a: LampId, b: LampId) -> bool {
        self.get_link(a, b).is_some_and(|l| l.active)
    }

    /// Reachable neighbors, sorted for deterministic iteration.
    pub fn neighbors(&self, node: LampId) -> Vec<LampId> {
        let mut result = Vec::new();
        for (&(a, b), link) in &self.links {
            if link.active {
                if a == node {
                    result.push(b);
                } else if b == node {
                    result.push(a);
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Set loss rate on every link.
    pub fn set_global_loss_rate(&mut self, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        for link in self.links.values_mut() {
            link.loss_rate = rate;
        }
    }

    fn canonical_pair(a: LampId, b: LampId) -> (LampId, LampId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
