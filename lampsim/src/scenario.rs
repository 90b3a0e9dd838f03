//! Scenario builder for setting up simulated fields.

use lampmesh::LampId;

use crate::sim::Simulator;
use crate::topology::Topology;

/// The headquarters id used by built scenarios.
pub const HQ_ID: LampId = *b"000h";

/// Type of topology to generate over [HQ, lamp 0, lamp 1, ...].
#[derive(Debug, Clone)]
enum TopologyType {
    Chain,
    Star,
    FullyConnected,
    Grid { cols: usize },
    Custom(Topology),
}

/// Builder for simulation scenarios: one HQ plus `num_lamps` lamps.
pub struct ScenarioBuilder {
    num_lamps: usize,
    seed: u64,
    topology_type: Option<TopologyType>,
    loss_rate: f64,
}

impl ScenarioBuilder {
    /// A scenario with the given number of lamps. A topology must be
    /// specified before `build()`.
    pub fn new(num_lamps: usize) -> Self {
        Self {
            num_lamps,
            seed: 42,
            topology_type: None,
            loss_rate: 0.0,
        }
    }

    /// Seed for the loss-draw RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Chain: HQ at one end, lamps strung behind it.
    pub fn chain_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Chain);
        self
    }

    /// Star: HQ is the hub, every lamp a spoke.
    pub fn star_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Star);
        self
    }

    /// Everyone in range of everyone.
    pub fn fully_connected(mut self) -> Self {
        self.topology_type = Some(TopologyType::FullyConnected);
        self
    }

    /// Street grid with `cols` columns; HQ occupies the first cell.
    pub fn grid_topology(mut self, cols: usize) -> Self {
        self.topology_type = Some(TopologyType::Grid { cols });
        self
    }

    /// Provide a custom topology over [`HQ_ID`] and [`lamp_id`] values.
    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology_type = Some(TopologyType::Custom(topology));
        self
    }

    /// Apply a loss rate to every link.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate;
        self
    }

    /// Build the simulator. Returns it together with the lamp ids, in
    /// chain/grid order.
    pub fn build(self) -> (Simulator, Vec<LampId>) {
        let lamps: Vec<LampId> = (0..self.num_lamps).map(lamp_id).collect();
        let mut all = Vec::with_capacity(self.num_lamps + 1);
        all.push(HQ_ID);
        all.extend_from_slice(&lamps);

        let mut topology = match self
            .topology_type
            .expect("scenario requires a topology; use chain_topology() etc.")
        {
            TopologyType::Chain => Topology::chain(&all),
            TopologyType::Star => Topology::star(&all),
            TopologyType::FullyConnected => Topology::fully_connected(&all),
            TopologyType::Grid { cols } => Topology::grid(&all, cols),
            TopologyType::Custom(t) => t,
        };
        if self.loss_rate > 0.0 {
            topology.set_global_loss_rate(self.loss_rate);
        }

        let mut sim = Simulator::new(self.seed).with_topology(topology);
        sim.add_hq(HQ_ID);
        for &lamp in &lamps {
            sim.add_lamp(lamp, HQ_ID);
        }
        (sim, lamps)
    }
}

/// Id of the nth lamp: `001a`, `002a`, ...
pub fn lamp_id(index: usize) -> LampId {
    let n = index + 1;
    [
        b'0' + ((n / 100) % 10) as u8,
        b'0' + ((n / 10) % 10) as u8,
        b'0' + (n % 10) as u8,
        b'a',
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamp_ids() {
        assert_eq!(&lamp_id(0), b"001a");
        assert_eq!(&lamp_id(9), b"010a");
        assert_eq!(&lamp_id(122), b"123a");
    }

    #[test]
    fn test_chain_scenario_layout() {
        let (sim, lamps) = ScenarioBuilder::new(3).chain_topology().build();
        assert_eq!(lamps.len(), 3);
        assert!(sim.topology().is_connected(HQ_ID, lamps[0]));
        assert!(sim.topology().is_connected(lamps[0], lamps[1]));
        assert!(!sim.topology().is_connected(HQ_ID, lamps[2]));
        assert!(sim.node(&HQ_ID).unwrap().is_hq());
        assert!(!sim.node(&lamps[0]).unwrap().is_hq());
    }
}
