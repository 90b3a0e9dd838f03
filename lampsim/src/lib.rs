//! lampsim - Deterministic field simulator for the lampmesh protocol.
//!
//! Runs many protocol engines in one process against a configurable
//! topology, with no real-time delays:
//!
//! - **Deterministic**: seeded loss draws, `(time, seq)`-ordered event
//!   queue, creation-order node polling, sorted neighbor lists
//! - **Topologies**: chain, star, grid, fully connected, or custom links
//!   with per-link loss, delay and enable state
//! - **Scenario builder**: one HQ plus n lamps, scheduled button presses,
//!   host commands and link failures
//! - **Metrics**: transmission/delivery/loss counters and hop snapshots
//!
//! # Example
//!
//! ```
//! use lampmesh::{Duration, Timestamp};
//! use lampsim::ScenarioBuilder;
//!
//! let (mut sim, lamps) = ScenarioBuilder::new(3).chain_topology().build();
//! sim.send_host_command(Timestamp::ZERO, b"TX|FFFF|0|01");
//! sim.run_for(Duration::from_secs(5));
//! assert_eq!(sim.node(&lamps[2]).unwrap().hop(), 3);
//! ```

pub mod event;
pub mod metrics;
pub mod node;
pub mod scenario;
pub mod sim;
pub mod topology;

pub use event::{Event, ScenarioAction, ScheduledEvent};
pub use metrics::{HopSnapshot, SimMetrics};
pub use node::{SimClock, SimLink, SimNode};
pub use scenario::{lamp_id, ScenarioBuilder, HQ_ID};
pub use sim::Simulator;
pub use topology::{Link, Topology};
