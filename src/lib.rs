//! Population engine for a neural-network evolution simulation.
//!
//! Agents are coloured squares on a 600x600 playfield, each steered by a
//! small threshold-neuron brain. Bigger agents eat smaller ones they touch,
//! agents die of old age, and new agents are spawned at a host-controlled
//! rate as mutated copies of the living. Hosts drive [`SimulationCore`]
//! (usually through a [`HostLoopController`]) and draw whatever
//! [`SimulationCore::list_agents`] returns.

pub mod agent;
pub mod brain;
pub mod config;
pub mod constants;
pub mod error;
pub mod grid;
pub mod host;
pub mod sensing;
pub mod session;
pub mod simulation;
pub mod utils;

pub use agent::{AgentDebugInfo, AgentId, AgentInstance, AgentSnapshot, Colour};
pub use config::{HostConfig, SimulationConfig};
pub use error::{SimError, SimResult};
pub use host::{Frame, HostLoopController, SurfaceOrigin};
pub use session::{PopulationHandle, SimulationCore};
pub use simulation::{PopulationStats, Simulation};
