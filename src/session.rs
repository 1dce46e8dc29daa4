//! The call surface a host drives: initialize once, then step and query.

use crate::agent::{AgentDebugInfo, AgentInstance, AgentSnapshot};
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::simulation::{PopulationStats, Simulation};

/// Identifies one population. Each call to `initialize` starts a new session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PopulationHandle {
    pub session: u64,
    pub seed: Option<u64>,
}

enum CoreState {
    Uninitialized,
    Running(Box<Simulation>),
}

pub struct SimulationCore {
    config: SimulationConfig,
    state: CoreState,
    sessions: u64,
}

impl SimulationCore {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            state: CoreState::Uninitialized,
            sessions: 0,
        }
    }

    /// Creates a fresh population, discarding any previous one.
    pub fn initialize(&mut self) -> SimResult<PopulationHandle> {
        let simulation = Simulation::new(self.config.clone())?;
        if matches!(self.state, CoreState::Running(_)) {
            log::warn!("Re-initializing: previous population discarded");
        }
        self.sessions += 1;
        self.state = CoreState::Running(Box::new(simulation));
        Ok(PopulationHandle {
            session: self.sessions,
            seed: self.config.seed,
        })
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CoreState::Running(_))
    }

    /// Drops the population and returns to the uninitialized state.
    pub fn shutdown(&mut self) {
        self.state = CoreState::Uninitialized;
    }

    pub fn step(&mut self, inverse_spawn_rate: i64) -> SimResult<()> {
        self.running_mut()?.step(inverse_spawn_rate)
    }

    pub fn list_agents(&self) -> SimResult<Vec<AgentSnapshot>> {
        self.running()?.snapshots()
    }

    pub fn agent_instances(&self) -> SimResult<Vec<AgentInstance>> {
        self.running()?.instances()
    }

    pub fn query_agent_at(&self, x: f64, y: f64) -> SimResult<Option<AgentDebugInfo>> {
        self.running()?.agent_at(x, y)
    }

    pub fn stats(&self) -> SimResult<PopulationStats> {
        Ok(self.running()?.stats())
    }

    fn running(&self) -> SimResult<&Simulation> {
        match &self.state {
            CoreState::Running(simulation) => Ok(simulation.as_ref()),
            CoreState::Uninitialized => Err(SimError::NotInitialized),
        }
    }

    fn running_mut(&mut self) -> SimResult<&mut Simulation> {
        match &mut self.state {
            CoreState::Running(simulation) => Ok(simulation.as_mut()),
            CoreState::Uninitialized => Err(SimError::NotInitialized),
        }
    }
}
