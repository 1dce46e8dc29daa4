// --- File: config.rs ---
use crate::constants::{
    DEFAULT_FPS, GAME_SIZE, GRID_CELL_SIZE, MAX_AGENT_SIZE, MAX_AGENTS, MAX_HIDDEN_NEURONS,
    MIN_AGENT_SIZE,
};
use crate::error::{SimError, SimResult};
use std::env;
use std::str::FromStr;

/// Tunables for the population engine.
///
/// Lifetimes are measured in ticks, sizes in playfield pixels.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// `None` seeds the RNG from entropy; `Some` makes every run reproducible.
    pub seed: Option<u64>,
    pub initial_population: usize,
    pub min_size: f32,
    pub max_size: f32,
    pub min_lifetime: u64,
    pub max_lifetime: u64,
    pub perception_radius: f32,
    // A predator must be this many times larger than its prey
    pub eat_ratio: f32,
    // Share of the prey's area that turns into predator area
    pub growth_share: f32,
    pub hidden_neurons: usize,
    pub weight_mutation_chance: f64,
    pub weight_mutation_max_delta: f32,
    pub max_agents: usize,
    pub parallel_brains: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            initial_population: 0,
            min_size: MIN_AGENT_SIZE,
            max_size: MAX_AGENT_SIZE,
            min_lifetime: 600,
            max_lifetime: 1_800,
            perception_radius: 200.0,
            eat_ratio: 1.1,
            growth_share: 0.5,
            hidden_neurons: 6,
            weight_mutation_chance: 0.2,
            weight_mutation_max_delta: 0.5,
            max_agents: MAX_AGENTS,
            parallel_brains: false,
        }
    }
}

impl SimulationConfig {
    /// Settings used by the headless driver: a small seeded population and
    /// parallel brain evaluation.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.initial_population = 12;
        config.min_size = 10.0;
        config.max_size = 32.0;
        config.min_lifetime = 900;
        config.max_lifetime = 2_400;
        config.perception_radius = 240.0;
        config.parallel_brains = true;
        config
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_initial_population(mut self, count: usize) -> Self {
        self.initial_population = count;
        self
    }

    /// Rejects settings the engine cannot honour.
    pub fn validate(&self) -> SimResult<()> {
        if !self.min_size.is_finite()
            || !self.max_size.is_finite()
            || self.min_size <= 0.0
            || self.min_size > self.max_size
        {
            return Err(invalid(format!(
                "agent size bounds {}..{} must be positive and ordered",
                self.min_size, self.max_size
            )));
        }
        if self.max_size > GRID_CELL_SIZE || self.max_size >= GAME_SIZE {
            return Err(invalid(format!(
                "max agent size {} exceeds the grid cell size {}",
                self.max_size, GRID_CELL_SIZE
            )));
        }
        if self.min_lifetime == 0 || self.min_lifetime > self.max_lifetime {
            return Err(invalid(format!(
                "lifetime bounds {}..{} must be positive and ordered",
                self.min_lifetime, self.max_lifetime
            )));
        }
        if self.eat_ratio.is_nan() || self.eat_ratio < 1.0 {
            return Err(invalid(format!("eat ratio {} must be at least 1.0", self.eat_ratio)));
        }
        if !(0.0..=1.0).contains(&self.growth_share) {
            return Err(invalid(format!("growth share {} must lie in 0..=1", self.growth_share)));
        }
        if !(0.0..=1.0).contains(&self.weight_mutation_chance) {
            return Err(invalid(format!(
                "weight mutation chance {} must lie in 0..=1",
                self.weight_mutation_chance
            )));
        }
        if !self.weight_mutation_max_delta.is_finite() || self.weight_mutation_max_delta <= 0.0 {
            return Err(invalid(format!(
                "weight mutation delta {} must be positive",
                self.weight_mutation_max_delta
            )));
        }
        if self.hidden_neurons > MAX_HIDDEN_NEURONS {
            return Err(invalid(format!(
                "{} hidden neurons exceeds the limit of {}",
                self.hidden_neurons, MAX_HIDDEN_NEURONS
            )));
        }
        if self.perception_radius.is_nan() || self.perception_radius <= 0.0 {
            return Err(invalid("perception radius must be positive".to_string()));
        }
        if self.initial_population > self.max_agents {
            return Err(invalid(format!(
                "initial population {} exceeds the cap of {}",
                self.initial_population, self.max_agents
            )));
        }
        Ok(())
    }

    /// Overlays `NNE_SEED`, `NNE_INITIAL_POPULATION` and `NNE_PARALLEL`.
    pub fn with_env_overrides(mut self) -> SimResult<Self> {
        if let Some(seed) = env_var("NNE_SEED")? {
            self.seed = Some(seed);
        }
        if let Some(count) = env_var("NNE_INITIAL_POPULATION")? {
            self.initial_population = count;
        }
        if let Some(parallel) = env_var("NNE_PARALLEL")? {
            self.parallel_brains = parallel;
        }
        Ok(self)
    }
}

/// Pacing for the host loop driving the core.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub fps: u32,
    pub inverse_spawn_rate: i64,
    /// Stop after this many ticks; `None` runs until stopped.
    pub ticks: Option<u64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            inverse_spawn_rate: 64,
            ticks: None,
        }
    }
}

impl HostConfig {
    /// Overlays `NNE_FPS`, `NNE_SPAWN_RATE` and `NNE_TICKS`.
    pub fn with_env_overrides(mut self) -> SimResult<Self> {
        if let Some(fps) = env_var("NNE_FPS")? {
            self.fps = fps;
        }
        if let Some(rate) = env_var("NNE_SPAWN_RATE")? {
            self.inverse_spawn_rate = rate;
        }
        if let Some(ticks) = env_var("NNE_TICKS")? {
            self.ticks = Some(ticks);
        }
        if self.fps == 0 {
            return Err(invalid("frame rate must be positive".to_string()));
        }
        Ok(self)
    }
}

fn invalid(message: String) -> SimError {
    SimError::InvalidArgument(message)
}

fn env_var<T: FromStr>(name: &str) -> SimResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(format!("{name}={raw:?} is not a valid value"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(invalid(format!("{name} is not valid unicode"))),
    }
}
