// --- File: simulation.rs ---
use crate::agent::{Agent, AgentDebugInfo, AgentId, AgentInstance, AgentSnapshot, Colour};
use crate::brain::{Brain, Decision};
use crate::config::SimulationConfig;
use crate::constants::*;
use crate::error::{SimError, SimResult};
use crate::grid::SpatialGrid;
use crate::sensing::{Senses, sense};
use crate::utils::mutate_colour;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::f32::consts::TAU;

pub type SimRng = StdRng;

// Newborns start from this colour before mutation
const BASE_COLOUR: Colour = Colour {
    r: 128,
    g: 128,
    b: 128,
};

/// Running totals since the population was created.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PopulationStats {
    pub tick: u64,
    pub alive: usize,
    pub spawned: u64,
    pub eaten: u64,
    pub died_of_age: u64,
    pub peak: usize,
}

/// Owns the population and advances it one tick at a time.
///
/// The live agent list is kept sorted by id and contains only living
/// agents between ticks.
pub struct Simulation {
    agents: Vec<Agent>,
    rng: SimRng,
    config: SimulationConfig,
    // Always describes `agents`
    grid: SpatialGrid,
    // Working grid for the tick in progress
    scratch_grid: SpatialGrid,
    next_id: u64,
    stats: PopulationStats,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => SimRng::seed_from_u64(seed),
            None => SimRng::from_entropy(),
        };
        let grid = SpatialGrid::new(GAME_SIZE, GRID_CELL_SIZE);

        let mut simulation = Self {
            agents: Vec::with_capacity(config.initial_population.max(64)),
            rng,
            scratch_grid: grid.clone(),
            grid,
            config,
            next_id: 0,
            stats: PopulationStats::default(),
        };
        simulation.initialize_agents();
        Ok(simulation)
    }

    fn initialize_agents(&mut self) {
        for _ in 0..self.config.initial_population {
            let id = AgentId(self.next_id);
            self.next_id += 1;
            let agent = Self::create_agent(&mut self.rng, &self.config, id);
            self.agents.push(agent);
        }
        self.stats.spawned = self.agents.len() as u64;
        self.stats.alive = self.agents.len();
        self.stats.peak = self.agents.len();
        self.grid.rebuild(&self.agents);
        log::info!(
            "Population initialized with {} agents (seed {:?})",
            self.agents.len(),
            self.config.seed
        );
    }

    fn create_agent(rng: &mut SimRng, config: &SimulationConfig, id: AgentId) -> Agent {
        let brain = Brain::random(rng, config.hidden_neurons);
        let colour = mutate_colour(BASE_COLOUR, rng, INITIAL_COLOUR_MUTATION_MAX_DELTA);
        Self::place_newborn(rng, config, id, brain, colour)
    }

    fn create_offspring(
        parent: &Agent,
        rng: &mut SimRng,
        config: &SimulationConfig,
        id: AgentId,
    ) -> Agent {
        let brain = parent.brain.mutated(
            rng,
            config.weight_mutation_chance,
            config.weight_mutation_max_delta,
        );
        let colour = mutate_colour(parent.colour, rng, OFFSPRING_COLOUR_MUTATION_MAX_DELTA);
        Self::place_newborn(rng, config, id, brain, colour)
    }

    fn place_newborn(
        rng: &mut SimRng,
        config: &SimulationConfig,
        id: AgentId,
        brain: Brain,
        colour: Colour,
    ) -> Agent {
        let size = if config.min_size < config.max_size {
            rng.gen_range(config.min_size..=config.max_size)
        } else {
            config.min_size
        };
        let far = GAME_SIZE - size;
        let position = Vec2::new(rng.gen_range(0.0..=far), rng.gen_range(0.0..=far));
        let lifetime = rng.gen_range(config.min_lifetime..=config.max_lifetime);

        Agent {
            id,
            position,
            size,
            angle: rng.gen_range(0.0..TAU),
            colour,
            brain,
            age: 0,
            lifetime,
            alive: true,
            moving: false,
            turning: false,
        }
    }

    /// Advances the population by exactly one tick.
    ///
    /// Works on a staged copy of the population and RNG; nothing is
    /// committed unless every phase succeeds and the result passes the
    /// invariant checks.
    pub fn step(&mut self, inverse_spawn_rate: i64) -> SimResult<()> {
        if inverse_spawn_rate <= 0 {
            return Err(SimError::InvalidArgument(format!(
                "inverse spawn rate must be a positive integer, got {inverse_spawn_rate}"
            )));
        }

        let mut next = self.agents.clone();
        let mut rng = self.rng.clone();
        let mut stats = self.stats;
        let mut next_id = self.next_id;

        // --- Think ---
        self.scratch_grid.rebuild(&next);
        let decisions = self.evaluate_brains(&mut next);

        // --- Move ---
        for (agent, decision) in next.iter_mut().zip(&decisions) {
            agent.moving = decision.moving;
            agent.turning = decision.turning;
            if agent.turning {
                agent.angle = (agent.angle + ROT_SPEED) % TAU;
            }
            if agent.moving {
                agent.position += Vec2::from_angle(agent.angle) * MOV_SPEED;
            }
            clamp_to_playfield(agent);
        }

        // --- Interactions ---
        self.scratch_grid.rebuild(&next);
        stats.eaten += self.resolve_collisions(&mut next);

        // --- Ageing ---
        for agent in next.iter_mut().filter(|a| a.alive) {
            agent.age += 1;
            if agent.age >= agent.lifetime {
                agent.alive = false;
                stats.died_of_age += 1;
                log::debug!("Agent {} died of old age at tick {}", agent.id, stats.tick + 1);
            }
        }
        next.retain(|agent| agent.alive);

        // --- Spawning ---
        if rng.gen_bool(1.0 / inverse_spawn_rate as f64) {
            if next.len() < self.config.max_agents {
                let id = AgentId(next_id);
                next_id += 1;
                let newborn = if next.is_empty() {
                    Self::create_agent(&mut rng, &self.config, id)
                } else {
                    let parent_index = rng.gen_range(0..next.len());
                    Self::create_offspring(&next[parent_index], &mut rng, &self.config, id)
                };
                log::debug!(
                    "Spawned agent {} at ({:.1}, {:.1})",
                    newborn.id,
                    newborn.position.x,
                    newborn.position.y
                );
                next.push(newborn);
                stats.spawned += 1;
            } else {
                log::debug!("Population cap of {} reached, skipping spawn", self.config.max_agents);
            }
        }

        check_population(&next)?;

        // --- Commit ---
        stats.tick += 1;
        stats.alive = next.len();
        stats.peak = stats.peak.max(next.len());
        self.agents = next;
        self.rng = rng;
        self.next_id = next_id;
        self.stats = stats;
        self.grid.rebuild(&self.agents);
        Ok(())
    }

    fn evaluate_brains(&self, agents: &mut [Agent]) -> Vec<Decision> {
        let grid = &self.scratch_grid;
        let radius = self.config.perception_radius;
        let snapshot: &[Agent] = agents;

        if self.config.parallel_brains {
            let senses: Vec<Senses> = (0..snapshot.len())
                .into_par_iter()
                .map(|index| sense(snapshot, index, grid, radius))
                .collect();
            agents
                .par_iter_mut()
                .zip(senses.par_iter())
                .map(|(agent, senses)| agent.brain.think(senses.to_inputs()))
                .collect()
        } else {
            let senses: Vec<Senses> = (0..snapshot.len())
                .map(|index| sense(snapshot, index, grid, radius))
                .collect();
            agents
                .iter_mut()
                .zip(&senses)
                .map(|(agent, senses)| agent.brain.think(senses.to_inputs()))
                .collect()
        }
    }

    /// Lets larger agents eat overlapping smaller ones. Pairs are visited in
    /// ascending index order, so the lowest id always acts first. Returns
    /// the number of agents eaten.
    fn resolve_collisions(&mut self, agents: &mut [Agent]) -> u64 {
        let mut eaten = 0;
        for i in 0..agents.len() {
            let candidates = self
                .scratch_grid
                .candidates_overlapping(agents[i].position, agents[i].size);
            for j in candidates {
                if j <= i || !agents[i].alive || !agents[j].alive {
                    continue;
                }
                if !agents[i].overlaps(&agents[j]) {
                    continue;
                }
                let (predator, prey) = if agents[i].size > agents[j].size * self.config.eat_ratio {
                    (i, j)
                } else if agents[j].size > agents[i].size * self.config.eat_ratio {
                    (j, i)
                } else {
                    continue;
                };

                let prey_area = agents[prey].size * agents[prey].size;
                agents[prey].alive = false;
                let hunter = &mut agents[predator];
                let area = hunter.size * hunter.size + prey_area * self.config.growth_share;
                hunter.size = area.sqrt().min(self.config.max_size);
                let before = hunter.position;
                clamp_to_playfield(hunter);
                // Growing at the far edge pushes the hunter back, possibly into another cell
                self.scratch_grid.relocate(predator, before, hunter.position);
                eaten += 1;
                log::debug!("Agent {} ate agent {}", agents[predator].id, agents[prey].id);
            }
        }
        eaten
    }

    /// Render-ready view of every live agent, ascending by id.
    pub fn snapshots(&self) -> SimResult<Vec<AgentSnapshot>> {
        check_population(&self.agents)?;
        Ok(self.agents.iter().map(Agent::snapshot).collect())
    }

    /// Same agents as [`Self::snapshots`] in the flat instance layout.
    pub fn instances(&self) -> SimResult<Vec<AgentInstance>> {
        Ok(self.snapshots()?.iter().map(AgentInstance::from).collect())
    }

    /// The lowest-id live agent whose box contains `(x, y)`.
    ///
    /// Points off the playfield are a normal miss; non-finite coordinates
    /// are rejected.
    pub fn agent_at(&self, x: f64, y: f64) -> SimResult<Option<AgentDebugInfo>> {
        if !x.is_finite() || !y.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "query coordinates ({x}, {y}) are not finite"
            )));
        }
        let extent = GAME_SIZE as f64;
        if !(0.0..extent).contains(&x) || !(0.0..extent).contains(&y) {
            return Ok(None);
        }

        let point = Vec2::new(x as f32, y as f32);
        let hit = self
            .grid
            .candidates_at(point)
            .into_iter()
            .map(|index| &self.agents[index])
            .find(|agent| agent.contains(point));

        match hit {
            Some(agent) if !agent.alive => Err(SimError::InternalInvariantViolation(format!(
                "dead agent {} is still queryable",
                agent.id
            ))),
            Some(agent) => Ok(Some(agent.debug_info())),
            None => Ok(None),
        }
    }

    pub fn tick(&self) -> u64 {
        self.stats.tick
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn stats(&self) -> PopulationStats {
        self.stats
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

fn clamp_to_playfield(agent: &mut Agent) {
    // Ensure no agent goes outside the game borders
    let far = GAME_SIZE - agent.size;
    agent.position.x = agent.position.x.clamp(0.0, far);
    agent.position.y = agent.position.y.clamp(0.0, far);
}

/// Ids strictly ascending (hence unique), everyone alive, everyone on the playfield.
fn check_population(agents: &[Agent]) -> SimResult<()> {
    for pair in agents.windows(2) {
        if pair[0].id >= pair[1].id {
            return Err(SimError::InternalInvariantViolation(format!(
                "agent ids out of order or duplicated: {} then {}",
                pair[0].id, pair[1].id
            )));
        }
    }
    for agent in agents {
        if !agent.alive {
            return Err(SimError::InternalInvariantViolation(format!(
                "dead agent {} left in the population",
                agent.id
            )));
        }
        let far = GAME_SIZE - agent.size;
        let in_bounds = (0.0..=far).contains(&agent.position.x) && (0.0..=far).contains(&agent.position.y);
        if !in_bounds {
            return Err(SimError::InternalInvariantViolation(format!(
                "agent {} left the playfield at ({}, {})",
                agent.id, agent.position.x, agent.position.y
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(population: usize) -> Simulation {
        let config = SimulationConfig::default()
            .with_seed(42)
            .with_initial_population(population);
        Simulation::new(config).expect("valid config")
    }

    fn plain_agent(sim: &mut Simulation, x: f32, y: f32, size: f32) -> AgentId {
        let id = AgentId(sim.next_id);
        sim.next_id += 1;
        let mut agent = Simulation::create_agent(&mut sim.rng, &sim.config, id);
        agent.position = Vec2::new(x, y);
        agent.size = size;
        agent.lifetime = u64::MAX;
        sim.agents.push(agent);
        sim.grid.rebuild(&sim.agents);
        id
    }

    #[test]
    fn default_population_starts_empty() {
        let sim = seeded(0);
        assert!(sim.is_empty());
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn rejected_spawn_rate_changes_nothing() {
        let mut sim = seeded(5);
        let before = sim.snapshots().unwrap();
        for rate in [0, -1, i64::MIN] {
            assert!(matches!(sim.step(rate), Err(SimError::InvalidArgument(_))));
        }
        assert_eq!(sim.snapshots().unwrap(), before);
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn spawn_rate_one_spawns_every_tick() {
        let mut sim = seeded(0);
        for _ in 0..10 {
            sim.step(1).unwrap();
        }
        assert_eq!(sim.stats().spawned, 10);
        let ids: Vec<u64> = sim.snapshots().unwrap().iter().map(|s| s.id.0).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn larger_agent_eats_overlapping_smaller_one() {
        let mut sim = seeded(0);
        let big = plain_agent(&mut sim, 100.0, 100.0, 30.0);
        let small = plain_agent(&mut sim, 105.0, 105.0, 10.0);
        // Spawn chance 1 in i64::MAX keeps the newborns out of the way
        sim.step(i64::MAX).unwrap();
        let ids: Vec<AgentId> = sim.snapshots().unwrap().iter().map(|s| s.id).collect();
        assert!(ids.contains(&big));
        assert!(!ids.contains(&small));
        assert_eq!(sim.stats().eaten, 1);
        let survivor = sim.snapshots().unwrap()[0];
        assert!(survivor.size > 30.0);
    }

    #[test]
    fn similar_sizes_coexist() {
        let mut sim = seeded(0);
        plain_agent(&mut sim, 200.0, 200.0, 20.0);
        plain_agent(&mut sim, 205.0, 205.0, 21.0);
        sim.step(i64::MAX).unwrap();
        assert_eq!(sim.len(), 2);
    }

    #[test]
    fn lowest_id_predator_takes_shared_prey() {
        let mut sim = seeded(0);
        let first = plain_agent(&mut sim, 300.0, 300.0, 30.0);
        let prey = plain_agent(&mut sim, 310.0, 310.0, 10.0);
        // Too close in size to the first predator for either to eat the other
        let second = plain_agent(&mut sim, 316.0, 316.0, 29.0);

        let first_before = sim.agents[0].size;
        let second_before = sim.agents[2].size;
        sim.step(i64::MAX).unwrap();
        let snapshots = sim.snapshots().unwrap();
        assert!(!snapshots.iter().any(|s| s.id == prey));
        let grown = snapshots.iter().find(|s| s.id == first).unwrap();
        let other = snapshots.iter().find(|s| s.id == second).unwrap();
        assert!(grown.size > first_before);
        assert_eq!(other.size, second_before);
    }

    #[test]
    fn hunter_pushed_off_the_edge_is_still_found_by_later_agents() {
        let mut sim = seeded(0);
        let prey = plain_agent(&mut sim, 580.0, 305.0, 10.0);
        // Ends just short of the hunter's starting cell
        let bystander = plain_agent(&mut sim, 565.5, 300.0, 10.0);
        let hunter = plain_agent(&mut sim, 576.0, 300.0, 24.0);

        let mut agents = sim.agents.clone();
        sim.scratch_grid.rebuild(&agents);
        assert_eq!(sim.resolve_collisions(&mut agents), 2);

        let survivors: Vec<AgentId> = agents.iter().filter(|a| a.alive).map(|a| a.id).collect();
        assert_eq!(survivors, vec![hunter]);
        assert!(!survivors.contains(&prey) && !survivors.contains(&bystander));
        assert!(agents[2].position.x < 576.0);
    }

    #[test]
    fn configs_that_would_break_mutation_are_refused() {
        let mut config = SimulationConfig::default().with_seed(1);
        config.weight_mutation_chance = 1.0;
        config.weight_mutation_max_delta = 0.0;
        assert!(matches!(
            Simulation::new(config),
            Err(SimError::InvalidArgument(_))
        ));

        let mut config = SimulationConfig::default().with_seed(1);
        config.max_size = f32::NAN;
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn agents_age_out() {
        let mut sim = seeded(0);
        plain_agent(&mut sim, 10.0, 10.0, 10.0);
        sim.agents[0].lifetime = 3;
        for _ in 0..3 {
            sim.step(i64::MAX).unwrap();
        }
        assert!(sim.is_empty());
        assert_eq!(sim.stats().died_of_age, 1);
    }

    #[test]
    fn query_prefers_lowest_id_on_overlap() {
        let mut sim = seeded(0);
        let low = plain_agent(&mut sim, 50.0, 50.0, 20.0);
        plain_agent(&mut sim, 55.0, 55.0, 20.0);
        let hit = sim.agent_at(60.0, 60.0).unwrap().unwrap();
        assert_eq!(hit.id, low);
        assert!(hit.brain_summary.contains("genotype"));
        assert!(sim.agent_at(10.0, 10.0).unwrap().is_none());
    }

    #[test]
    fn query_misses_off_playfield_and_rejects_nan() {
        let sim = seeded(3);
        assert_eq!(sim.agent_at(-1.0, 10.0), Ok(None));
        assert_eq!(sim.agent_at(10.0, 600.0), Ok(None));
        assert!(matches!(
            sim.agent_at(f64::NAN, 10.0),
            Err(SimError::InvalidArgument(_))
        ));
        assert!(sim.agent_at(10.0, f64::INFINITY).is_err());
    }

    #[test]
    fn corrupted_population_is_reported_not_rendered() {
        let mut sim = seeded(2);
        let duplicate = sim.agents[0].clone();
        sim.agents.push(duplicate);
        assert!(matches!(
            sim.snapshots(),
            Err(SimError::InternalInvariantViolation(_))
        ));
    }

    #[test]
    fn failed_invariant_check_keeps_pre_step_state() {
        let mut sim = seeded(0);
        plain_agent(&mut sim, 20.0, 20.0, 20.0);
        plain_agent(&mut sim, 400.0, 400.0, 20.0);
        sim.agents[1].id = sim.agents[0].id;
        let positions: Vec<Vec2> = sim.agents.iter().map(|a| a.position).collect();

        let result = sim.step(1);
        assert!(matches!(result, Err(SimError::InternalInvariantViolation(_))));
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.len(), 2);
        let after: Vec<Vec2> = sim.agents.iter().map(|a| a.position).collect();
        assert_eq!(after, positions);
    }

    #[test]
    fn parallel_and_serial_evaluation_agree() {
        let base = SimulationConfig::default()
            .with_seed(9)
            .with_initial_population(40);
        let mut serial = Simulation::new(base.clone()).unwrap();
        let mut parallel = Simulation::new(SimulationConfig {
            parallel_brains: true,
            ..base
        })
        .unwrap();
        for _ in 0..200 {
            serial.step(4).unwrap();
            parallel.step(4).unwrap();
        }
        assert_eq!(serial.snapshots().unwrap(), parallel.snapshots().unwrap());
    }
}
