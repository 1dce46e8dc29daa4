use crate::agent::Agent;
use crate::brain::INPUTS;
use crate::constants::{GAME_SIZE, MAX_CLOSENESS};
use crate::grid::SpatialGrid;
use crate::utils::{Vec2Angle, norm_angle};
use std::f32::consts::PI;

// Sizes within this factor of each other count as equal
const SIZE_BAND: f32 = 1.1;

/// What an agent perceives at the start of a tick.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Senses {
    /// +1 when the nearest neighbour is clearly smaller, -1 when clearly
    /// larger, 0 when similar or when nothing is in range.
    pub relative_size: f32,
    /// 1 when touching the nearest neighbour, falling towards 0 with distance.
    pub closeness: f32,
    /// Bearing of the nearest neighbour relative to the heading, in `[-1, 1]`.
    pub bearing: f32,
    pub touching_edge: bool,
}

impl Senses {
    pub fn to_inputs(self) -> [f32; INPUTS] {
        [
            self.relative_size,
            self.closeness,
            self.bearing,
            if self.touching_edge { 1.0 } else { 0.0 },
        ]
    }
}

struct Nearest {
    size: f32,
    closeness: f32,
    bearing: f32,
}

/// Senses for `agents[index]`, looking for neighbours through `grid`, which
/// must have been built from the same slice.
pub fn sense(
    agents: &[Agent],
    index: usize,
    grid: &SpatialGrid,
    perception_radius: f32,
) -> Senses {
    let me = &agents[index];
    let centre = me.centre();
    let mut nearest: Option<Nearest> = None;

    for other_index in grid.candidates_near(centre, perception_radius) {
        if other_index == index {
            continue;
        }
        let other = &agents[other_index];
        let offset = other.centre() - centre;
        if offset.length() > perception_radius {
            continue;
        }
        let closeness = closeness(offset.x, offset.y);
        // Candidates are ascending, so strict comparison keeps the lowest id on ties
        if nearest.as_ref().is_none_or(|n| closeness > n.closeness) {
            nearest = Some(Nearest {
                size: other.size,
                closeness,
                bearing: norm_angle(me.angle - offset.to_angle()) / PI,
            });
        }
    }

    let touching_edge = touching_edge(me);
    match nearest {
        Some(nearest) => Senses {
            relative_size: if me.size > nearest.size * SIZE_BAND {
                1.0
            } else if nearest.size > me.size * SIZE_BAND {
                -1.0
            } else {
                0.0
            },
            closeness: nearest.closeness,
            bearing: nearest.bearing,
            touching_edge,
        },
        None => Senses {
            touching_edge,
            ..Senses::default()
        },
    }
}

fn closeness(dx: f32, dy: f32) -> f32 {
    let raw = (GAME_SIZE - dx.abs()).max(0.0).powi(4) + (GAME_SIZE - dy.abs()).max(0.0).powi(4);
    (raw / MAX_CLOSENESS).clamp(0.0, 1.0)
}

fn touching_edge(agent: &Agent) -> bool {
    let far = GAME_SIZE - agent.size;
    agent.position.x <= 0.0
        || agent.position.y <= 0.0
        || agent.position.x >= far
        || agent.position.y >= far
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentId, Colour};
    use crate::brain::Brain;
    use crate::constants::GRID_CELL_SIZE;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn agent(id: u64, x: f32, y: f32, size: f32) -> Agent {
        let mut rng = StdRng::seed_from_u64(id);
        Agent {
            id: AgentId(id),
            position: Vec2::new(x, y),
            size,
            angle: 0.0,
            colour: Colour { r: 0, g: 0, b: 0 },
            brain: Brain::random(&mut rng, 1),
            age: 0,
            lifetime: 100,
            alive: true,
            moving: false,
            turning: false,
        }
    }

    fn sense_first(agents: &[Agent]) -> Senses {
        let mut grid = SpatialGrid::new(GAME_SIZE, GRID_CELL_SIZE);
        grid.rebuild(agents);
        sense(agents, 0, &grid, 200.0)
    }

    #[test]
    fn alone_senses_nothing_but_edges() {
        let senses = sense_first(&[agent(0, 0.0, 100.0, 10.0)]);
        assert_eq!(
            senses,
            Senses {
                touching_edge: true,
                ..Senses::default()
            }
        );
        assert_eq!(senses.to_inputs(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn larger_neighbour_ahead_reads_as_threat() {
        let senses = sense_first(&[agent(0, 100.0, 100.0, 10.0), agent(1, 150.0, 100.0, 20.0)]);
        assert_eq!(senses.relative_size, -1.0);
        assert!(senses.closeness > 0.5 && senses.closeness < 1.0);
        // Centres are 55 px right and 5 px down of each other
        assert!(senses.bearing < 0.0 && senses.bearing > -0.1);
        assert!(!senses.touching_edge);
    }

    #[test]
    fn nearest_wins_over_farther_neighbours() {
        let senses = sense_first(&[
            agent(0, 300.0, 300.0, 20.0),
            agent(1, 450.0, 300.0, 10.0),
            agent(2, 330.0, 300.0, 30.0),
        ]);
        assert_eq!(senses.relative_size, -1.0);
    }

    #[test]
    fn neighbours_beyond_perception_are_ignored() {
        let senses = sense_first(&[agent(0, 10.0, 10.0, 10.0), agent(1, 500.0, 500.0, 10.0)]);
        assert_eq!(senses.closeness, 0.0);
    }
}
