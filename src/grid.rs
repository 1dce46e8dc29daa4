// --- File: grid.rs ---
use crate::agent::Agent;
use glam::Vec2;
use std::collections::HashMap;

pub type GridKey = (i32, i32);

/// Uniform bucket grid over the playfield, keyed by each agent's top-left
/// corner. Buckets hold indices into the agent slice the grid was built
/// from, in ascending slice order.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cells: HashMap<GridKey, Vec<usize>>,
    cell_size: f32,
    grid_width: i32,
    grid_height: i32,
}

impl SpatialGrid {
    pub fn new(extent: f32, cell_size: f32) -> Self {
        let cells_per_side = (extent / cell_size).ceil().max(1.0) as i32;
        Self {
            cells: HashMap::new(),
            cell_size,
            grid_width: cells_per_side,
            grid_height: cells_per_side,
        }
    }

    #[inline]
    pub fn key_for(&self, position: Vec2) -> GridKey {
        let cell_x = (position.x / self.cell_size).floor() as i32;
        let cell_y = (position.y / self.cell_size).floor() as i32;
        (
            cell_x.clamp(0, self.grid_width - 1),
            cell_y.clamp(0, self.grid_height - 1),
        )
    }

    pub fn rebuild(&mut self, agents: &[Agent]) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        for (index, agent) in agents.iter().enumerate() {
            let key = self.key_for(agent.position);
            self.cells.entry(key).or_default().push(index);
        }
    }

    /// Moves `index` to the bucket for `to` after its agent moved from `from`.
    pub fn relocate(&mut self, index: usize, from: Vec2, to: Vec2) {
        let old_key = self.key_for(from);
        let new_key = self.key_for(to);
        if old_key == new_key {
            return;
        }
        if let Some(bucket) = self.cells.get_mut(&old_key) {
            bucket.retain(|&i| i != index);
        }
        let bucket = self.cells.entry(new_key).or_default();
        let at = bucket.partition_point(|&i| i < index);
        bucket.insert(at, index);
    }

    /// Indices of every agent whose top-left corner falls in a cell touching
    /// the rectangle `min..=max`. Results are ascending.
    pub fn in_rect(&self, min: Vec2, max: Vec2) -> Vec<usize> {
        let (x0, y0) = self.key_for(min);
        let (x1, y1) = self.key_for(max);
        let mut found = Vec::new();
        for cell_x in x0..=x1 {
            for cell_y in y0..=y1 {
                if let Some(bucket) = self.cells.get(&(cell_x, cell_y)) {
                    found.extend_from_slice(bucket);
                }
            }
        }
        found.sort_unstable();
        found
    }

    /// Candidates whose box could contain `point`. Relies on no agent being
    /// larger than a cell.
    pub fn candidates_at(&self, point: Vec2) -> Vec<usize> {
        self.in_rect(point - Vec2::splat(self.cell_size), point)
    }

    /// Candidates whose box could overlap a box of `size` at `position`.
    pub fn candidates_overlapping(&self, position: Vec2, size: f32) -> Vec<usize> {
        self.in_rect(
            position - Vec2::splat(self.cell_size),
            position + Vec2::splat(size),
        )
    }

    /// Candidates whose top-left corner lies within `radius` (plus one cell of
    /// slack) of `centre`.
    pub fn candidates_near(&self, centre: Vec2, radius: f32) -> Vec<usize> {
        let reach = Vec2::splat(radius + self.cell_size);
        self.in_rect(centre - reach, centre + Vec2::splat(radius))
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.grid_width, self.grid_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentId, Colour};
    use crate::brain::Brain;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn agents(positions: &[(f32, f32)]) -> Vec<Agent> {
        let mut rng = StdRng::seed_from_u64(1);
        positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Agent {
                id: AgentId(i as u64),
                position: Vec2::new(x, y),
                size: 10.0,
                angle: 0.0,
                colour: Colour { r: 0, g: 0, b: 0 },
                brain: Brain::random(&mut rng, 1),
                age: 0,
                lifetime: 100,
                alive: true,
                moving: false,
                turning: false,
            })
            .collect()
    }

    #[test]
    fn keys_clamp_to_the_playfield() {
        let grid = SpatialGrid::new(600.0, 48.0);
        assert_eq!(grid.dimensions(), (13, 13));
        assert_eq!(grid.key_for(Vec2::new(-5.0, 700.0)), (0, 12));
        assert_eq!(grid.key_for(Vec2::new(47.9, 48.0)), (0, 1));
    }

    #[test]
    fn point_candidates_include_boxes_reaching_across_cells() {
        let mut grid = SpatialGrid::new(600.0, 48.0);
        let population = agents(&[(44.0, 44.0), (300.0, 300.0), (50.0, 50.0)]);
        grid.rebuild(&population);
        let found = grid.candidates_at(Vec2::new(50.0, 50.0));
        assert!(found.contains(&0));
        assert!(found.contains(&2));
        assert!(!found.contains(&1));
        assert!(found.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rebuild_forgets_previous_positions() {
        let mut grid = SpatialGrid::new(600.0, 48.0);
        grid.rebuild(&agents(&[(10.0, 10.0)]));
        grid.rebuild(&agents(&[(500.0, 500.0)]));
        assert!(grid.candidates_at(Vec2::new(12.0, 12.0)).is_empty());
        assert_eq!(grid.candidates_at(Vec2::new(505.0, 505.0)), vec![0]);
    }

    #[test]
    fn relocated_index_moves_buckets_in_order() {
        let mut grid = SpatialGrid::new(600.0, 48.0);
        let population = agents(&[(100.0, 100.0), (580.0, 300.0), (530.0, 300.0), (540.0, 310.0)]);
        grid.rebuild(&population);
        grid.relocate(1, Vec2::new(580.0, 300.0), Vec2::new(574.0, 300.0));
        assert_eq!(grid.cells[&(11, 6)], vec![1, 2, 3]);
        assert!(grid.cells[&(12, 6)].is_empty());
        // Same cell: nothing to do
        grid.relocate(0, Vec2::new(100.0, 100.0), Vec2::new(101.0, 101.0));
        assert_eq!(grid.cells[&(2, 2)], vec![0]);
    }
}
