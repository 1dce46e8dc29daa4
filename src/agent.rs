// --- File: agent.rs ---
use crate::brain::Brain;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::fmt;

/// Identifier handed out at spawn. Ids grow monotonically and are never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    /// CSS form used by canvas hosts, e.g. `rgb(12, 200, 7)`.
    pub fn css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    // Top-left corner of the agent's square
    pub position: Vec2,
    pub size: f32,
    // Heading in radians
    pub angle: f32,
    pub colour: Colour,
    pub brain: Brain,
    pub age: u64,
    pub lifetime: u64,
    pub alive: bool,

    pub moving: bool,
    pub turning: bool,
}

impl Agent {
    pub fn centre(&self) -> Vec2 {
        self.position + Vec2::splat(self.size * 0.5)
    }

    /// Half-open box test: `position <= point < position + size` on both axes.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.position.x
            && point.y >= self.position.y
            && point.x < self.position.x + self.size
            && point.y < self.position.y + self.size
    }

    pub fn overlaps(&self, other: &Agent) -> bool {
        self.position.x < other.position.x + other.size
            && other.position.x < self.position.x + self.size
            && self.position.y < other.position.y + other.size
            && other.position.y < self.position.y + self.size
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position,
            size: self.size,
            colour: self.colour,
        }
    }

    pub fn debug_info(&self) -> AgentDebugInfo {
        AgentDebugInfo {
            id: self.id,
            position: self.position,
            size: self.size,
            colour: self.colour,
            angle: self.angle,
            age: self.age,
            lifetime: self.lifetime,
            brain_summary: self.brain.summary(),
        }
    }
}

/// Render-ready view of a live agent. Carries nothing of the brain.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: Vec2,
    pub size: f32,
    pub colour: Colour,
}

/// What a pointer-down on an agent reports.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDebugInfo {
    pub id: AgentId,
    pub position: Vec2,
    pub size: f32,
    pub colour: Colour,
    pub angle: f32,
    pub age: u64,
    pub lifetime: u64,
    pub brain_summary: String,
}

impl fmt::Display for AgentDebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "agent {} at ({:.1}, {:.1}) size {:.1} {} heading {:.2} rad, age {}/{}: {}",
            self.id,
            self.position.x,
            self.position.y,
            self.size,
            self.colour.css(),
            self.angle,
            self.age,
            self.lifetime,
            self.brain_summary
        )
    }
}

// --- Render Data Structure ---
// Flat layout for hosts that upload agents straight into a vertex/instance buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct AgentInstance {
    pub position: [f32; 2],
    pub size: f32,
    pub _padding: f32,
    pub colour: [f32; 4], // normalised rgba
}

impl From<&AgentSnapshot> for AgentInstance {
    fn from(snapshot: &AgentSnapshot) -> Self {
        Self {
            position: snapshot.position.to_array(),
            size: snapshot.size,
            _padding: 0.0,
            colour: [
                snapshot.colour.r as f32 / 255.0,
                snapshot.colour.g as f32 / 255.0,
                snapshot.colour.b as f32 / 255.0,
                1.0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::Brain;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn agent_at(id: u64, x: f32, y: f32, size: f32) -> Agent {
        let mut rng = StdRng::seed_from_u64(id);
        Agent {
            id: AgentId(id),
            position: Vec2::new(x, y),
            size,
            angle: 0.0,
            colour: Colour { r: 1, g: 2, b: 3 },
            brain: Brain::random(&mut rng, 2),
            age: 0,
            lifetime: 10,
            alive: true,
            moving: false,
            turning: false,
        }
    }

    #[test]
    fn contains_is_half_open() {
        let a = agent_at(1, 10.0, 10.0, 5.0);
        assert!(a.contains(Vec2::new(10.0, 10.0)));
        assert!(a.contains(Vec2::new(14.9, 14.9)));
        assert!(!a.contains(Vec2::new(15.0, 12.0)));
        assert!(!a.contains(Vec2::new(9.9, 12.0)));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = agent_at(1, 0.0, 0.0, 10.0);
        let b = agent_at(2, 10.0, 0.0, 10.0);
        let c = agent_at(3, 9.0, 9.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn instance_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<AgentInstance>(), 32);
        let snapshot = agent_at(4, 1.0, 2.0, 3.0).snapshot();
        let instance = AgentInstance::from(&snapshot);
        assert_eq!(instance.position, [1.0, 2.0]);
        assert_eq!(instance.colour[3], 1.0);
        assert_eq!(bytemuck::bytes_of(&instance).len(), 32);
    }

    #[test]
    fn css_colour_matches_canvas_syntax() {
        assert_eq!(Colour { r: 238, g: 0, b: 17 }.css(), "rgb(238, 0, 17)");
    }
}
