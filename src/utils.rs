use crate::agent::Colour;
use glam::Vec2;
use rand::Rng;

// --- Helper Functions ---

pub trait Vec2Angle {
    fn to_angle(self) -> f32;
}

impl Vec2Angle for Vec2 {
    fn to_angle(self) -> f32 {
        self.y.atan2(self.x)
    }
}

/// Wraps any angle into `[-PI, PI]`.
pub fn norm_angle(angle: f32) -> f32 {
    angle.sin().atan2(angle.cos())
}

// Channel deltas are fractions of the full 0..=255 range
pub fn mutate_colour<R: Rng + ?Sized>(base: Colour, rng: &mut R, max_delta: f32) -> Colour {
    let mut channel = |value: u8| {
        let delta = rng.gen_range(-max_delta..max_delta) * 255.0;
        (value as f32 + delta).round().clamp(0.0, 255.0) as u8
    };
    Colour {
        r: channel(base.r),
        g: channel(base.g),
        b: channel(base.b),
    }
}
