// --- File: constants.rs ---
// --- Global Simulation Constants ---

/// Side length of the square playfield, in the host's pixel space.
pub const GAME_SIZE: f32 = 600.0;

/// Background the host clears to before drawing agents (`#eeeeee`).
pub const BACKGROUND_COLOUR: [u8; 3] = [0xee, 0xee, 0xee];

// Per-tick movement, matching the browser build
pub const MOV_SPEED: f32 = 1.0;
pub const ROT_SPEED: f32 = 0.1;

pub const DEFAULT_FPS: u32 = 60;

pub const MIN_AGENT_SIZE: f32 = 8.0;
pub const MAX_AGENT_SIZE: f32 = 48.0;
pub const MAX_AGENTS: usize = 2_000;
pub const MAX_HIDDEN_NEURONS: usize = 64;

// Grid cells must be at least as large as the biggest agent so that point
// and overlap queries only ever need the neighbouring cells.
pub const GRID_CELL_SIZE: f32 = MAX_AGENT_SIZE;

// Nearest-neighbour closeness is scaled by this (600^4 + 600^4, the closest possible pair)
pub const MAX_CLOSENESS: f32 = 259_200_000_000.0;

pub const INITIAL_COLOUR_MUTATION_MAX_DELTA: f32 = 0.35;
pub const OFFSPRING_COLOUR_MUTATION_MAX_DELTA: f32 = 0.08;

// --- End of File: constants.rs ---
