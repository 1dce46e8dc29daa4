// --- File: host.rs ---
//! Host-side pacing for the simulation core: a fixed-rate scheduler with
//! explicit start/stop state, plus the small coordinate and frame helpers
//! a drawing surface needs.

use crate::agent::{AgentInstance, Colour};
use crate::config::HostConfig;
use crate::constants::BACKGROUND_COLOUR;
use crate::error::{SimError, SimResult};
use crate::session::SimulationCore;
use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

// Falling further behind than this drops the backlog instead of replaying it
const MAX_BACKLOG_TICKS: u32 = 5;

/// Drives `SimulationCore::step` at a fixed rate.
///
/// Stopping clears any accumulated time, so a stop/start cycle never
/// replays ticks that were due while stopped.
#[derive(Debug)]
pub struct HostLoopController {
    config: HostConfig,
    timestep: Duration,
    time_accumulator: Duration,
    running: bool,
    ticks_run: u64,
}

impl HostLoopController {
    pub fn new(config: HostConfig) -> SimResult<Self> {
        if config.fps == 0 {
            return Err(SimError::InvalidArgument("frame rate must be positive".to_string()));
        }
        let timestep = Duration::from_secs_f64(1.0 / config.fps as f64);
        Ok(Self {
            config,
            timestep,
            time_accumulator: Duration::ZERO,
            running: false,
            ticks_run: 0,
        })
    }

    pub fn start(&mut self) {
        if self.running {
            log::debug!("Loop already running");
            return;
        }
        self.time_accumulator = Duration::ZERO;
        self.running = true;
        log::info!(
            "Loop started at {} fps, inverse spawn rate {}",
            self.config.fps,
            self.config.inverse_spawn_rate
        );
    }

    pub fn stop(&mut self) {
        if self.running {
            log::info!("Loop stopped after {} ticks", self.ticks_run);
        }
        self.running = false;
        self.time_accumulator = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    pub fn set_inverse_spawn_rate(&mut self, inverse_spawn_rate: i64) {
        self.config.inverse_spawn_rate = inverse_spawn_rate;
    }

    /// Feeds `elapsed` wall time into the loop and runs every tick that has
    /// come due, at most `MAX_BACKLOG_TICKS` of them. Returns how many ticks ran.
    pub fn pump(&mut self, core: &mut SimulationCore, elapsed: Duration) -> SimResult<u32> {
        if !self.running {
            return Ok(0);
        }
        self.time_accumulator += elapsed;
        let max_backlog = self.timestep * MAX_BACKLOG_TICKS;
        if self.time_accumulator > max_backlog {
            log::warn!(
                "Loop fell behind by {:?}, dropping the backlog",
                self.time_accumulator
            );
            self.time_accumulator = max_backlog;
        }
        let mut ran = 0;
        while self.running && self.time_accumulator >= self.timestep {
            self.time_accumulator -= self.timestep;
            self.tick(core)?;
            ran += 1;
        }
        Ok(ran)
    }

    /// Runs up to `count` ticks back to back, without pacing.
    pub fn run_ticks(&mut self, core: &mut SimulationCore, count: u64) -> SimResult<()> {
        for _ in 0..count {
            if !self.running {
                break;
            }
            self.tick(core)?;
        }
        Ok(())
    }

    /// Paced loop: ticks, hands the core to `on_frame`, then sleeps until the
    /// next deadline. Returns when stopped, when the configured tick budget
    /// is spent, or when `on_frame` breaks.
    pub fn run<F>(&mut self, core: &mut SimulationCore, mut on_frame: F) -> SimResult<()>
    where
        F: FnMut(&SimulationCore) -> ControlFlow<()>,
    {
        self.start();
        let mut next_deadline = Instant::now();
        while self.running {
            self.tick(core)?;
            if on_frame(core).is_break() {
                self.stop();
                break;
            }

            next_deadline += self.timestep;
            let now = Instant::now();
            if next_deadline > now {
                thread::sleep(next_deadline - now);
            } else if now - next_deadline > self.timestep * MAX_BACKLOG_TICKS {
                log::warn!("Loop fell behind by {:?}, resynchronising", now - next_deadline);
                next_deadline = now;
            }
        }
        Ok(())
    }

    fn tick(&mut self, core: &mut SimulationCore) -> SimResult<()> {
        if let Err(err) = core.step(self.config.inverse_spawn_rate) {
            log::error!("Simulation halted at tick {}: {}", self.ticks_run, err);
            self.stop();
            return Err(err);
        }
        self.ticks_run += 1;
        if self.config.ticks.is_some_and(|limit| self.ticks_run >= limit) {
            self.stop();
        }
        Ok(())
    }
}

/// Where the drawing surface sits in client (page/window) coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SurfaceOrigin {
    pub left: f64,
    pub top: f64,
}

impl SurfaceOrigin {
    /// Converts a pointer position into surface-local pixels.
    pub fn to_local(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        (client_x - self.left, client_y - self.top)
    }
}

/// Everything needed to paint one frame: clear to `background`, then fill
/// one square per instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub background: Colour,
    pub instances: Vec<AgentInstance>,
}

impl Frame {
    pub fn capture(core: &SimulationCore) -> SimResult<Self> {
        let [r, g, b] = BACKGROUND_COLOUR;
        Ok(Self {
            background: Colour { r, g, b },
            instances: core.agent_instances()?,
        })
    }
}
