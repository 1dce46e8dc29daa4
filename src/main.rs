use neural_network_evolution::{HostConfig, HostLoopController, SimulationConfig, SimulationCore};
use std::ops::ControlFlow;
use std::time::Instant;

const STATS_INTERVAL_SECS: f64 = 4.0;

// --- Main Function ---
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let simulation_config = SimulationConfig::new().with_env_overrides()?;
    let host_config = HostConfig::default().with_env_overrides()?;

    let mut core = SimulationCore::new(simulation_config);
    let handle = core.initialize()?;
    log::info!("Session {} started (seed {:?})", handle.session, handle.seed);

    let mut host = HostLoopController::new(host_config)?;
    let mut last_stats_time = Instant::now();

    let result = host.run(&mut core, |core| {
        if last_stats_time.elapsed().as_secs_f64() >= STATS_INTERVAL_SECS {
            last_stats_time = Instant::now();
            match core.stats() {
                Ok(stats) => log::info!(
                    "Tick {}: {} alive (peak {}), {} spawned, {} eaten, {} aged out",
                    stats.tick,
                    stats.alive,
                    stats.peak,
                    stats.spawned,
                    stats.eaten,
                    stats.died_of_age
                ),
                Err(err) => {
                    log::error!("Could not read population stats: {err}");
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    });

    if let Err(err) = result {
        log::error!("An error has occurred, simulation stopped: {err}");
        return Err(err.into());
    }

    let stats = core.stats()?;
    log::info!(
        "Finished after {} ticks with {} agents alive",
        stats.tick,
        stats.alive
    );
    Ok(())
}
