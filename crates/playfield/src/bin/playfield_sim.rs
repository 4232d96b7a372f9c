//! # PLAYFIELD Headless Simulator
//!
//! Runs a preset without a display and reports what happened.
//!
//! ```bash
//! # Summary table
//! ./playfield_sim --preset ball-pit --frames 600
//!
//! # Final particle states as JSON, tuned by a config file
//! ./playfield_sim --preset petals --frames 1200 --config engine.toml --seed 7 --json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use playfield::engine::presets::{self, Color, NavTarget, PALETTE};
use playfield::engine::{Particle, ParticleState};
use playfield::{
    ClockMode, EngineConfig, EngineResult, FrameLoop, FrameLoopConfig, FrameStatsAccumulator,
    InstanceBuffer, Preset, Session, Simulation, Vec2,
};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Headless PLAYFIELD preset runner.
#[derive(Debug, Parser)]
#[command(name = "playfield_sim", version, about)]
struct Args {
    /// Preset to run (nav-bubbles, ball-pit, roulette, sand-clock, coin-shower, petals).
    #[arg(long, default_value = "ball-pit")]
    preset: Preset,

    /// Frames to simulate.
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Frame rate; sets the simulated clock.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Engine TOML replacing the preset's tuning.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for layouts and feeding.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Space width in pixels.
    #[arg(long, default_value_t = 800.0)]
    width: f32,

    /// Space height in pixels.
    #[arg(long, default_value_t = 600.0)]
    height: f32,

    /// Pace frames in real time instead of as fast as possible.
    #[arg(long)]
    realtime: bool,

    /// Print final particle states as JSON.
    #[arg(long)]
    json: bool,
}

/// One particle's final state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParticleSnapshot {
    id: u32,
    state: &'static str,
    position: Vec2,
    velocity: Vec2,
    size: Vec2,
    settle_index: Option<u32>,
    label: Option<String>,
}

/// Everything the run produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    preset: String,
    frames: u64,
    avg_frame_ms: f64,
    wall_hits: u64,
    collisions: u64,
    settled: u64,
    retired: u64,
    pocket: Option<u8>,
    particles: Vec<ParticleSnapshot>,
}

fn no_label<M>(_: &M) -> Option<String> {
    None
}

fn snapshot<M>(particle: &Particle<M>, label: Option<String>) -> ParticleSnapshot {
    ParticleSnapshot {
        id: particle.id().0,
        state: match particle.state() {
            ParticleState::Free => "free",
            ParticleState::Settled => "settled",
            ParticleState::Dragged => "dragged",
        },
        position: particle.position(),
        velocity: particle.velocity(),
        size: particle.extent().size(),
        settle_index: particle.settle_index(),
        label,
    }
}

/// Runs `sim` for the requested frames, calling `feed` before each frame.
fn simulate<M, F>(
    args: &Args,
    sim: Simulation<M>,
    label: impl Fn(&M) -> Option<String>,
    mut feed: F,
) -> EngineResult<(FrameStatsAccumulator, Vec<ParticleSnapshot>)>
where
    F: FnMut(&mut Simulation<M>, u64) -> EngineResult<()>,
{
    let config = FrameLoopConfig {
        target_fps: args.fps,
        clock: if args.realtime { ClockMode::Realtime } else { ClockMode::Fixed },
        enable_timing_logs: true,
    };
    let mut frame_loop = FrameLoop::new(Session::new(sim), config)?;
    let mut instances = InstanceBuffer::new();
    frame_loop.run(args.frames, &mut instances, |session, index| {
        feed(session.simulation_mut(), index)
    })?;
    info!(
        instances = instances.instances().len(),
        bytes = instances.as_bytes().len(),
        "last frame packed"
    );

    let stats = frame_loop.stats().clone();
    let session = frame_loop.finish();
    let particles = session
        .simulation()
        .particles()
        .iter()
        .map(|p| snapshot(p, label(&p.metadata)))
        .collect();
    Ok((stats, particles))
}

fn run(args: &Args) -> EngineResult<RunReport> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => args.preset.config(),
    };
    let (width, height, seed) = (args.width, args.height, args.seed);
    let mut pocket = None;

    let (stats, particles) = match args.preset {
        Preset::NavBubbles => {
            let targets = vec![
                NavTarget::new("Home", "/"),
                NavTarget::new("Work", "/work"),
                NavTarget::new("Lab", "/lab"),
                NavTarget::new("About", "/about"),
                NavTarget::new("Contact", "/contact"),
            ];
            let sim = presets::nav_bubbles(config, width, height, targets, seed)?;
            simulate(args, sim, |t: &NavTarget| Some(t.label.clone()), |_, _| Ok(()))?
        }
        Preset::BallPit => {
            let sim = presets::ball_pit(config, width, height, seed)?;
            // Rock the device slowly left and right.
            simulate(args, sim, |c: &Color| Some(c.to_string()), |sim, index| {
                sim.set_device_tilt((index as f32 / 90.0).sin() * 6.0, 9.8);
                Ok(())
            })?
        }
        Preset::Roulette => {
            let radius = width.min(height) * 0.5;
            let (sim, wheel) = presets::roulette(config, radius, 12.0, seed)?;
            let result = simulate(args, sim, no_label, |_, _| Ok(()))?;
            pocket = result.1.first().map(|ball| wheel.pocket_at(ball.position + ball.size * 0.5));
            result
        }
        Preset::SandClock => {
            let sim = presets::sand_clock(config, width, height)?;
            let center = width * 0.5;
            simulate(args, sim, no_label, move |sim, index| {
                let jitter = ((index * 7 + seed) % 9) as f32 - 4.0;
                presets::drop_grain(sim, center + jitter).map(|_| ())
            })?
        }
        Preset::CoinShower => {
            let sim = presets::coin_shower(config, width, height)?;
            simulate(args, sim, |n: &u32| Some(n.to_string()), move |sim, index| {
                if index % 30 == 0 {
                    presets::drop_coins(sim, 5, seed + index)?;
                }
                Ok(())
            })?
        }
        Preset::Petals => {
            let sim = presets::petals(config, width, height)?;
            simulate(args, sim, |c: &Color| Some(c.to_string()), move |sim, index| {
                if index % 4 == 0 {
                    let step = (index / 4 + seed) as usize;
                    let x = ((step * 97) % 1000) as f32 / 1000.0 * width;
                    let radius = 6.0 + (step % 5) as f32;
                    let x = x.max(radius).min(width - radius);
                    presets::drop_petal(sim, x, radius, PALETTE[step % PALETTE.len()])?;
                }
                Ok(())
            })?
        }
    };

    if !args.json {
        stats.print_summary();
    }
    Ok(RunReport {
        preset: args.preset.to_string(),
        frames: stats.frames_recorded,
        avg_frame_ms: stats.avg_frame_ms(),
        wall_hits: stats.wall_hits,
        collisions: stats.collisions,
        settled: stats.settled,
        retired: stats.retired,
        pocket,
        particles,
    })
}

fn main() -> ExitCode {
    // Logs go to stderr so --json output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(preset = %args.preset, frames = args.frames, fps = args.fps, "simulation starting");

    let report = match run(&args) {
        Ok(report) => report,
        Err(err) => {
            error!(%err, "simulation failed");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                error!(%err, "report failed to encode");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("Preset:      {}", report.preset);
        println!("Particles:   {}", report.particles.len());
        if let Some(pocket) = report.pocket {
            println!("Pocket:      {pocket}");
        }
    }
    ExitCode::SUCCESS
}
