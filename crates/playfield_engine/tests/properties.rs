//! Whole-engine properties: containment, energy, settling and lifecycle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use playfield_engine::presets::{self, Color};
use playfield_engine::{
    EngineConfig, HostResource, Particle, ParticleState, PhysicsConfig, PointerOutcome, Preset,
    Session, Simulation, Space, Spawn, Vec2,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const EPS: f32 = 1e-3;

fn at(frame: u64) -> Duration {
    Duration::from_millis(frame * 16)
}

fn kinetic_energy<M>(sim: &Simulation<M>) -> f32 {
    sim.particles().iter().map(|p| p.velocity().length_squared()).sum()
}

fn assert_inside<M>(p: &Particle<M>, width: f32, height: f32) {
    let pos = p.position();
    let size = p.extent().size();
    assert!(
        pos.x >= -EPS
            && pos.y >= -EPS
            && pos.x <= width - size.x + EPS
            && pos.y <= height - size.y + EPS,
        "particle {} escaped: {pos:?}",
        p.id()
    );
}

#[test]
fn test_ball_pit_stays_contained() {
    let (width, height) = (640.0, 480.0);
    let mut sim = presets::ball_pit(Preset::BallPit.config(), width, height, 42).unwrap();
    sim.set_device_tilt(4.0, 9.8);

    for frame in 1..=300 {
        sim.step(at(frame));
        for p in sim.particles() {
            assert_inside(p, width, height);
        }
    }
}

#[test]
fn test_rim_containment() {
    let (mut sim, wheel) = presets::roulette(Preset::Roulette.config(), 120.0, 15.0, 9).unwrap();
    for frame in 1..=500 {
        sim.step(at(frame));
        let ball = &sim.particles()[0];
        let reach = 120.0 - ball.extent().bounding_radius();
        assert!(ball.center().distance(wheel.center) <= reach + EPS);
    }
}

#[test]
fn test_damped_bounce_never_gains_energy() {
    let config = EngineConfig {
        physics: PhysicsConfig {
            gravity: 0.0,
            wall_restitution: 0.8,
            pair_damping: 0.9,
            ..PhysicsConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut sim = Simulation::new(config, Space::rect(400.0, 400.0)).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..60 {
        let position = Vec2::new(rng.gen_range(0.0..380.0), rng.gen_range(0.0..380.0));
        let velocity = Vec2::new(rng.gen_range(-6.0..6.0), rng.gen_range(-6.0..6.0));
        sim.spawn(Spawn::circle(10.0, position, ()).with_velocity(velocity)).unwrap();
    }

    let mut energy = kinetic_energy(&sim);
    for frame in 1..=400 {
        sim.step(at(frame));
        let next = kinetic_energy(&sim);
        assert!(next <= energy * (1.0 + 1e-4) + 1e-4, "frame {frame}: {energy} -> {next}");
        energy = next;
    }
}

#[test]
fn test_single_wall_bounce_scales_speed() {
    let config = EngineConfig {
        physics: PhysicsConfig {
            gravity: 0.0,
            wall_restitution: 0.7,
            ..PhysicsConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut sim = Simulation::new(config, Space::rect(100.0, 100.0)).unwrap();
    let id = sim
        .spawn(Spawn::circle(5.0, Vec2::new(85.0, 50.0), ()).with_velocity(Vec2::new(10.0, 0.0)))
        .unwrap();

    let report = sim.step(at(1));

    assert_eq!(report.wall_hits(), 1);
    let v = sim.particle(id).unwrap().velocity();
    assert!((v.x + 7.0).abs() < 1e-5);
}

#[test]
fn test_settled_grains_never_move() {
    let mut sim = presets::sand_clock(Preset::SandClock.config(), 80.0, 60.0).unwrap();
    let mut snapshot: Vec<(u32, Vec2)> = Vec::new();

    for frame in 1..=600_u64 {
        if frame % 5 == 0 {
            presets::drop_grain(&mut sim, 40.0).unwrap();
        }
        sim.step(at(frame));

        for (id, pos) in &snapshot {
            if let Some(p) = sim.particles().iter().find(|p| p.id().0 == *id) {
                assert_eq!(p.position(), *pos, "settled grain {id} moved");
            }
        }
        snapshot = sim
            .particles()
            .iter()
            .filter(|p| p.state() == ParticleState::Settled)
            .map(|p| (p.id().0, p.position()))
            .collect();
    }
    assert!(!snapshot.is_empty());
}

#[test]
fn test_full_sand_clock_retires_overflow_grain() {
    // Two columns of two slots.
    let mut sim = presets::sand_clock(Preset::SandClock.config(), 8.0, 8.0).unwrap();
    for _ in 0..4 {
        presets::drop_grain(&mut sim, 4.0).unwrap();
    }
    let mut frame = 0;
    while sim.particles().iter().any(|p| p.state() != ParticleState::Settled) {
        frame += 1;
        assert!(frame < 600, "grains never settled");
        assert!(sim.step(at(frame)).retired.is_empty());
    }
    let grid = sim.stack_grid().unwrap();
    assert_eq!((grid.height(0), grid.height(1)), (2, 2));
    let positions = |sim: &Simulation<()>| -> Vec<(u32, Vec2)> {
        sim.particles().iter().map(|p| (p.id().0, p.position())).collect()
    };
    let settled = positions(&sim);

    let extra = presets::drop_grain(&mut sim, 4.0).unwrap();
    assert_eq!(sim.particles().len(), 5);
    let report = sim.step(at(frame + 1));

    assert_eq!(report.retired.len(), 1);
    assert_eq!(report.retired[0].id(), extra);
    assert_eq!(sim.particles().len(), 4);
    assert!(sim.particles().iter().all(|p| p.id() != extra));
    assert_eq!(positions(&sim), settled);
}

#[test]
fn test_settled_petals_do_not_overlap() {
    let mut sim = presets::petals(Preset::Petals.config(), 200.0, 150.0).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for frame in 1..=1500_u64 {
        if frame % 10 == 0 && frame < 600 {
            let x = rng.gen_range(20.0..180.0);
            let radius = rng.gen_range(5.0..9.0);
            presets::drop_petal(&mut sim, x, radius, Color::rgb(255, 180, 200)).unwrap();
        }
        sim.step(at(frame));
    }

    let settled: Vec<_> = sim
        .particles()
        .iter()
        .filter(|p| p.state() == ParticleState::Settled)
        .collect();
    assert!(!settled.is_empty());
    for (i, a) in settled.iter().enumerate() {
        for b in &settled[i + 1..] {
            let gap = a.center().distance(b.center());
            let min = a.extent().bounding_radius() + b.extent().bounding_radius();
            assert!(gap + 1e-2 >= min, "{} and {} overlap", a.id(), b.id());
        }
    }
}

#[test]
fn test_click_versus_throw() {
    let mut sim: Simulation<()> =
        Simulation::new(EngineConfig::default(), Space::rect(300.0, 300.0)).unwrap();
    let id = sim.spawn(Spawn::circle(10.0, Vec2::new(90.0, 90.0), ())).unwrap();
    let grab = Vec2::new(100.0, 100.0);

    sim.pointer_down(grab, Duration::from_millis(1_000));
    let click = sim.pointer_up(grab + Vec2::new(2.0, 0.0), Duration::from_millis(1_100));
    assert_eq!(click, PointerOutcome::Clicked(id));
    assert_eq!(sim.particle(id).unwrap().velocity(), Vec2::ZERO);

    let start = sim.particle(id).unwrap().center();
    sim.pointer_down(start, Duration::from_millis(2_000));
    let throw = sim.pointer_up(start + Vec2::new(30.0, 40.0), Duration::from_millis(2_400));
    match throw {
        PointerOutcome::Thrown { id: thrown, velocity } => {
            assert_eq!(thrown, id);
            assert!((velocity.x - 3.0).abs() < 1e-4);
            assert!((velocity.y - 4.0).abs() < 1e-4);
        }
        other => panic!("expected a throw, got {other:?}"),
    }
}

struct Camera {
    released: Arc<Mutex<u32>>,
}

impl HostResource for Camera {
    fn name(&self) -> &str {
        "camera"
    }

    fn release(&mut self) {
        *self.released.lock().unwrap() += 1;
    }
}

#[test]
fn test_resources_released_once_on_every_path() {
    let make = || Simulation::<()>::new(EngineConfig::default(), Space::rect(10.0, 10.0)).unwrap();

    // Explicit stop, then drop.
    let released = Arc::new(Mutex::new(0));
    let mut session = Session::new(make());
    session.acquire(Box::new(Camera { released: released.clone() })).unwrap();
    session.start().unwrap();
    session.stop();
    drop(session);
    assert_eq!(*released.lock().unwrap(), 1);

    // Early return on error.
    let released = Arc::new(Mutex::new(0));
    let failing = || -> Result<(), playfield_engine::EngineError> {
        let mut session = Session::new(make());
        session.acquire(Box::new(Camera { released: released.clone() }))?;
        session.frame(Duration::ZERO)?;
        Ok(())
    };
    assert!(failing().is_err());
    assert_eq!(*released.lock().unwrap(), 1);

    // Unwinding.
    let released = Arc::new(Mutex::new(0));
    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut session = Session::new(make());
        session.acquire(Box::new(Camera { released: released.clone() })).unwrap();
        session.start().unwrap();
        panic!("page crashed");
    }));
    assert!(result.is_err());
    assert_eq!(*released.lock().unwrap(), 1);
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("playfield_engine_{}.toml", std::process::id()));
    let text = toml::to_string(&Preset::Petals.config()).unwrap();
    std::fs::write(&path, text).unwrap();

    let loaded = EngineConfig::from_toml_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, Preset::Petals.config());
}
