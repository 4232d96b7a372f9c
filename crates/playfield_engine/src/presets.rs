//! # Effect Presets
//!
//! Ready-made simulations for each effect. Every preset keeps its own
//! tuning (bubble bounces are lossless, the ball pit loses 10% per contact,
//! sand barely bounces) instead of sharing one set of values.
//!
//! | Preset        | Space          | Settling                    |
//! |---------------|----------------|-----------------------------|
//! | `nav-bubbles` | rect           | never                       |
//! | `ball-pit`    | rect           | never                       |
//! | `roulette`    | circle         | total speed, no support     |
//! | `sand-clock`  | rect, open top | floor slots                 |
//! | `coin-shower` | rect, open top | retire on floor             |
//! | `petals`      | rect, open top | vertical speed with support |
//!
//! Random layouts are seeded so the same seed always yields the same scene.

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use playfield_shared::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{EngineConfig, PhysicsConfig, SettlePolicy};
use crate::error::{EngineError, EngineResult};
use crate::particle::{ParticleId, Spawn};
use crate::simulation::Simulation;
use crate::space::{Space, Walls};

/// Balls in the ball pit.
pub const BALL_PIT_COUNT: usize = 333;

/// Pockets on a European roulette wheel.
pub const ROULETTE_POCKETS: usize = 37;

/// Pocket numbers clockwise from the zero.
const POCKET_ORDER: [u8; ROULETTE_POCKETS] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

/// An sRGB color carried as particle metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Color {
    /// Creates a color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Ball pit palette.
pub const PALETTE: [Color; 6] = [
    Color::rgb(0xe6, 0x39, 0x46),
    Color::rgb(0xf4, 0xa2, 0x61),
    Color::rgb(0xe9, 0xc4, 0x6a),
    Color::rgb(0x2a, 0x9d, 0x8f),
    Color::rgb(0x45, 0x7b, 0x9d),
    Color::rgb(0x9b, 0x5d, 0xe5),
];

/// Where a navigation bubble leads when clicked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavTarget {
    /// Text drawn on the bubble.
    pub label: String,
    /// Destination path.
    pub href: String,
}

impl NavTarget {
    /// Creates a target.
    #[must_use]
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

// ============================================================================
// PRESET CATALOGUE
// ============================================================================

/// The built-in effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Lossless bouncing navigation bubbles.
    NavBubbles,
    /// 333 tilt-driven balls.
    BallPit,
    /// A ball spinning round a roulette bowl.
    Roulette,
    /// Sand grains stacking on the floor, one per tick.
    SandClock,
    /// Coins falling through the floor.
    CoinShower,
    /// Flower petals piling up.
    Petals,
}

impl Preset {
    /// Every preset.
    pub const ALL: [Self; 6] = [
        Self::NavBubbles,
        Self::BallPit,
        Self::Roulette,
        Self::SandClock,
        Self::CoinShower,
        Self::Petals,
    ];

    /// Kebab-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NavBubbles => "nav-bubbles",
            Self::BallPit => "ball-pit",
            Self::Roulette => "roulette",
            Self::SandClock => "sand-clock",
            Self::CoinShower => "coin-shower",
            Self::Petals => "petals",
        }
    }

    /// The preset's tuning.
    #[must_use]
    pub fn config(self) -> EngineConfig {
        let physics = PhysicsConfig::default();
        match self {
            Self::NavBubbles => EngineConfig {
                physics: PhysicsConfig {
                    gravity: 0.0,
                    wall_restitution: 1.0,
                    pair_damping: 1.0,
                    ..physics
                },
                ..EngineConfig::default()
            },
            Self::BallPit => EngineConfig {
                physics: PhysicsConfig {
                    wall_restitution: 0.8,
                    pair_damping: 0.9,
                    ..physics
                },
                ..EngineConfig::default()
            },
            Self::Roulette => EngineConfig {
                physics: PhysicsConfig {
                    gravity: 0.0,
                    air_drag: 0.99,
                    wall_restitution: 0.7,
                    pairwise: false,
                    ..physics
                },
                settle: SettlePolicy::Velocity {
                    max_speed: 0.05,
                    vertical_only: false,
                    require_support: false,
                },
                ..EngineConfig::default()
            },
            Self::SandClock => EngineConfig {
                physics: PhysicsConfig {
                    gravity: 0.3,
                    wall_restitution: 0.0,
                    pairwise: false,
                    ..physics
                },
                settle: SettlePolicy::Stack {
                    slot_size: 4.0,
                    spread: playfield_shared::constants::DEFAULT_STACK_SPREAD,
                },
                ..EngineConfig::default()
            },
            Self::CoinShower => EngineConfig {
                physics: PhysicsConfig {
                    wall_restitution: 0.7,
                    pairwise: false,
                    ..physics
                },
                settle: SettlePolicy::Retire,
                ..EngineConfig::default()
            },
            Self::Petals => EngineConfig {
                physics: PhysicsConfig {
                    gravity: 0.2,
                    air_drag: 0.98,
                    wall_restitution: 0.3,
                    pair_damping: 0.7,
                    ..physics
                },
                settle: SettlePolicy::Velocity {
                    max_speed: playfield_shared::constants::DEFAULT_SETTLE_SPEED,
                    vertical_only: true,
                    require_support: true,
                },
                ..EngineConfig::default()
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().replace('_', "-").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == key)
            .ok_or_else(|| EngineError::InvalidConfig(format!("unknown preset '{s}'")))
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Radius of a navigation bubble.
pub const BUBBLE_RADIUS: f32 = 48.0;

/// Navigation bubbles drifting without gravity, one per target.
///
/// # Errors
///
/// Returns an error if `config` is invalid or the bubbles do not fit.
pub fn nav_bubbles(
    config: EngineConfig,
    width: f32,
    height: f32,
    targets: Vec<NavTarget>,
    seed: u64,
) -> EngineResult<Simulation<NavTarget>> {
    let mut sim = Simulation::new(config, Space::rect(width, height))?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let span = fit_span(width, height, BUBBLE_RADIUS * 2.0)?;

    sim.spawn_many(targets.into_iter().map(|target| {
        let position = Vec2::new(rng.gen_range(0.0..=span.x), rng.gen_range(0.0..=span.y));
        let velocity = Vec2::new(rng.gen_range(-2.0..=2.0), rng.gen_range(-2.0..=2.0));
        Spawn::circle(BUBBLE_RADIUS, position, target).with_velocity(velocity)
    }))?;
    Ok(sim)
}

/// The 333-ball pit with random sizes and colors.
///
/// Tilt it with [`Simulation::set_device_tilt`].
///
/// # Errors
///
/// Returns an error if `config` is invalid or the balls do not fit.
pub fn ball_pit(
    config: EngineConfig,
    width: f32,
    height: f32,
    seed: u64,
) -> EngineResult<Simulation<Color>> {
    let mut sim = Simulation::new(config, Space::rect(width, height))?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let max_radius = 12.0_f32;
    let span = fit_span(width, height, max_radius * 2.0)?;

    sim.spawn_many((0..BALL_PIT_COUNT).map(|_| {
        let radius = rng.gen_range(6.0..=max_radius);
        let position = Vec2::new(rng.gen_range(0.0..=span.x), rng.gen_range(0.0..=span.y));
        let color = PALETTE[rng.gen_range(0..PALETTE.len())];
        Spawn::circle(radius, position, color)
    }))?;
    Ok(sim)
}

/// Roulette ball radius.
pub const ROULETTE_BALL_RADIUS: f32 = 6.0;

/// A spinning wheel: maps where the ball stops to a pocket number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouletteWheel {
    /// Wheel center.
    pub center: Vec2,
    /// Angle of the zero pocket's leading edge, in radians.
    pub rotation: f32,
}

impl RouletteWheel {
    /// Pocket number under `point`.
    #[must_use]
    pub fn pocket_at(&self, point: Vec2) -> u8 {
        let offset = point - self.center;
        let angle = (offset.y.atan2(offset.x) - self.rotation).rem_euclid(TAU);
        let width = TAU / ROULETTE_POCKETS as f32;
        let index = ((angle / width) as usize).min(ROULETTE_POCKETS - 1);
        POCKET_ORDER[index]
    }
}

/// A ball launched clockwise along the rim of a bowl of `radius`.
///
/// # Errors
///
/// Returns an error if `config` is invalid or the bowl is smaller than the
/// ball.
pub fn roulette(
    config: EngineConfig,
    radius: f32,
    launch_speed: f32,
    seed: u64,
) -> EngineResult<(Simulation<()>, RouletteWheel)> {
    if radius <= ROULETTE_BALL_RADIUS * 2.0 {
        return Err(EngineError::InvalidConfig(format!(
            "roulette radius {radius} is too small"
        )));
    }
    let center = Vec2::new(radius, radius);
    let mut sim = Simulation::new(config, Space::circle(center, radius))?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let wheel = RouletteWheel {
        center,
        rotation: rng.gen_range(0.0..TAU),
    };

    // Start at the top of the rim, moving along the tangent.
    let orbit = radius - ROULETTE_BALL_RADIUS;
    let ball_center = center - Vec2::Y * orbit;
    let offset = Vec2::new(ROULETTE_BALL_RADIUS, ROULETTE_BALL_RADIUS);
    sim.spawn(
        Spawn::circle(ROULETTE_BALL_RADIUS, ball_center - offset, ())
            .with_velocity(Vec2::X * launch_speed),
    )?;
    Ok((sim, wheel))
}

/// An hourglass floor filled grain by grain with [`drop_grain`].
///
/// # Errors
///
/// Returns an error if `config` is invalid.
pub fn sand_clock(config: EngineConfig, width: f32, height: f32) -> EngineResult<Simulation<()>> {
    let space = Space::Rect {
        width,
        height,
        walls: Walls::OPEN_TOP,
    };
    Simulation::new(config, space)
}

/// Drops one grain from above the top edge at horizontal position `x`.
///
/// The grain is one stack slot square.
///
/// # Errors
///
/// Returns [`EngineError::NonFinite`] if `x` is not finite.
pub fn drop_grain(sim: &mut Simulation<()>, x: f32) -> EngineResult<ParticleId> {
    let size = match sim.config().settle {
        SettlePolicy::Stack { slot_size, .. } => slot_size,
        _ => 4.0,
    };
    sim.spawn(Spawn::rect(size, size, Vec2::new(x - size * 0.5, -size), ()))
}

/// Coin width and height.
pub const COIN_SIZE: Vec2 = Vec2::new(24.0, 24.0);

/// A payout tray coins fall through; add coins with [`drop_coins`].
///
/// # Errors
///
/// Returns an error if `config` is invalid.
pub fn coin_shower(config: EngineConfig, width: f32, height: f32) -> EngineResult<Simulation<u32>> {
    let space = Space::Rect {
        width,
        height,
        walls: Walls::OPEN_TOP,
    };
    Simulation::new(config, space)
}

/// Drops `count` coins from above the tray; metadata is the coin number.
///
/// # Errors
///
/// Returns an error if the tray is narrower than a coin.
pub fn drop_coins(
    sim: &mut Simulation<u32>,
    count: u32,
    seed: u64,
) -> EngineResult<Vec<ParticleId>> {
    let Space::Rect { width, .. } = *sim.space() else {
        return Err(EngineError::InvalidConfig("coins need a rect space".to_string()));
    };
    if width < COIN_SIZE.x {
        return Err(EngineError::InvalidConfig(format!(
            "tray width {width} is narrower than a coin"
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    sim.spawn_many((0..count).map(|n| {
        let x = rng.gen_range(0.0..=width - COIN_SIZE.x);
        let y = -COIN_SIZE.y - rng.gen_range(0.0..=200.0);
        let velocity = Vec2::new(rng.gen_range(-1.5..=1.5), rng.gen_range(0.0..=2.0));
        Spawn::rect(COIN_SIZE.x, COIN_SIZE.y, Vec2::new(x, y), n).with_velocity(velocity)
    }))
}

/// A floor petals drift down onto and pile up.
///
/// # Errors
///
/// Returns an error if `config` is invalid.
pub fn petals(config: EngineConfig, width: f32, height: f32) -> EngineResult<Simulation<Color>> {
    let space = Space::Rect {
        width,
        height,
        walls: Walls::OPEN_TOP,
    };
    Simulation::new(config, space)
}

/// Drops a petal of `radius` above horizontal position `x`.
///
/// # Errors
///
/// Returns an error if the petal is not finite or not positive.
pub fn drop_petal(
    sim: &mut Simulation<Color>,
    x: f32,
    radius: f32,
    color: Color,
) -> EngineResult<ParticleId> {
    sim.spawn(Spawn::circle(radius, Vec2::new(x - radius, -radius * 2.0), color))
}

/// Range of top-left positions that keep an item of `size` inside.
fn fit_span(width: f32, height: f32, size: f32) -> EngineResult<Vec2> {
    if width < size || height < size {
        return Err(EngineError::InvalidConfig(format!(
            "{width}x{height} space cannot fit a {size} pixel particle"
        )));
    }
    Ok(Vec2::new(width - size, height - size))
}
