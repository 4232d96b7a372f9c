//! # Tuning Constants
//!
//! Named defaults for every physics and interaction constant.
//!
//! The demos these values come from tune them per effect (wall damping
//! anywhere from 0.7 to 0.98). They are defaults only: every one of them is
//! overridable through the engine configuration, and presets keep their own
//! per-effect values.

// =============================================================================
// FRAME
// =============================================================================

/// Display refresh rate the engine is tuned for (frames per second).
pub const TARGET_FPS: u32 = 60;

/// Frame delta in display frames. Velocities are pixels per frame.
pub const DEFAULT_FRAME_DELTA: f32 = 1.0;

// =============================================================================
// FORCES
// =============================================================================

/// Downward gravity in pixels per frame squared.
pub const DEFAULT_GRAVITY: f32 = 0.5;

/// Per-frame velocity retention from air drag (1.0 = no drag).
pub const DEFAULT_AIR_DRAG: f32 = 1.0;

/// Scale from device accelerometer m/s^2 to pixels per frame squared.
pub const DEFAULT_ACCELEROMETER_SCALE: f32 = 0.05;

// =============================================================================
// COLLISIONS
// =============================================================================

/// Velocity retained after a wall bounce.
pub const DEFAULT_WALL_RESTITUTION: f32 = 0.8;

/// Velocity retained after a particle-particle collision.
pub const DEFAULT_PAIR_DAMPING: f32 = 0.9;

/// Contact tolerance in pixels used by resting/support checks.
pub const CONTACT_TOLERANCE: f32 = 1.0;

// =============================================================================
// DRAG / THROW
// =============================================================================

/// A release sooner than this after the press can be a click (milliseconds).
pub const CLICK_MAX_DURATION_MS: u64 = 200;

/// A release closer than this to the press point can be a click (pixels).
pub const CLICK_MAX_DISTANCE: f32 = 5.0;

/// Release velocity per pixel of drag displacement.
pub const THROW_MULTIPLIER: f32 = 0.1;

// =============================================================================
// DEFORMATION (cosmetic)
// =============================================================================

/// Window over which squash/stretch decays after an impact (milliseconds).
pub const DEFORM_WINDOW_MS: u64 = 4_000;

/// Oscillation cycles within the deformation window.
pub const DEFORM_CYCLES: f32 = 4.0;

/// Peak squash amplitude (fraction of size).
pub const DEFORM_AMPLITUDE: f32 = 0.2;

// =============================================================================
// SETTLING
// =============================================================================

/// Speed below which a velocity-settled particle comes to rest.
pub const DEFAULT_SETTLE_SPEED: f32 = 0.5;

/// How many columns either side of the drop point a stacking grain may slide.
pub const DEFAULT_STACK_SPREAD: u32 = 3;

/// Largest stack spread a config may ask for.
pub const MAX_STACK_SPREAD: u32 = 1024;

// =============================================================================
// INPUT
// =============================================================================

/// Capacity of the pointer event queue.
pub const POINTER_QUEUE_CAPACITY: usize = 256;

// =============================================================================
// HTTP API
// =============================================================================

/// Placeholder returned when no lyrics can be found.
pub const LYRICS_UNAVAILABLE: &str = "Lyrics not available for this track";

/// `source` value accompanying the placeholder.
pub const LYRICS_SOURCE_UNAVAILABLE: &str = "unavailable";

/// Default server bind address.
pub const SERVER_BIND: &str = "0.0.0.0:3000";
