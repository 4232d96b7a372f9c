//! # Engine Configuration
//!
//! Every tuning value the engine uses, grouped by concern and loadable from
//! TOML. Missing sections and keys fall back to the named defaults in
//! [`playfield_shared::constants`].
//!
//! ```toml
//! [physics]
//! gravity = 0.5
//! wall_restitution = 0.9
//! pair_damping = 0.9
//!
//! [drag]
//! click_max_duration_ms = 200
//! click_max_distance = 5.0
//! throw_multiplier = 0.1
//!
//! [settle]
//! policy = "velocity"
//! max_speed = 0.3
//! vertical_only = true
//! require_support = true
//! ```

use std::path::Path;
use std::time::Duration;

use playfield_shared::constants;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Forces, integration and collision response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration in pixels per frame squared.
    pub gravity: f32,
    /// Per-frame velocity retention (1.0 = no air drag).
    pub air_drag: f32,
    /// Velocity retained after a wall bounce, in `[0, 1]`.
    pub wall_restitution: f32,
    /// Velocity retained after a particle-particle collision, in `[0, 1]`.
    pub pair_damping: f32,
    /// Resolve circle-circle collisions at all.
    pub pairwise: bool,
    /// Frame delta in display frames.
    pub frame_delta: f32,
    /// Scale from device accelerometer readings to pixels per frame squared.
    pub accelerometer_scale: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: constants::DEFAULT_GRAVITY,
            air_drag: constants::DEFAULT_AIR_DRAG,
            wall_restitution: constants::DEFAULT_WALL_RESTITUTION,
            pair_damping: constants::DEFAULT_PAIR_DAMPING,
            pairwise: true,
            frame_delta: constants::DEFAULT_FRAME_DELTA,
            accelerometer_scale: constants::DEFAULT_ACCELEROMETER_SCALE,
        }
    }
}

/// Click-versus-throw discrimination for pointer drags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Pointer drags are accepted at all.
    pub enabled: bool,
    /// Releases quicker than this may count as a click (milliseconds).
    pub click_max_duration_ms: u64,
    /// Releases nearer than this to the press may count as a click (pixels).
    pub click_max_distance: f32,
    /// Release velocity per pixel of drag displacement.
    pub throw_multiplier: f32,
}

impl DragConfig {
    /// Click duration threshold as a `Duration`.
    #[must_use]
    pub fn click_max_duration(&self) -> Duration {
        Duration::from_millis(self.click_max_duration_ms)
    }
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            click_max_duration_ms: constants::CLICK_MAX_DURATION_MS,
            click_max_distance: constants::CLICK_MAX_DISTANCE,
            throw_multiplier: constants::THROW_MULTIPLIER,
        }
    }
}

/// Cosmetic squash/stretch after wall impacts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformConfig {
    /// Compute deformation at all.
    pub enabled: bool,
    /// Decay window after an impact (milliseconds).
    pub window_ms: u64,
    /// Oscillation cycles within the window.
    pub cycles: f32,
    /// Peak squash as a fraction of size.
    pub amplitude: f32,
}

impl DeformConfig {
    /// Decay window as a `Duration`.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for DeformConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_ms: constants::DEFORM_WINDOW_MS,
            cycles: constants::DEFORM_CYCLES,
            amplitude: constants::DEFORM_AMPLITUDE,
        }
    }
}

/// When a free particle comes to rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SettlePolicy {
    /// Particles never settle.
    #[default]
    Never,
    /// Particles drop into discrete floor slots (sand, balls in a cylinder).
    Stack {
        /// Width and height of one slot in pixels.
        slot_size: f32,
        /// Columns either side of the drop column a particle may land in, at
        /// most `MAX_STACK_SPREAD`.
        spread: u32,
    },
    /// Particles rest once slow enough (flower petals, roulette ball).
    Velocity {
        /// Speed below which the particle may settle.
        max_speed: f32,
        /// Compare vertical speed only instead of total speed.
        vertical_only: bool,
        /// Also require floor contact or a settled particle underneath.
        require_support: bool,
    },
    /// Particles leave the simulation on reaching the floor (falling coins).
    Retire,
}

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Forces and collision response.
    pub physics: PhysicsConfig,
    /// Pointer drag handling.
    pub drag: DragConfig,
    /// Cosmetic deformation.
    pub deform: DeformConfig,
    /// Settling policy.
    pub settle: SettlePolicy,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigParse`] for malformed TOML and
    /// [`EngineError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks every value is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> EngineResult<()> {
        let p = &self.physics;
        unit_interval("physics.air_drag", p.air_drag)?;
        unit_interval("physics.wall_restitution", p.wall_restitution)?;
        unit_interval("physics.pair_damping", p.pair_damping)?;
        finite("physics.gravity", p.gravity)?;
        finite("physics.accelerometer_scale", p.accelerometer_scale)?;
        if !(p.frame_delta.is_finite() && p.frame_delta > 0.0) {
            return Err(invalid("physics.frame_delta", "must be positive"));
        }

        let d = &self.drag;
        if !(d.click_max_distance.is_finite() && d.click_max_distance >= 0.0) {
            return Err(invalid("drag.click_max_distance", "must be non-negative"));
        }
        finite("drag.throw_multiplier", d.throw_multiplier)?;

        let f = &self.deform;
        if f.enabled {
            if f.window_ms == 0 {
                return Err(invalid("deform.window_ms", "must be positive"));
            }
            unit_interval("deform.amplitude", f.amplitude)?;
            finite("deform.cycles", f.cycles)?;
        }

        match self.settle {
            SettlePolicy::Stack { slot_size, spread } => {
                if !(slot_size.is_finite() && slot_size > 0.0) {
                    return Err(invalid("settle.slot_size", "must be positive"));
                }
                if spread > constants::MAX_STACK_SPREAD {
                    return Err(invalid(
                        "settle.spread",
                        &format!("must be at most {}", constants::MAX_STACK_SPREAD),
                    ));
                }
            }
            SettlePolicy::Velocity { max_speed, .. } => {
                if !(max_speed.is_finite() && max_speed >= 0.0) {
                    return Err(invalid("settle.max_speed", "must be non-negative"));
                }
            }
            SettlePolicy::Never | SettlePolicy::Retire => {}
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> EngineError {
    EngineError::InvalidConfig(format!("{key} {reason}"))
}

fn finite(key: &str, value: f32) -> EngineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(key, "must be finite"))
    }
}

fn unit_interval(key: &str, value: f32) -> EngineResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, "must be within [0, 1]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.drag.click_max_duration_ms, 200);
        assert_eq!(config.drag.throw_multiplier, 0.1);
        assert_eq!(config.settle, SettlePolicy::Never);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [physics]
            wall_restitution = 0.7

            [settle]
            policy = "stack"
            slot_size = 4.0
            spread = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.physics.wall_restitution, 0.7);
        assert_eq!(config.physics.pair_damping, 0.9);
        assert_eq!(
            config.settle,
            SettlePolicy::Stack {
                slot_size: 4.0,
                spread: 2
            }
        );
    }

    #[test]
    fn test_restitution_out_of_range_rejected() {
        let err = EngineConfig::from_toml_str("[physics]\nwall_restitution = 1.5\n").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(msg) if msg.contains("wall_restitution")));
    }

    #[test]
    fn test_stack_spread_is_bounded() {
        let at_bound = format!(
            "[settle]\npolicy = \"stack\"\nslot_size = 4.0\nspread = {}\n",
            constants::MAX_STACK_SPREAD
        );
        assert!(EngineConfig::from_toml_str(&at_bound).is_ok());

        let err = EngineConfig::from_toml_str(
            "[settle]\npolicy = \"stack\"\nslot_size = 4.0\nspread = 4294967295\n",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(msg) if msg.contains("settle.spread")));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = EngineConfig::from_toml_str("[physics\n").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }
}
