//! Cosmetic squash/stretch after wall impacts.
//!
//! Derived from `now - impact.at` only; never written back into physical
//! state. The squash oscillates `cycles` times inside the window while an
//! exponential envelope decays it to nothing.

use std::time::Duration;

use crate::config::DeformConfig;
use crate::particle::{Axis, Impact};

/// Envelope decay rate over the normalized window (e^-5 at the end).
const DECAY_RATE: f32 = 5.0;

/// Render scale factors for one particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Squash {
    /// Horizontal scale.
    pub scale_x: f32,
    /// Vertical scale.
    pub scale_y: f32,
}

impl Squash {
    /// No deformation.
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        scale_y: 1.0,
    };
}

impl Default for Squash {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Squash for a particle whose last impact was `impact`, at time `now`.
#[must_use]
pub fn squash(config: &DeformConfig, impact: Option<Impact>, now: Duration) -> Squash {
    if !config.enabled {
        return Squash::IDENTITY;
    }
    let Some(impact) = impact else {
        return Squash::IDENTITY;
    };
    let window = config.window();
    let elapsed = now.saturating_sub(impact.at);
    if elapsed >= window {
        return Squash::IDENTITY;
    }

    let t = elapsed.as_secs_f32() / window.as_secs_f32();
    let envelope = (-DECAY_RATE * t).exp();
    let wave = (std::f32::consts::TAU * config.cycles * t).cos();
    let amount = config.amplitude * envelope * wave;

    match impact.axis {
        Axis::Horizontal => Squash {
            scale_x: 1.0 - amount,
            scale_y: 1.0 + amount,
        },
        Axis::Vertical => Squash {
            scale_x: 1.0 + amount,
            scale_y: 1.0 - amount,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> DeformConfig {
        DeformConfig {
            enabled: true,
            ..DeformConfig::default()
        }
    }

    #[test]
    fn test_peak_squash_at_impact() {
        let impact = Impact {
            at: Duration::from_secs(1),
            axis: Axis::Vertical,
        };
        let s = squash(&enabled(), Some(impact), Duration::from_secs(1));
        assert!((s.scale_y - 0.8).abs() < 1e-5);
        assert!((s.scale_x - 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_decays_to_identity_after_window() {
        let impact = Impact {
            at: Duration::ZERO,
            axis: Axis::Horizontal,
        };
        assert_eq!(squash(&enabled(), Some(impact), Duration::from_secs(4)), Squash::IDENTITY);
    }

    #[test]
    fn test_disabled_is_identity() {
        let impact = Impact {
            at: Duration::ZERO,
            axis: Axis::Horizontal,
        };
        assert_eq!(
            squash(&DeformConfig::default(), Some(impact), Duration::ZERO),
            Squash::IDENTITY
        );
    }
}
