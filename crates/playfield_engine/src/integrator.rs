//! Semi-implicit Euler integration for free particles.
//!
//! Forces first, then position: `v += a·dt`, `v *= drag^dt`, `x += v·dt`.
//! Settled and dragged particles are skipped.

use playfield_shared::Vec2;

use crate::config::PhysicsConfig;
use crate::particle::Particle;

/// Converts a device accelerometer reading (m/s², device axes, y up the
/// screen) into a screen-space acceleration (+y down).
#[must_use]
pub fn device_acceleration(x: f32, y: f32, scale: f32) -> Vec2 {
    Vec2::new(-x * scale, y * scale)
}

/// Advances every free particle by one frame.
pub fn integrate<M>(particles: &mut [Particle<M>], acceleration: Vec2, physics: &PhysicsConfig) {
    let dt = physics.frame_delta;
    let drag = if (physics.air_drag - 1.0).abs() < f32::EPSILON {
        1.0
    } else {
        physics.air_drag.powf(dt)
    };

    for p in particles.iter_mut().filter(|p| p.is_free()) {
        p.velocity += acceleration * dt;
        p.velocity *= drag;
        p.position += p.velocity * dt;
    }
}
