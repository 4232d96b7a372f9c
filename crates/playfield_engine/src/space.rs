//! # Simulation Space & Boundary Resolver
//!
//! The bounded region particles live in, and the wall response:
//! - Rect: axis-separated clamp, normal velocity reflected and scaled
//! - Circle: radial clamp against a rim, radial velocity reflected
//!
//! Only walls that exist are enforced; an open top lets sand and coins
//! fall in from above the viewport.

use std::time::Duration;

use playfield_shared::Vec2;
use serde::{Deserialize, Serialize};

use crate::particle::{Axis, Impact, Particle};

/// Which sides of a rectangular space are solid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walls {
    /// x = 0
    pub left: bool,
    /// x = width
    pub right: bool,
    /// y = 0
    pub top: bool,
    /// y = height
    pub bottom: bool,
}

impl Walls {
    /// Solid on every side.
    pub const ALL: Self = Self {
        left: true,
        right: true,
        top: true,
        bottom: true,
    };

    /// Solid everywhere except the top.
    pub const OPEN_TOP: Self = Self {
        left: true,
        right: true,
        top: false,
        bottom: true,
    };
}

impl Default for Walls {
    fn default() -> Self {
        Self::ALL
    }
}

/// A wall that was hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wall {
    /// x = 0
    Left,
    /// x = width
    Right,
    /// y = 0
    Top,
    /// y = height
    Bottom,
    /// Circular rim.
    Rim,
}

/// The bounded 2D region of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Space {
    /// Rectangle from the origin to `(width, height)`.
    Rect {
        /// Width in pixels.
        width: f32,
        /// Height in pixels.
        height: f32,
        /// Solid sides.
        #[serde(default)]
        walls: Walls,
    },
    /// Disc bounded by a rim.
    Circle {
        /// Rim center.
        center: Vec2,
        /// Rim radius.
        radius: f32,
    },
}

impl Space {
    /// A fully walled rectangle.
    #[must_use]
    pub const fn rect(width: f32, height: f32) -> Self {
        Self::Rect {
            width,
            height,
            walls: Walls::ALL,
        }
    }

    /// A disc centered at `center`.
    #[must_use]
    pub const fn circle(center: Vec2, radius: f32) -> Self {
        Self::Circle { center, radius }
    }

    pub(crate) fn is_valid(&self) -> bool {
        match *self {
            Self::Rect { width, height, .. } => {
                width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0
            }
            Self::Circle { center, radius } => {
                center.is_finite() && radius.is_finite() && radius > 0.0
            }
        }
    }

    /// Floor height for rect spaces.
    #[must_use]
    pub fn floor(&self) -> Option<f32> {
        match *self {
            Self::Rect { height, .. } => Some(height),
            Self::Circle { .. } => None,
        }
    }

    /// True if the particle touches the floor (rect) or rim (circle),
    /// within `tolerance` pixels.
    pub(crate) fn touches_floor<M>(&self, p: &Particle<M>, tolerance: f32) -> bool {
        match *self {
            Self::Rect { height, walls, .. } => {
                walls.bottom && p.position.y + p.extent().size().y >= height - tolerance
            }
            Self::Circle { center, radius } => {
                p.center().distance(center) + p.extent().bounding_radius() >= radius - tolerance
            }
        }
    }

    /// Clamps a bounding box position so the whole extent lies inside,
    /// regardless of which walls are solid. Used for dragging.
    pub(crate) fn clamp_position(&self, position: Vec2, size: Vec2) -> Vec2 {
        match *self {
            Self::Rect { width, height, .. } => Vec2::new(
                position.x.clamp(0.0, (width - size.x).max(0.0)),
                position.y.clamp(0.0, (height - size.y).max(0.0)),
            ),
            Self::Circle { center, radius } => {
                let half = size * 0.5;
                let reach = (radius - half.length()).max(0.0);
                let offset = position + half - center;
                if offset.length() > reach {
                    let dir = offset.normalized().unwrap_or(Vec2::X);
                    center + dir * reach - half
                } else {
                    position
                }
            }
        }
    }
}

/// Clamps a particle back inside the space and reflects its velocity.
///
/// Returns the wall hit, if any. The normal velocity component is reversed
/// and scaled by `restitution` only while it points out of the space.
pub fn resolve_boundary<M>(
    particle: &mut Particle<M>,
    space: &Space,
    restitution: f32,
    now: Duration,
) -> Option<Wall> {
    let size = particle.extent().size();
    let mut hit = None;

    match *space {
        Space::Rect {
            width,
            height,
            walls,
        } => {
            let pos = &mut particle.position;
            let vel = &mut particle.velocity;

            if walls.left && pos.x < 0.0 {
                pos.x = 0.0;
                if vel.x < 0.0 {
                    vel.x = -vel.x * restitution;
                }
                hit = Some(Wall::Left);
            } else if walls.right && pos.x + size.x > width {
                pos.x = width - size.x;
                if vel.x > 0.0 {
                    vel.x = -vel.x * restitution;
                }
                hit = Some(Wall::Right);
            }

            if walls.top && pos.y < 0.0 {
                pos.y = 0.0;
                if vel.y < 0.0 {
                    vel.y = -vel.y * restitution;
                }
                hit = Some(Wall::Top);
            } else if walls.bottom && pos.y + size.y > height {
                pos.y = height - size.y;
                if vel.y > 0.0 {
                    vel.y = -vel.y * restitution;
                }
                hit = Some(Wall::Bottom);
            }
        }
        Space::Circle { center, radius } => {
            let reach = radius - particle.extent().bounding_radius();
            let offset = particle.center() - center;
            let dist = offset.length();
            if dist > reach {
                let normal = offset.normalized().unwrap_or(Vec2::X);
                particle.set_center(center + normal * reach.max(0.0));
                let vn = particle.velocity.dot(normal);
                if vn > 0.0 {
                    particle.velocity -= normal * (vn * (1.0 + restitution));
                }
                hit = Some(Wall::Rim);
            }
        }
    }

    if let Some(wall) = hit {
        let axis = match wall {
            Wall::Left | Wall::Right => Axis::Horizontal,
            Wall::Top | Wall::Bottom => Axis::Vertical,
            Wall::Rim => {
                let v = particle.velocity;
                if v.x.abs() > v.y.abs() {
                    Axis::Horizontal
                } else {
                    Axis::Vertical
                }
            }
        };
        particle.last_impact = Some(Impact { at: now, axis });
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{ParticleId, Spawn};

    fn ball(pos: Vec2, vel: Vec2) -> Particle<()> {
        Particle::new(ParticleId(0), Spawn::circle(5.0, pos, ()).with_velocity(vel))
    }

    #[test]
    fn test_right_wall_clamps_and_reflects() {
        let space = Space::rect(100.0, 100.0);
        let mut p = ball(Vec2::new(95.0, 50.0), Vec2::new(4.0, 0.0));

        let hit = resolve_boundary(&mut p, &space, 0.5, Duration::ZERO);

        assert_eq!(hit, Some(Wall::Right));
        assert_eq!(p.position().x, 90.0);
        assert_eq!(p.velocity().x, -2.0);
        assert_eq!(p.last_impact().map(|i| i.axis), Some(Axis::Horizontal));
    }

    #[test]
    fn test_open_top_lets_particles_in() {
        let space = Space::Rect {
            width: 100.0,
            height: 100.0,
            walls: Walls::OPEN_TOP,
        };
        let mut p = ball(Vec2::new(50.0, -30.0), Vec2::new(0.0, 2.0));

        assert_eq!(resolve_boundary(&mut p, &space, 0.8, Duration::ZERO), None);
        assert_eq!(p.position().y, -30.0);
    }

    #[test]
    fn test_rim_keeps_tangential_velocity() {
        let space = Space::circle(Vec2::new(100.0, 100.0), 100.0);
        // Center at (198, 100): outside the reach of 95.
        let mut p = ball(Vec2::new(193.0, 95.0), Vec2::new(3.0, 2.0));

        let hit = resolve_boundary(&mut p, &space, 0.5, Duration::ZERO);

        assert_eq!(hit, Some(Wall::Rim));
        assert!((p.center().distance(Vec2::new(100.0, 100.0)) - 95.0).abs() < 1e-3);
        assert!((p.velocity().x + 1.5).abs() < 1e-5);
        assert!((p.velocity().y - 2.0).abs() < 1e-5);
    }
}
