//! # Particle State Model
//!
//! A particle is a circle or box with a position (top-left of its bounding
//! box, screen coordinates), a velocity in pixels per frame, a lifecycle
//! state and a caller-owned metadata payload.
//!
//! Position, velocity and state are only writable by the engine, so the
//! settled/dragged invariants cannot be broken from outside.

use std::fmt;
use std::time::Duration;

use playfield_shared::Vec2;

/// Stable particle identifier. Never reused within a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleId(pub u32);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Collision extent, fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Extent {
    /// A circle of the given radius.
    Circle {
        /// Radius in pixels.
        radius: f32,
    },
    /// An axis-aligned box.
    Box {
        /// Width in pixels.
        width: f32,
        /// Height in pixels.
        height: f32,
    },
}

impl Extent {
    /// Bounding box size.
    #[must_use]
    pub fn size(self) -> Vec2 {
        match self {
            Self::Circle { radius } => Vec2::new(radius * 2.0, radius * 2.0),
            Self::Box { width, height } => Vec2::new(width, height),
        }
    }

    /// Half the bounding box size (offset from top-left to center).
    #[must_use]
    pub fn half(self) -> Vec2 {
        self.size() * 0.5
    }

    /// Radius for circle extents.
    #[must_use]
    pub fn radius(self) -> Option<f32> {
        match self {
            Self::Circle { radius } => Some(radius),
            Self::Box { .. } => None,
        }
    }

    /// Radius of the smallest circle enclosing the extent.
    #[must_use]
    pub fn bounding_radius(self) -> f32 {
        match self {
            Self::Circle { radius } => radius,
            Self::Box { width, height } => 0.5 * (width * width + height * height).sqrt(),
        }
    }

    pub(crate) fn is_valid(self) -> bool {
        let size = self.size();
        size.is_finite() && size.x > 0.0 && size.y > 0.0
    }
}

/// Lifecycle state of a particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleState {
    /// Integrated every frame and subject to acceleration.
    Free,
    /// At rest; excluded from integration, an immovable obstacle.
    Settled,
    /// Held by the pointer; velocity is zero until release.
    Dragged,
}

/// Screen axis a wall impact compressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Left/right walls.
    Horizontal,
    /// Top/bottom walls.
    Vertical,
}

/// The most recent wall impact (drives cosmetic deformation only).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Impact {
    /// Simulation time of the impact.
    pub at: Duration,
    /// Axis the impact compressed.
    pub axis: Axis,
}

/// A discrete floor slot: column index and stack level (0 = floor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Column index from the left edge.
    pub column: u32,
    /// Level from the floor.
    pub level: u32,
}

/// A simulated particle.
#[derive(Clone, Debug)]
pub struct Particle<M> {
    id: ParticleId,
    extent: Extent,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) state: ParticleState,
    pub(crate) settle_index: Option<u32>,
    pub(crate) last_impact: Option<Impact>,
    pub(crate) target_slot: Option<Slot>,
    /// Caller payload (color, navigation target, label, ...).
    pub metadata: M,
}

impl<M> Particle<M> {
    pub(crate) fn new(id: ParticleId, spawn: Spawn<M>) -> Self {
        Self {
            id,
            extent: spawn.extent,
            position: spawn.position,
            velocity: spawn.velocity,
            state: ParticleState::Free,
            settle_index: None,
            last_impact: None,
            target_slot: None,
            metadata: spawn.metadata,
        }
    }

    /// Identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ParticleId {
        self.id
    }

    /// Collision extent.
    #[inline]
    #[must_use]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Top-left corner of the bounding box.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Center of the bounding box.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.position + self.extent.half()
    }

    /// Velocity in pixels per frame.
    #[inline]
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ParticleState {
        self.state
    }

    /// Order in which this particle settled, if it has.
    #[must_use]
    pub fn settle_index(&self) -> Option<u32> {
        self.settle_index
    }

    /// Most recent wall impact.
    #[must_use]
    pub fn last_impact(&self) -> Option<Impact> {
        self.last_impact
    }

    /// Floor slot reserved for this particle under stack settling.
    #[must_use]
    pub fn target_slot(&self) -> Option<Slot> {
        self.target_slot
    }

    /// True if `point` lies inside the particle's hit area.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        match self.extent {
            Extent::Circle { radius } => self.center().distance(point) <= radius,
            Extent::Box { width, height } => {
                let p = point - self.position;
                p.x >= 0.0 && p.y >= 0.0 && p.x <= width && p.y <= height
            }
        }
    }

    pub(crate) fn set_center(&mut self, center: Vec2) {
        self.position = center - self.extent.half();
    }

    #[inline]
    pub(crate) fn is_free(&self) -> bool {
        self.state == ParticleState::Free
    }
}

/// Description of a particle to create.
#[derive(Clone, Debug)]
pub struct Spawn<M> {
    /// Collision extent.
    pub extent: Extent,
    /// Top-left corner of the bounding box.
    pub position: Vec2,
    /// Initial velocity.
    pub velocity: Vec2,
    /// Caller payload.
    pub metadata: M,
}

impl<M> Spawn<M> {
    /// A circle whose bounding box starts at `position`, at rest.
    #[must_use]
    pub fn circle(radius: f32, position: Vec2, metadata: M) -> Self {
        Self {
            extent: Extent::Circle { radius },
            position,
            velocity: Vec2::ZERO,
            metadata,
        }
    }

    /// A box at `position`, at rest.
    #[must_use]
    pub fn rect(width: f32, height: f32, position: Vec2, metadata: M) -> Self {
        Self {
            extent: Extent::Box { width, height },
            position,
            velocity: Vec2::ZERO,
            metadata,
        }
    }

    /// Sets the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }
}
