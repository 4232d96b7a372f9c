//! # Simulation
//!
//! Owns the particles of one effect and advances them one frame at a time
//! in a fixed order:
//!
//! 1. apply external acceleration and integrate free particles
//! 2. resolve circle-circle collisions
//! 3. resolve wall collisions
//! 4. settle or retire particles
//!
//! Pointer events are applied between frames through the drag controller,
//! which is the only other writer of particle state.

use std::time::Duration;

use playfield_shared::constants::CONTACT_TOLERANCE;
use playfield_shared::Vec2;
use tracing::debug;

use crate::collision::{resolve_pairs, Contact};
use crate::config::{EngineConfig, SettlePolicy};
use crate::drag::{DragController, PointerEvent, PointerOutcome};
use crate::error::{EngineError, EngineResult};
use crate::integrator::{device_acceleration, integrate};
use crate::particle::{Particle, ParticleId, ParticleState, Spawn};
use crate::render::FrameView;
use crate::settle::{reached_slot, velocity_rest, StackGrid};
use crate::space::{resolve_boundary, Space, Wall};

/// Something that happened during a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameEvent {
    /// A particle hit a wall.
    WallHit {
        /// Particle.
        id: ParticleId,
        /// Wall hit.
        wall: Wall,
    },
    /// Two circles collided.
    Collision(Contact),
    /// A particle came to rest.
    Settled {
        /// Particle.
        id: ParticleId,
        /// Settle order, starting at 0.
        index: u32,
    },
    /// A particle left the simulation; its final state is in
    /// [`FrameReport::retired`].
    Retired(ParticleId),
}

/// Result of one frame.
#[derive(Debug)]
pub struct FrameReport<M> {
    /// Frame counter after this frame.
    pub frame: u64,
    /// Events in the order they happened.
    pub events: Vec<FrameEvent>,
    /// Particles removed this frame, in their final state.
    pub retired: Vec<Particle<M>>,
}

impl<M> FrameReport<M> {
    /// Ids settled this frame.
    pub fn settled(&self) -> impl Iterator<Item = ParticleId> + '_ {
        self.events.iter().filter_map(|e| match e {
            FrameEvent::Settled { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Number of wall hits this frame.
    #[must_use]
    pub fn wall_hits(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, FrameEvent::WallHit { .. }))
            .count()
    }

    /// Number of pair collisions this frame.
    #[must_use]
    pub fn collisions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, FrameEvent::Collision(_)))
            .count()
    }
}

/// A single-threaded particle simulation.
#[derive(Debug)]
pub struct Simulation<M> {
    config: EngineConfig,
    space: Space,
    particles: Vec<Particle<M>>,
    acceleration: Vec2,
    drag: DragController,
    grid: Option<StackGrid>,
    next_id: u32,
    settle_count: u32,
    frame: u64,
    now: Duration,
    contacts: Vec<Contact>,
}

impl<M> Simulation<M> {
    /// Creates an empty simulation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the configuration or space
    /// is invalid, or if stack settling is requested on a circular space.
    pub fn new(config: EngineConfig, space: Space) -> EngineResult<Self> {
        config.validate()?;
        if !space.is_valid() {
            return Err(EngineError::InvalidConfig(format!(
                "space {space:?} must be finite and non-empty"
            )));
        }

        let grid = match (&config.settle, space) {
            (SettlePolicy::Stack { slot_size, spread }, Space::Rect { width, height, .. }) => {
                Some(StackGrid::new(width, height, *slot_size, *spread))
            }
            (SettlePolicy::Stack { .. }, Space::Circle { .. }) => {
                return Err(EngineError::InvalidConfig(
                    "settle.policy stack requires a rect space".to_string(),
                ));
            }
            _ => None,
        };

        Ok(Self {
            acceleration: Vec2::new(0.0, config.physics.gravity),
            config,
            space,
            particles: Vec::new(),
            drag: DragController::new(),
            grid,
            next_id: 0,
            settle_count: 0,
            frame: 0,
            now: Duration::ZERO,
            contacts: Vec::new(),
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Simulation space.
    #[must_use]
    pub fn space(&self) -> &Space {
        &self.space
    }

    /// Live particles in spawn order.
    #[must_use]
    pub fn particles(&self) -> &[Particle<M>] {
        &self.particles
    }

    /// Looks up a particle.
    #[must_use]
    pub fn particle(&self, id: ParticleId) -> Option<&Particle<M>> {
        self.particles.iter().find(|p| p.id() == id)
    }

    /// Mutable access to a particle's metadata only.
    pub fn metadata_mut(&mut self, id: ParticleId) -> Option<&mut M> {
        self.particles
            .iter_mut()
            .find(|p| p.id() == id)
            .map(|p| &mut p.metadata)
    }

    /// Number of live particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True if no particles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Frames stepped so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Clock of the last frame.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Current external acceleration.
    #[must_use]
    pub fn acceleration(&self) -> Vec2 {
        self.acceleration
    }

    /// Floor occupancy under stack settling.
    #[must_use]
    pub fn stack_grid(&self) -> Option<&StackGrid> {
        self.grid.as_ref()
    }

    /// Particle held by the pointer.
    #[must_use]
    pub fn dragged(&self) -> Option<ParticleId> {
        self.drag.active()
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Adds a particle.
    ///
    /// Under stack settling the particle's floor slot is reserved here.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFinite`] for NaN/infinite position or
    /// velocity, or a non-positive extent.
    pub fn spawn(&mut self, spawn: Spawn<M>) -> EngineResult<ParticleId> {
        if !spawn.extent.is_valid() {
            return Err(EngineError::NonFinite("extent"));
        }
        if !spawn.position.is_finite() {
            return Err(EngineError::NonFinite("position"));
        }
        if !spawn.velocity.is_finite() {
            return Err(EngineError::NonFinite("velocity"));
        }

        let id = ParticleId(self.next_id);
        self.next_id += 1;
        let mut particle = Particle::new(id, spawn);

        if let Some(grid) = self.grid.as_mut() {
            let column = grid.column_at(particle.center().x);
            particle.target_slot = grid.reserve(column);
            if particle.target_slot.is_none() {
                debug!(%id, column, "no free stack slot, particle will retire");
            }
        }

        self.particles.push(particle);
        Ok(id)
    }

    /// Adds several particles, stopping at the first invalid one.
    ///
    /// # Errors
    ///
    /// As [`Simulation::spawn`]; particles before the failing one remain.
    pub fn spawn_many<I>(&mut self, spawns: I) -> EngineResult<Vec<ParticleId>>
    where
        I: IntoIterator<Item = Spawn<M>>,
    {
        spawns.into_iter().map(|s| self.spawn(s)).collect()
    }

    /// Replaces the external acceleration (pixels per frame squared).
    pub fn set_acceleration(&mut self, acceleration: Vec2) {
        if acceleration.is_finite() {
            self.acceleration = acceleration;
        }
    }

    /// Sets the acceleration from a device accelerometer reading.
    pub fn set_device_tilt(&mut self, x: f32, y: f32) {
        let scale = self.config.physics.accelerometer_scale;
        self.set_acceleration(device_acceleration(x, y, scale));
    }

    /// Removes a particle, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownParticle`] if no such particle exists.
    pub fn remove(&mut self, id: ParticleId) -> EngineResult<Particle<M>> {
        let index = self.index_of(id)?;
        self.drag.forget(id);
        Ok(self.particles.remove(index))
    }

    /// Releases a settled particle back into the free state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownParticle`] if no such particle exists,
    /// or [`EngineError::InvalidConfig`] under stack settling, where floor
    /// slots are never given back.
    pub fn unsettle(&mut self, id: ParticleId) -> EngineResult<()> {
        if self.grid.is_some() {
            return Err(EngineError::InvalidConfig(
                "unsettle is unavailable under stack settling".to_string(),
            ));
        }
        let index = self.index_of(id)?;
        let p = &mut self.particles[index];
        if p.state == ParticleState::Settled {
            p.state = ParticleState::Free;
            p.settle_index = None;
        }
        Ok(())
    }

    /// Removes every particle and empties the floor. Ids are not reused.
    pub fn reset(&mut self) {
        self.particles.clear();
        self.drag = DragController::new();
        if let Some(grid) = self.grid.as_mut() {
            grid.clear();
        }
        self.settle_count = 0;
    }

    fn index_of(&self, id: ParticleId) -> EngineResult<usize> {
        self.particles
            .iter()
            .position(|p| p.id() == id)
            .ok_or(EngineError::UnknownParticle(id))
    }

    // ========================================================================
    // POINTER
    // ========================================================================

    /// Applies one pointer event.
    pub fn pointer(&mut self, event: PointerEvent) -> PointerOutcome {
        match event {
            PointerEvent::Down { position, at } => self.pointer_down(position, at),
            PointerEvent::Move { position, .. } => self.pointer_move(position),
            PointerEvent::Up { position, at } => self.pointer_up(position, at),
            PointerEvent::Cancel => self.drag.cancel(&mut self.particles),
        }
    }

    /// Presses the pointer at `position`.
    pub fn pointer_down(&mut self, position: Vec2, at: Duration) -> PointerOutcome {
        self.drag
            .pointer_down(&mut self.particles, position, at, &self.config.drag)
    }

    /// Moves the pointer to `position`.
    pub fn pointer_move(&mut self, position: Vec2) -> PointerOutcome {
        self.drag.pointer_move(&mut self.particles, &self.space, position)
    }

    /// Releases the pointer at `position`.
    pub fn pointer_up(&mut self, position: Vec2, at: Duration) -> PointerOutcome {
        self.drag
            .pointer_up(&mut self.particles, &self.space, position, at, &self.config.drag)
    }

    // ========================================================================
    // FRAME
    // ========================================================================

    /// Advances one frame; `now` is the simulation clock for this frame.
    pub fn step(&mut self, now: Duration) -> FrameReport<M> {
        self.frame += 1;
        self.now = now;
        let mut events = Vec::new();

        integrate(&mut self.particles, self.acceleration, &self.config.physics);

        if self.config.physics.pairwise {
            self.contacts.clear();
            resolve_pairs(
                &mut self.particles,
                self.config.physics.pair_damping,
                &mut self.contacts,
            );
            events.extend(self.contacts.iter().copied().map(FrameEvent::Collision));
        }

        let restitution = self.config.physics.wall_restitution;
        for p in self.particles.iter_mut().filter(|p| p.is_free()) {
            if let Some(wall) = resolve_boundary(p, &self.space, restitution, now) {
                events.push(FrameEvent::WallHit { id: p.id(), wall });
            }
        }

        let retired = self.settle(&mut events);

        FrameReport {
            frame: self.frame,
            events,
            retired,
        }
    }

    fn settle(&mut self, events: &mut Vec<FrameEvent>) -> Vec<Particle<M>> {
        let mut retired = Vec::new();
        match self.config.settle {
            SettlePolicy::Never => {}
            SettlePolicy::Stack { .. } => {
                let Some(grid) = self.grid.as_ref() else {
                    return retired;
                };
                let mut i = 0;
                while i < self.particles.len() {
                    let p = &mut self.particles[i];
                    if !p.is_free() {
                        i += 1;
                        continue;
                    }
                    let target = p.target_slot;
                    match target {
                        Some(slot) if reached_slot(grid, p, slot) => {
                            p.position = grid.slot_position(slot, p.extent().size());
                            let index = mark_settled(p, &mut self.settle_count);
                            debug!(
                                id = %p.id(),
                                column = slot.column,
                                level = slot.level,
                                "stacked"
                            );
                            events.push(FrameEvent::Settled { id: p.id(), index });
                            i += 1;
                        }
                        Some(_) => i += 1,
                        None => {
                            let gone = self.particles.remove(i);
                            debug!(id = %gone.id(), "retired overflow particle");
                            events.push(FrameEvent::Retired(gone.id()));
                            retired.push(gone);
                        }
                    }
                }
            }
            SettlePolicy::Velocity {
                max_speed,
                vertical_only,
                require_support,
            } => {
                for i in 0..self.particles.len() {
                    if !self.particles[i].is_free() {
                        continue;
                    }
                    let rests = velocity_rest(
                        &self.particles,
                        i,
                        &self.space,
                        max_speed,
                        vertical_only,
                        require_support,
                    );
                    if !rests {
                        continue;
                    }
                    let p = &mut self.particles[i];
                    p.velocity = Vec2::ZERO;
                    let index = mark_settled(p, &mut self.settle_count);
                    debug!(id = %p.id(), index, "settled");
                    events.push(FrameEvent::Settled { id: p.id(), index });
                }
            }
            SettlePolicy::Retire => {
                let mut i = 0;
                while i < self.particles.len() {
                    let p = &self.particles[i];
                    if p.is_free() && self.space.touches_floor(p, CONTACT_TOLERANCE) {
                        let gone = self.particles.remove(i);
                        debug!(id = %gone.id(), "retired");
                        events.push(FrameEvent::Retired(gone.id()));
                        retired.push(gone);
                    } else {
                        i += 1;
                    }
                }
            }
        }
        retired
    }

    /// Read-only view for rendering.
    #[must_use]
    pub fn view(&self) -> FrameView<'_, M> {
        FrameView {
            frame: self.frame,
            now: self.now,
            space: &self.space,
            particles: &self.particles,
            deform: &self.config.deform,
        }
    }
}

fn mark_settled<M>(p: &mut Particle<M>, count: &mut u32) -> u32 {
    let index = *count;
    *count += 1;
    p.state = ParticleState::Settled;
    p.velocity = Vec2::ZERO;
    p.settle_index = Some(index);
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Walls;

    fn frames(n: u64) -> impl Iterator<Item = Duration> {
        (1..=n).map(|f| Duration::from_millis(f * 16))
    }

    #[test]
    fn test_spawn_rejects_non_finite() {
        let mut sim: Simulation<()> =
            Simulation::new(EngineConfig::default(), Space::rect(100.0, 100.0)).unwrap();
        let err = sim
            .spawn(Spawn::circle(5.0, Vec2::new(f32::NAN, 0.0), ()))
            .unwrap_err();
        assert!(matches!(err, EngineError::NonFinite("position")));
        assert!(matches!(
            sim.spawn(Spawn::circle(0.0, Vec2::ZERO, ())),
            Err(EngineError::NonFinite("extent"))
        ));
        assert!(sim.is_empty());
    }

    #[test]
    fn test_ids_never_reused() {
        let mut sim: Simulation<()> =
            Simulation::new(EngineConfig::default(), Space::rect(100.0, 100.0)).unwrap();
        let a = sim.spawn(Spawn::circle(5.0, Vec2::ZERO, ())).unwrap();
        sim.reset();
        let b = sim.spawn(Spawn::circle(5.0, Vec2::ZERO, ())).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_stack_policy_needs_rect() {
        let config = EngineConfig {
            settle: SettlePolicy::Stack {
                slot_size: 4.0,
                spread: 2,
            },
            ..EngineConfig::default()
        };
        let result: EngineResult<Simulation<()>> =
            Simulation::new(config, Space::circle(Vec2::ZERO, 10.0));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_retire_on_floor() {
        let config = EngineConfig {
            settle: SettlePolicy::Retire,
            ..EngineConfig::default()
        };
        let space = Space::Rect {
            width: 100.0,
            height: 100.0,
            walls: Walls::OPEN_TOP,
        };
        let mut sim = Simulation::new(config, space).unwrap();
        let id = sim.spawn(Spawn::rect(10.0, 10.0, Vec2::new(40.0, -20.0), "coin")).unwrap();

        let mut retired = Vec::new();
        for now in frames(200) {
            let report = sim.step(now);
            retired.extend(report.retired);
        }

        assert!(sim.is_empty());
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].id(), id);
        assert_eq!(retired[0].metadata, "coin");
    }

    #[test]
    fn test_velocity_settle_orders_indices() {
        let config = EngineConfig {
            settle: SettlePolicy::Velocity {
                max_speed: 0.6,
                vertical_only: true,
                require_support: true,
            },
            physics: crate::config::PhysicsConfig {
                wall_restitution: 0.0,
                ..Default::default()
            },
            ..EngineConfig::default()
        };
        let mut sim = Simulation::new(config, Space::rect(200.0, 100.0)).unwrap();
        let first = sim.spawn(Spawn::rect(10.0, 10.0, Vec2::new(10.0, 80.0), ())).unwrap();
        let second = sim.spawn(Spawn::rect(10.0, 10.0, Vec2::new(100.0, 20.0), ())).unwrap();

        for now in frames(120) {
            sim.step(now);
        }

        assert_eq!(sim.particle(first).and_then(Particle::settle_index), Some(0));
        assert_eq!(sim.particle(second).and_then(Particle::settle_index), Some(1));
    }

    #[test]
    fn test_unsettle_frees_particle() {
        let config = EngineConfig {
            settle: SettlePolicy::Velocity {
                max_speed: 1.0,
                vertical_only: false,
                require_support: false,
            },
            ..EngineConfig::default()
        };
        let mut sim = Simulation::new(config, Space::rect(100.0, 100.0)).unwrap();
        let id = sim.spawn(Spawn::circle(5.0, Vec2::new(10.0, 10.0), ())).unwrap();
        sim.step(Duration::ZERO);
        assert_eq!(sim.particle(id).map(Particle::state), Some(ParticleState::Settled));

        sim.unsettle(id).unwrap();
        assert_eq!(sim.particle(id).map(Particle::state), Some(ParticleState::Free));
        assert!(matches!(
            sim.unsettle(ParticleId(99)),
            Err(EngineError::UnknownParticle(ParticleId(99)))
        ));
    }
}
