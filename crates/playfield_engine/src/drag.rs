//! # Drag/Throw Controller
//!
//! Single-pointer grab, drag and release. A release that is both quick and
//! short is a click; anything else throws the particle with a velocity
//! proportional to the drag displacement.

use std::time::Duration;

use playfield_shared::Vec2;

use crate::config::DragConfig;
use crate::particle::{Particle, ParticleId, ParticleState};
use crate::space::Space;

/// Raw pointer input, timestamped on the simulation clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Pointer pressed.
    Down {
        /// Pointer position.
        position: Vec2,
        /// Press time.
        at: Duration,
    },
    /// Pointer moved.
    Move {
        /// Pointer position.
        position: Vec2,
        /// Move time.
        at: Duration,
    },
    /// Pointer released.
    Up {
        /// Pointer position.
        position: Vec2,
        /// Release time.
        at: Duration,
    },
    /// Pointer lost (left the surface, gesture cancelled).
    Cancel,
}

/// What a pointer event did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerOutcome {
    /// A particle was picked up.
    Grabbed(ParticleId),
    /// The held particle followed the pointer.
    Moved(ParticleId),
    /// Quick, short release: treat as a click on the particle.
    Clicked(ParticleId),
    /// The particle was released with a velocity.
    Thrown {
        /// Released particle.
        id: ParticleId,
        /// Imparted velocity.
        velocity: Vec2,
    },
    /// The held particle was let go without velocity (cancel).
    Released(ParticleId),
    /// Press landed on no free particle.
    Missed,
    /// Event had no effect (no drag active, second pointer, drags disabled).
    Ignored,
}

#[derive(Clone, Copy, Debug)]
struct ActiveDrag {
    id: ParticleId,
    start_pointer: Vec2,
    start_time: Duration,
    grab_offset: Vec2,
}

/// Tracks the single active drag.
#[derive(Clone, Debug, Default)]
pub struct DragController {
    active: Option<ActiveDrag>,
}

impl DragController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Particle currently held.
    #[must_use]
    pub fn active(&self) -> Option<ParticleId> {
        self.active.map(|d| d.id)
    }

    /// Picks up the topmost free particle under `point`.
    ///
    /// Later particles are drawn over earlier ones, so the search runs
    /// from the back of the list.
    pub fn pointer_down<M>(
        &mut self,
        particles: &mut [Particle<M>],
        point: Vec2,
        at: Duration,
        config: &DragConfig,
    ) -> PointerOutcome {
        if !config.enabled || self.active.is_some() {
            return PointerOutcome::Ignored;
        }
        let Some(p) = particles
            .iter_mut()
            .rev()
            .find(|p| p.is_free() && p.contains(point))
        else {
            return PointerOutcome::Missed;
        };

        p.state = ParticleState::Dragged;
        p.velocity = Vec2::ZERO;
        p.last_impact = None;
        self.active = Some(ActiveDrag {
            id: p.id(),
            start_pointer: point,
            start_time: at,
            grab_offset: point - p.position,
        });
        PointerOutcome::Grabbed(p.id())
    }

    /// Moves the held particle with the pointer, clamped to `space`.
    pub fn pointer_move<M>(
        &mut self,
        particles: &mut [Particle<M>],
        space: &Space,
        point: Vec2,
    ) -> PointerOutcome {
        let Some(drag) = self.active else {
            return PointerOutcome::Ignored;
        };
        let Some(p) = self.held(particles, drag.id) else {
            return PointerOutcome::Ignored;
        };
        follow(p, space, point - drag.grab_offset);
        PointerOutcome::Moved(drag.id)
    }

    /// Releases the held particle as a click or a throw.
    pub fn pointer_up<M>(
        &mut self,
        particles: &mut [Particle<M>],
        space: &Space,
        point: Vec2,
        at: Duration,
        config: &DragConfig,
    ) -> PointerOutcome {
        let Some(drag) = self.active else {
            return PointerOutcome::Ignored;
        };
        let Some(p) = self.held(particles, drag.id) else {
            return PointerOutcome::Ignored;
        };
        self.active = None;

        follow(p, space, point - drag.grab_offset);
        p.state = ParticleState::Free;

        let delta = point - drag.start_pointer;
        let elapsed = at.saturating_sub(drag.start_time);
        if elapsed < config.click_max_duration() && delta.length() < config.click_max_distance {
            return PointerOutcome::Clicked(drag.id);
        }
        let velocity = delta * config.throw_multiplier;
        p.velocity = velocity;
        PointerOutcome::Thrown { id: drag.id, velocity }
    }

    /// Lets go of the held particle without imparting velocity.
    pub fn cancel<M>(&mut self, particles: &mut [Particle<M>]) -> PointerOutcome {
        let Some(drag) = self.active else {
            return PointerOutcome::Ignored;
        };
        let Some(p) = self.held(particles, drag.id) else {
            return PointerOutcome::Ignored;
        };
        self.active = None;
        p.state = ParticleState::Free;
        PointerOutcome::Released(drag.id)
    }

    /// Forgets the drag if `id` is the held particle (it left the simulation).
    pub(crate) fn forget(&mut self, id: ParticleId) {
        if self.active() == Some(id) {
            self.active = None;
        }
    }

    /// Looks up the held particle, dropping the drag if it has vanished.
    fn held<'a, M>(
        &mut self,
        particles: &'a mut [Particle<M>],
        id: ParticleId,
    ) -> Option<&'a mut Particle<M>> {
        let found = particles
            .iter_mut()
            .find(|p| p.id() == id && p.state == ParticleState::Dragged);
        if found.is_none() {
            self.active = None;
        }
        found
    }
}

fn follow<M>(p: &mut Particle<M>, space: &Space, target: Vec2) {
    p.position = space.clamp_position(target, p.extent().size());
    p.velocity = Vec2::ZERO;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Spawn;

    fn setup() -> (Vec<Particle<()>>, Space, DragConfig) {
        let ps = vec![Particle::new(
            ParticleId(0),
            Spawn::circle(10.0, Vec2::new(40.0, 40.0), ()),
        )];
        (ps, Space::rect(200.0, 200.0), DragConfig::default())
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_quick_short_release_is_click() {
        let (mut ps, space, config) = setup();
        let mut drag = DragController::new();
        let start = Vec2::new(50.0, 50.0);

        assert_eq!(
            drag.pointer_down(&mut ps, start, ms(1000), &config),
            PointerOutcome::Grabbed(ParticleId(0))
        );
        assert_eq!(ps[0].state(), ParticleState::Dragged);

        let out = drag.pointer_up(&mut ps, &space, start + Vec2::new(2.0, 0.0), ms(1100), &config);

        assert_eq!(out, PointerOutcome::Clicked(ParticleId(0)));
        assert_eq!(ps[0].velocity(), Vec2::ZERO);
        assert_eq!(ps[0].state(), ParticleState::Free);
    }

    #[test]
    fn test_long_drag_throws() {
        let (mut ps, space, config) = setup();
        let mut drag = DragController::new();
        let start = Vec2::new(50.0, 50.0);

        drag.pointer_down(&mut ps, start, ms(1000), &config);
        drag.pointer_move(&mut ps, &space, start + Vec2::new(25.0, 0.0));
        let out = drag.pointer_up(&mut ps, &space, start + Vec2::new(50.0, 0.0), ms(1400), &config);

        match out {
            PointerOutcome::Thrown { id, velocity } => {
                assert_eq!(id, ParticleId(0));
                assert!((velocity.x - 5.0).abs() < 1e-5);
                assert_eq!(velocity.y, 0.0);
            }
            other => panic!("expected throw, got {other:?}"),
        }
        assert_eq!(ps[0].position(), Vec2::new(90.0, 40.0));
    }

    #[test]
    fn test_slow_but_short_release_throws() {
        let (mut ps, space, config) = setup();
        let mut drag = DragController::new();
        let start = Vec2::new(50.0, 50.0);

        drag.pointer_down(&mut ps, start, ms(0), &config);
        let out = drag.pointer_up(&mut ps, &space, start + Vec2::new(1.0, 0.0), ms(500), &config);

        assert!(matches!(out, PointerOutcome::Thrown { .. }));
    }

    #[test]
    fn test_second_pointer_ignored_and_miss() {
        let (mut ps, _space, config) = setup();
        let mut drag = DragController::new();

        assert_eq!(
            drag.pointer_down(&mut ps, Vec2::new(150.0, 150.0), ms(0), &config),
            PointerOutcome::Missed
        );
        drag.pointer_down(&mut ps, Vec2::new(50.0, 50.0), ms(0), &config);
        assert_eq!(
            drag.pointer_down(&mut ps, Vec2::new(50.0, 50.0), ms(10), &config),
            PointerOutcome::Ignored
        );
    }

    #[test]
    fn test_drag_clamped_to_space() {
        let (mut ps, space, config) = setup();
        let mut drag = DragController::new();

        drag.pointer_down(&mut ps, Vec2::new(50.0, 50.0), ms(0), &config);
        drag.pointer_move(&mut ps, &space, Vec2::new(-500.0, 900.0));

        assert_eq!(ps[0].position(), Vec2::new(0.0, 180.0));
        assert_eq!(ps[0].velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_settled_particles_cannot_be_grabbed() {
        let (mut ps, _space, config) = setup();
        ps[0].state = ParticleState::Settled;
        let mut drag = DragController::new();

        assert_eq!(
            drag.pointer_down(&mut ps, Vec2::new(50.0, 50.0), ms(0), &config),
            PointerOutcome::Missed
        );
    }
}
