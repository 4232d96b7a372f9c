//! # Render Adapter
//!
//! The engine never draws. After each frame's physics a read-only
//! [`FrameView`] is handed to a [`RenderAdapter`]; canvas, DOM or GPU
//! backends live on the other side of that trait.
//!
//! [`InstanceBuffer`] is the stock adapter: it packs every particle into a
//! tightly laid-out POD instance ready for a single buffer upload.

use std::time::Duration;

use bytemuck::{Pod, Zeroable};

use crate::config::DeformConfig;
use crate::deform::{squash, Squash};
use crate::particle::{Extent, Particle, ParticleState};
use crate::space::Space;

/// Read-only snapshot of a simulation after a frame.
#[derive(Debug)]
pub struct FrameView<'a, M> {
    /// Frame counter.
    pub frame: u64,
    /// Simulation clock at this frame.
    pub now: Duration,
    /// The simulation space.
    pub space: &'a Space,
    /// Every live particle, in spawn order.
    pub particles: &'a [Particle<M>],
    pub(crate) deform: &'a DeformConfig,
}

impl<M> FrameView<'_, M> {
    /// Cosmetic squash for a particle at this frame.
    #[must_use]
    pub fn squash(&self, particle: &Particle<M>) -> Squash {
        squash(self.deform, particle.last_impact(), self.now)
    }
}

/// Consumes frame snapshots.
pub trait RenderAdapter<M> {
    /// Draws (or records) one frame.
    fn render(&mut self, view: &FrameView<'_, M>);
}

impl<M, F> RenderAdapter<M> for F
where
    F: FnMut(&FrameView<'_, M>),
{
    fn render(&mut self, view: &FrameView<'_, M>) {
        self(view);
    }
}

/// Instance flag: box extent (circle otherwise).
pub const FLAG_BOX: u32 = 1 << 0;
/// Instance flag: particle is settled.
pub const FLAG_SETTLED: u32 = 1 << 1;
/// Instance flag: particle is being dragged.
pub const FLAG_DRAGGED: u32 = 1 << 2;

/// One particle, packed for upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    /// Top-left corner (x, y).
    pub position: [f32; 2],
    /// Bounding box size (w, h).
    pub size: [f32; 2],
    /// Squash scale (x, y), 1.0 at rest.
    pub scale: [f32; 2],
    /// Particle id.
    pub id: u32,
    /// `FLAG_*` bits.
    pub flags: u32,
}

impl ParticleInstance {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    fn from_particle<M>(p: &Particle<M>, scale: Squash) -> Self {
        let mut flags = 0;
        if matches!(p.extent(), Extent::Box { .. }) {
            flags |= FLAG_BOX;
        }
        match p.state() {
            ParticleState::Settled => flags |= FLAG_SETTLED,
            ParticleState::Dragged => flags |= FLAG_DRAGGED,
            ParticleState::Free => {}
        }
        Self {
            position: p.position().to_array(),
            size: p.extent().size().to_array(),
            scale: [scale.scale_x, scale.scale_y],
            id: p.id().0,
            flags,
        }
    }
}

/// Packs each frame into a reusable instance array.
#[derive(Debug, Default)]
pub struct InstanceBuffer {
    instances: Vec<ParticleInstance>,
    frame: u64,
}

impl InstanceBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances from the last frame.
    #[must_use]
    pub fn instances(&self) -> &[ParticleInstance] {
        &self.instances
    }

    /// Raw bytes for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Frame the buffer was last filled for.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl<M> RenderAdapter<M> for InstanceBuffer {
    fn render(&mut self, view: &FrameView<'_, M>) {
        self.instances.clear();
        self.instances.extend(
            view.particles
                .iter()
                .map(|p| ParticleInstance::from_particle(p, view.squash(p))),
        );
        self.frame = view.frame;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{ParticleId, Spawn};
    use playfield_shared::Vec2;

    #[test]
    fn test_instance_layout() {
        assert_eq!(ParticleInstance::SIZE, 32);
    }

    #[test]
    fn test_buffer_packs_particles() {
        let space = Space::rect(100.0, 100.0);
        let deform = DeformConfig::default();
        let mut settled =
            Particle::new(ParticleId(3), Spawn::rect(4.0, 6.0, Vec2::new(1.0, 2.0), ()));
        settled.state = ParticleState::Settled;
        let particles = vec![
            Particle::new(ParticleId(0), Spawn::circle(5.0, Vec2::ZERO, ())),
            settled,
        ];
        let view = FrameView {
            frame: 7,
            now: Duration::ZERO,
            space: &space,
            particles: &particles,
            deform: &deform,
        };

        let mut buffer = InstanceBuffer::new();
        buffer.render(&view);

        assert_eq!(buffer.frame(), 7);
        assert_eq!(buffer.instances().len(), 2);
        assert_eq!(buffer.as_bytes().len(), 2 * ParticleInstance::SIZE);
        let second = buffer.instances()[1];
        assert_eq!(second.id, 3);
        assert_eq!(second.flags, FLAG_BOX | FLAG_SETTLED);
        assert_eq!(second.size, [4.0, 6.0]);
        assert_eq!(second.scale, [1.0, 1.0]);
    }
}
