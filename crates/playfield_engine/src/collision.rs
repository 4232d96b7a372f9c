//! # Pairwise Collision Resolver
//!
//! Circle-circle collisions, naive O(n²) over all unordered pairs.
//! Observed scenes hold at most a few hundred particles.
//!
//! Two free particles exchange their normal velocity components (equal-mass
//! elastic collision in the collision-normal frame), are damped, and are
//! pushed apart by half the overlap each. A settled or dragged partner is
//! immovable: the free particle takes the whole push and a damped
//! reflection.

use playfield_shared::Vec2;

use crate::particle::{Particle, ParticleId, ParticleState};

/// Normal used when two centers coincide exactly.
const FALLBACK_NORMAL: Vec2 = Vec2::X;

/// One resolved contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    /// Lower-index particle.
    pub a: ParticleId,
    /// Higher-index particle.
    pub b: ParticleId,
}

/// Resolves every overlapping circle pair with at least one free member.
pub fn resolve_pairs<M>(particles: &mut [Particle<M>], damping: f32, contacts: &mut Vec<Contact>) {
    let n = particles.len();
    for i in 0..n {
        let (head, tail) = particles.split_at_mut(i + 1);
        let a = &mut head[i];
        let Some(ra) = a.extent().radius() else {
            continue;
        };
        for b in tail.iter_mut() {
            if !a.is_free() && !b.is_free() {
                continue;
            }
            let Some(rb) = b.extent().radius() else {
                continue;
            };
            if resolve_pair(a, ra, b, rb, damping) {
                contacts.push(Contact { a: a.id(), b: b.id() });
            }
        }
    }
}

/// Resolves one pair; returns true if they overlapped.
fn resolve_pair<M>(
    a: &mut Particle<M>,
    ra: f32,
    b: &mut Particle<M>,
    rb: f32,
    damping: f32,
) -> bool {
    let delta = b.center() - a.center();
    let dist = delta.length();
    let min_dist = ra + rb;
    if dist >= min_dist {
        return false;
    }

    let normal = if dist > 1e-6 {
        delta * (1.0 / dist)
    } else {
        FALLBACK_NORMAL
    };
    let overlap = min_dist - dist;

    match (a.state, b.state) {
        (ParticleState::Free, ParticleState::Free) => {
            let tangent = normal.perp();
            let (van, vat) = (a.velocity.dot(normal), a.velocity.dot(tangent));
            let (vbn, vbt) = (b.velocity.dot(normal), b.velocity.dot(tangent));

            // Approaching along the normal: b's normal speed below a's.
            if vbn - van < 0.0 {
                a.velocity = (normal * vbn + tangent * vat) * damping;
                b.velocity = (normal * van + tangent * vbt) * damping;
            }

            let push = normal * (overlap * 0.5);
            a.position -= push;
            b.position += push;
        }
        (ParticleState::Free, _) => push_off_fixed(a, -normal, overlap, damping),
        (_, ParticleState::Free) => push_off_fixed(b, normal, overlap, damping),
        _ => return false,
    }
    true
}

/// Moves `free` out along `normal` (pointing away from the fixed partner)
/// and reflects its approaching normal velocity.
fn push_off_fixed<M>(free: &mut Particle<M>, normal: Vec2, overlap: f32, damping: f32) {
    free.position += normal * overlap;
    let vn = free.velocity.dot(normal);
    if vn < 0.0 {
        free.velocity -= normal * (vn * (1.0 + damping));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Spawn;

    fn ball(id: u32, center: Vec2, vel: Vec2) -> Particle<()> {
        let r = 10.0;
        Particle::new(
            ParticleId(id),
            Spawn::circle(r, center - Vec2::new(r, r), ()).with_velocity(vel),
        )
    }

    #[test]
    fn test_head_on_exchange() {
        let mut ps = vec![
            ball(0, Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0)),
            ball(1, Vec2::new(18.0, 0.0), Vec2::new(-1.0, 0.0)),
        ];
        let mut contacts = Vec::new();

        resolve_pairs(&mut ps, 1.0, &mut contacts);

        assert_eq!(contacts.len(), 1);
        assert!((ps[0].velocity().x + 1.0).abs() < 1e-5);
        assert!((ps[1].velocity().x - 2.0).abs() < 1e-5);
        assert!((ps[0].center().distance(ps[1].center()) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_damping_scales_result() {
        let mut ps = vec![
            ball(0, Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0)),
            ball(1, Vec2::new(19.0, 0.0), Vec2::ZERO),
        ];
        resolve_pairs(&mut ps, 0.9, &mut Vec::new());

        assert!(ps[0].velocity().x.abs() < 1e-5);
        assert!((ps[1].velocity().x - 1.8).abs() < 1e-5);
    }

    #[test]
    fn test_settled_partner_never_moves() {
        let mut ps = vec![
            ball(0, Vec2::new(0.0, 0.0), Vec2::ZERO),
            ball(1, Vec2::new(0.0, -15.0), Vec2::new(0.0, 3.0)),
        ];
        ps[0].state = ParticleState::Settled;
        let before = ps[0].position();

        resolve_pairs(&mut ps, 0.5, &mut Vec::new());

        assert_eq!(ps[0].position(), before);
        assert!((ps[1].center().y + 20.0).abs() < 1e-4);
        assert!((ps[1].velocity().y + 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_boxes_are_ignored() {
        let mut ps = vec![
            Particle::new(ParticleId(0), Spawn::rect(10.0, 10.0, Vec2::ZERO, ())),
            Particle::new(ParticleId(1), Spawn::rect(10.0, 10.0, Vec2::new(5.0, 5.0), ())),
        ];
        let mut contacts = Vec::new();
        resolve_pairs(&mut ps, 0.9, &mut contacts);
        assert!(contacts.is_empty());
    }
}
