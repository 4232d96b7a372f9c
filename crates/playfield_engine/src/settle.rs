//! # Settling Detector
//!
//! Transitions free particles to rest.
//!
//! ## Stack settling
//!
//! The floor is cut into columns one slot wide. A new particle reserves the
//! lowest unoccupied slot among the columns within `spread` of its drop
//! column, scanning outward (drop, left 1, right 1, left 2, ...). The first
//! lowest slot in scan order wins, so ties go to the column nearest the drop
//! point. The particle settles when its bottom edge reaches the slot.
//!
//! ## Velocity settling
//!
//! A particle settles once its speed (vertical or total) drops below a
//! threshold and, if support is required, it sits on the floor or on top of
//! an already-settled particle.

use playfield_shared::constants::CONTACT_TOLERANCE;
use playfield_shared::Vec2;

use crate::particle::{Extent, Particle, ParticleState, Slot};
use crate::space::Space;

/// Overlap beyond which a settling candidate is still interpenetrating.
const PENETRATION_SLACK: f32 = 1e-3;

/// Occupancy of the discrete floor slots.
#[derive(Clone, Debug)]
pub struct StackGrid {
    slot_size: f32,
    spread: u32,
    floor: f32,
    heights: Vec<u32>,
}

impl StackGrid {
    /// Grid for a rect space `width` wide with its floor at `floor`.
    #[must_use]
    pub fn new(width: f32, floor: f32, slot_size: f32, spread: u32) -> Self {
        let columns = (width / slot_size).floor().max(0.0) as usize;
        Self {
            slot_size,
            spread,
            floor,
            heights: vec![0; columns],
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.heights.len()
    }

    /// Occupied levels in a column.
    #[must_use]
    pub fn height(&self, column: u32) -> u32 {
        self.heights.get(column as usize).copied().unwrap_or(0)
    }

    /// Column under a horizontal position.
    #[must_use]
    pub fn column_at(&self, x: f32) -> u32 {
        let last = self.heights.len().saturating_sub(1);
        ((x / self.slot_size).floor().max(0.0) as usize).min(last) as u32
    }

    fn max_levels(&self) -> u32 {
        (self.floor / self.slot_size).floor().max(0.0) as u32
    }

    /// Reserves the lowest free slot near `drop_column`.
    ///
    /// Returns `None` when every candidate column is full.
    pub fn reserve(&mut self, drop_column: u32) -> Option<Slot> {
        let columns = self.heights.len() as i64;
        let drop = i64::from(drop_column);
        let max_levels = self.max_levels();

        let mut best: Option<(u32, u32)> = None;
        let mut consider = |column: i64, heights: &[u32]| {
            if column < 0 || column >= columns {
                return;
            }
            let level = heights[column as usize];
            if level >= max_levels {
                return;
            }
            if best.map_or(true, |(_, best_level)| level < best_level) {
                best = Some((column as u32, level));
            }
        };

        // Columns past either edge can never be reserved.
        consider(drop, &self.heights);
        for d in 1..=i64::from(self.spread).min(columns) {
            consider(drop - d, &self.heights);
            consider(drop + d, &self.heights);
        }

        let (column, level) = best?;
        self.heights[column as usize] += 1;
        Some(Slot { column, level })
    }

    /// Top-left position that rests an extent of `size` in `slot`.
    #[must_use]
    pub fn slot_position(&self, slot: Slot, size: Vec2) -> Vec2 {
        let x = slot.column as f32 * self.slot_size + (self.slot_size - size.x) * 0.5;
        let bottom = self.floor - slot.level as f32 * self.slot_size;
        Vec2::new(x, bottom - size.y)
    }

    /// Empties every column.
    pub fn clear(&mut self) {
        self.heights.iter_mut().for_each(|h| *h = 0);
    }
}

/// True once a stacking particle's bottom edge reaches its reserved slot.
pub(crate) fn reached_slot<M>(grid: &StackGrid, particle: &Particle<M>, slot: Slot) -> bool {
    let size = particle.extent().size();
    let target = grid.slot_position(slot, size);
    particle.position.y >= target.y
}

/// Velocity rule: slow enough and, if required, supported.
pub(crate) fn velocity_rest<M>(
    particles: &[Particle<M>],
    index: usize,
    space: &Space,
    max_speed: f32,
    vertical_only: bool,
    require_support: bool,
) -> bool {
    let p = &particles[index];
    let speed = if vertical_only {
        p.velocity.y.abs()
    } else {
        p.velocity.length()
    };
    if speed >= max_speed {
        return false;
    }

    let settled = || {
        particles
            .iter()
            .enumerate()
            .filter(move |(j, q)| *j != index && q.state == ParticleState::Settled)
            .map(|(_, q)| q)
    };

    // Never come to rest inside a settled neighbour.
    if settled().any(|q| penetrates(p, q)) {
        return false;
    }
    if !require_support {
        return true;
    }
    space.touches_floor(p, CONTACT_TOLERANCE) || settled().any(|q| rests_on(p, q))
}

/// Deep overlap between two settled-candidate extents.
fn penetrates<M>(p: &Particle<M>, q: &Particle<M>) -> bool {
    match (p.extent(), q.extent()) {
        (Extent::Circle { radius: rp }, Extent::Circle { radius: rq }) => {
            p.center().distance(q.center()) + PENETRATION_SLACK < rp + rq
        }
        _ => {
            let (ps, qs) = (p.extent().size(), q.extent().size());
            let overlap_x =
                (p.position.x + ps.x).min(q.position.x + qs.x) - p.position.x.max(q.position.x);
            let overlap_y =
                (p.position.y + ps.y).min(q.position.y + qs.y) - p.position.y.max(q.position.y);
            overlap_x > PENETRATION_SLACK && overlap_y > PENETRATION_SLACK
        }
    }
}

/// `p` is in contact with `q` and above it.
fn rests_on<M>(p: &Particle<M>, q: &Particle<M>) -> bool {
    match (p.extent(), q.extent()) {
        (Extent::Circle { radius: rp }, Extent::Circle { radius: rq }) => {
            q.center().y > p.center().y
                && p.center().distance(q.center()) <= rp + rq + CONTACT_TOLERANCE
        }
        _ => {
            let (ps, qs) = (p.extent().size(), q.extent().size());
            let bottom = p.position.y + ps.y;
            let horizontal =
                p.position.x < q.position.x + qs.x && q.position.x < p.position.x + ps.x;
            horizontal && (bottom - q.position.y).abs() <= CONTACT_TOLERANCE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_prefers_drop_column_then_nearest() {
        let mut grid = StackGrid::new(40.0, 40.0, 4.0, 2);
        assert_eq!(grid.columns(), 10);

        assert_eq!(grid.reserve(5), Some(Slot { column: 5, level: 0 }));
        // Drop column now higher: nearest lower neighbour, left first.
        assert_eq!(grid.reserve(5), Some(Slot { column: 4, level: 0 }));
        assert_eq!(grid.reserve(5), Some(Slot { column: 6, level: 0 }));
        assert_eq!(grid.reserve(5), Some(Slot { column: 3, level: 0 }));
        assert_eq!(grid.reserve(5), Some(Slot { column: 7, level: 0 }));
        // All within spread are level 1 now; drop column wins the tie.
        assert_eq!(grid.reserve(5), Some(Slot { column: 5, level: 1 }));
    }

    #[test]
    fn test_reserve_respects_edges_and_capacity() {
        let mut grid = StackGrid::new(8.0, 8.0, 4.0, 1);
        assert_eq!(grid.columns(), 2);
        for _ in 0..4 {
            assert!(grid.reserve(0).is_some());
        }
        assert_eq!(grid.reserve(0), None);
        assert_eq!(grid.height(0), 2);
        assert_eq!(grid.height(1), 2);
    }

    #[test]
    fn test_wide_spread_scans_only_real_columns() {
        let mut grid = StackGrid::new(8.0, 4.0, 4.0, u32::MAX);
        assert_eq!(grid.reserve(0), Some(Slot { column: 0, level: 0 }));
        assert_eq!(grid.reserve(0), Some(Slot { column: 1, level: 0 }));
        assert_eq!(grid.reserve(0), None);
    }

    #[test]
    fn test_slot_position_rests_on_floor() {
        let grid = StackGrid::new(40.0, 100.0, 4.0, 2);
        let pos = grid.slot_position(Slot { column: 2, level: 1 }, Vec2::new(4.0, 4.0));
        assert_eq!(pos, Vec2::new(8.0, 92.0));
    }
}
