//! Collision detection helpers
//!
//! The simulation does not own a physics engine: the host detects contacts
//! and reports them through the `on_*` callbacks in `tick`. These helpers are
//! the detection the bundled runner uses, including the swept
//! segment-vs-circle test that keeps fast particles from tunnelling through
//! paddle probes. The sweep runs in the probe's frame, so a moving paddle
//! catches a particle it passes over just as a moving particle is caught.

use glam::Vec2;

use super::arena::Handle;
use super::state::GameState;
use crate::{Player, Tuning};

/// Extra reach added to probe contact tests
pub const PROBE_MARGIN: f32 = 2.0;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    pub hit: bool,
    /// Closest point on the obstacle
    pub point: Vec2,
    /// Surface normal pointing toward the circle centre
    pub normal: Vec2,
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Whether the segment `a -> b` passes within `radius` of `center`
pub fn segment_intersects_circle(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> bool {
    let seg = b - a;
    let len2 = seg.length_squared();
    let t = if len2 > 0.0 {
        ((center - a).dot(seg) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = a + seg * t;
    closest.distance_squared(center) <= radius * radius
}

#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    a.distance_squared(b) <= (ra + rb) * (ra + rb)
}

/// Circle against an axis-aligned rectangle given by centre and half size
pub fn circle_rect_collision(pos: Vec2, radius: f32, center: Vec2, half: Vec2) -> CollisionResult {
    let closest = pos.clamp(center - half, center + half);
    let offset = pos - closest;
    let dist2 = offset.length_squared();
    if dist2 > radius * radius {
        return CollisionResult::miss();
    }

    if dist2 > 0.0 {
        let dist = dist2.sqrt();
        return CollisionResult {
            hit: true,
            point: closest,
            normal: offset / dist,
            penetration: radius - dist,
        };
    }

    // Centre inside the rectangle: push out through the nearest face
    let local = pos - center;
    let depth = half - local.abs();
    let (normal, penetration) = if depth.x < depth.y {
        (Vec2::new(local.x.signum(), 0.0), depth.x + radius)
    } else {
        (Vec2::new(0.0, local.y.signum()), depth.y + radius)
    };
    CollisionResult {
        hit: true,
        point: pos,
        normal,
        penetration,
    }
}

/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Centre and half size of the stabilizer barrier along the bottom edge
pub fn barrier_rect(tuning: &Tuning) -> (Vec2, Vec2) {
    (
        Vec2::new(tuning.arena_width / 2.0, tuning.arena_height - tuning.barrier_offset),
        Vec2::new(tuning.arena_width / 2.0, tuning.barrier_thickness / 2.0),
    )
}

/// Centre and half size of the two bottom corner bumpers (left, right)
pub fn corner_rects(tuning: &Tuning) -> [(Vec2, Vec2); 2] {
    let size = tuning.corner_block_size;
    let y = tuning.arena_height - tuning.corner_block_offset;
    let half = Vec2::splat(size / 2.0);
    [
        (Vec2::new(size / 2.0, y), half),
        (Vec2::new(tuning.arena_width - size / 2.0, y), half),
    ]
}

/// Past an arena edge by more than the bounds margin
pub fn is_out_of_bounds(pos: Vec2, tuning: &Tuning) -> bool {
    let m = tuning.bounds_margin;
    pos.x < -m || pos.x > tuning.arena_width + m || pos.y < -m || pos.y > tuning.arena_height + m
}

/// A paddle probe touched by a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeContact {
    pub player: Player,
    pub probe_id: u32,
    pub particle: Handle,
}

/// Every contact found in one detection pass
#[derive(Debug, Clone, Default)]
pub struct Contacts {
    pub probes: Vec<ProbeContact>,
    pub barrier: Vec<Handle>,
    /// (particle, block id)
    pub blocks: Vec<(Handle, u32)>,
    /// (pickup, particle)
    pub pickups: Vec<(Handle, Handle)>,
    /// (particle, corner index)
    pub corners: Vec<(Handle, usize)>,
    pub out_of_bounds: Vec<Handle>,
}

impl Contacts {
    pub fn clear(&mut self) {
        self.probes.clear();
        self.barrier.clear();
        self.blocks.clear();
        self.pickups.clear();
        self.corners.clear();
        self.out_of_bounds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
            && self.barrier.is_empty()
            && self.blocks.is_empty()
            && self.pickups.is_empty()
            && self.corners.is_empty()
            && self.out_of_bounds.is_empty()
    }

    /// Detect this tick's contacts for free particles. Each particle hits at
    /// most one probe per paddle and one block.
    pub fn detect(&mut self, state: &GameState, dt: f32) {
        self.clear();
        let tuning = &state.tuning;
        let (barrier_center, barrier_half) = barrier_rect(tuning);
        let corners = corner_rects(tuning);

        for (handle, particle) in state.particles.iter() {
            if !particle.is_free() {
                continue;
            }
            let prev = particle.pos - particle.vel * dt;

            for paddle in &state.paddles {
                let hit = paddle.probes().iter().find(|probe| {
                    let reach = particle.radius + probe.radius + PROBE_MARGIN;
                    let from = prev - probe.prev_pos;
                    let to = particle.pos - probe.world_pos;
                    segment_intersects_circle(from, to, Vec2::ZERO, reach)
                });
                if let Some(probe) = hit {
                    self.probes.push(ProbeContact {
                        player: paddle.owner,
                        probe_id: probe.id,
                        particle: handle,
                    });
                }
            }

            let touches = |center: Vec2, half: Vec2| {
                circle_rect_collision(particle.pos, particle.radius, center, half).hit
            };
            for (i, &(center, half)) in corners.iter().enumerate() {
                if touches(center, half) {
                    self.corners.push((handle, i));
                }
            }

            if touches(barrier_center, barrier_half) {
                self.barrier.push(handle);
            }

            let block = state
                .blocks
                .blocks()
                .iter()
                .find(|block| touches(block.center, block.half_size()));
            if let Some(block) = block {
                self.blocks.push((handle, block.id));
            }

            for (pickup_handle, pickup) in state.pickups.iter() {
                if circles_overlap(particle.pos, particle.radius, pickup.pos, pickup.radius) {
                    self.pickups.push((pickup_handle, handle));
                }
            }

            if is_out_of_bounds(particle.pos, tuning) {
                self.out_of_bounds.push(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::mode::GameMode;
    use crate::sim::particle::ParticleState;

    #[test]
    fn test_segment_catches_tunnelling() {
        // Both endpoints are far from the circle, the path crosses it
        let a = Vec2::new(-100.0, 0.0);
        let b = Vec2::new(100.0, 0.0);
        assert!(segment_intersects_circle(a, b, Vec2::ZERO, 5.0));
        assert!(!segment_intersects_circle(a, b, Vec2::new(0.0, 10.0), 5.0));
    }

    #[test]
    fn test_degenerate_segment_is_point_test() {
        let p = Vec2::new(3.0, 4.0);
        assert!(segment_intersects_circle(p, p, Vec2::ZERO, 5.0));
        assert!(!segment_intersects_circle(p, p, Vec2::ZERO, 4.9));
    }

    #[test]
    fn test_circle_rect_face_normal() {
        let result = circle_rect_collision(
            Vec2::new(0.0, -12.0),
            5.0,
            Vec2::ZERO,
            Vec2::new(50.0, 10.0),
        );
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::new(0.0, -1.0));
        assert!((result.penetration - 3.0).abs() < 1e-5);

        let half = Vec2::new(50.0, 10.0);
        let miss = circle_rect_collision(Vec2::new(0.0, -20.0), 5.0, Vec2::ZERO, half);
        assert!(!miss.hit);
    }

    #[test]
    fn test_circle_rect_centre_inside() {
        let half = Vec2::new(50.0, 10.0);
        let result = circle_rect_collision(Vec2::new(45.0, 0.0), 5.0, Vec2::ZERO, half);
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_reflect_velocity() {
        let reflected = reflect_velocity(Vec2::new(100.0, 50.0), Vec2::new(0.0, -1.0));
        assert_eq!(reflected, Vec2::new(100.0, -50.0));
    }

    #[test]
    fn test_bounds() {
        let tuning = Tuning::default();
        assert!(!is_out_of_bounds(Vec2::new(-49.0, 500.0), &tuning));
        assert!(is_out_of_bounds(Vec2::new(-51.0, 500.0), &tuning));
        assert!(is_out_of_bounds(Vec2::new(900.0, 1131.0), &tuning));
    }

    #[test]
    fn test_detect_swept_probe_hit() {
        let mut state = GameState::new(5, GameMode::Practice, Tuning::default());
        state.clear_particles();
        let h = state
            .spawn_particle(Vec2::new(60.0, 540.0), ParticleState::Free)
            .unwrap();
        // Moved from x=160 to x=60 this tick, straight through the left paddle at x=100
        state.particles.get_mut(h).unwrap().vel = Vec2::new(-6000.0, 0.0);

        let mut contacts = Contacts::default();
        contacts.detect(&state, 1.0 / 60.0);
        assert_eq!(contacts.probes.len(), 1);
        assert_eq!(contacts.probes[0].player, Player::One);
        assert_eq!(contacts.probes[0].particle, h);
        assert!(contacts.barrier.is_empty());
    }

    #[test]
    fn test_detect_moving_paddle_sweeps_through_resting_particle() {
        let mut state = GameState::new(5, GameMode::Practice, Tuning::default());
        state.clear_particles();
        let h = state
            .spawn_particle(Vec2::new(100.0, 380.0), ParticleState::Free)
            .unwrap();
        state.particles.get_mut(h).unwrap().vel = Vec2::ZERO;

        // Probes now span y=450..630 and moved 80px down this tick
        let paddle = state.paddle_mut(Player::One);
        paddle.vel_y = 4800.0;
        paddle.refresh_probes(1.0 / 60.0);

        let mut contacts = Contacts::default();
        contacts.detect(&state, 1.0 / 60.0);
        assert_eq!(contacts.probes.len(), 1);
        assert_eq!(contacts.probes[0].player, Player::One);
        assert_eq!(contacts.probes[0].particle, h);

        // Without the paddle's own motion the gap is too wide to touch
        state.paddle_mut(Player::One).vel_y = 0.0;
        state.paddle_mut(Player::One).refresh_probes(1.0 / 60.0);
        contacts.detect(&state, 1.0 / 60.0);
        assert!(contacts.probes.is_empty());
    }

    #[test]
    fn test_detect_ignores_attached() {
        let state = GameState::new(5, GameMode::Practice, Tuning::default());
        let mut contacts = Contacts::default();
        contacts.detect(&state, 1.0 / 60.0);
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_detect_barrier_and_block() {
        let mut state = GameState::new(5, GameMode::Practice, Tuning::default());
        state.clear_particles();
        let low = state
            .spawn_particle(Vec2::new(900.0, 1030.0), ParticleState::Free)
            .unwrap();
        let block = state.blocks.blocks()[0];
        let high = state
            .spawn_particle(block.center + Vec2::new(0.0, 30.0), ParticleState::Free)
            .unwrap();

        let mut contacts = Contacts::default();
        contacts.detect(&state, 1.0 / 60.0);
        assert_eq!(contacts.barrier, vec![low]);
        assert_eq!(contacts.blocks, vec![(high, block.id)]);
    }
}
