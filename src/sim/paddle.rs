//! Player paddle: vertical movement, rotation and collision probes
//!
//! A paddle is a thin bar that moves vertically and tilts up to
//! `max_rotation_deg`. Collision is modelled by a row of circular probes along
//! its length instead of one rotated rectangle; their world positions are
//! recomputed from the pose every tick.

use std::collections::VecDeque;

use glam::Vec2;

use super::effects::{EffectKind, EffectTarget, StatusEffect};
use super::input::{Action, InputSystem};
use crate::{Player, Tuning, lerp, rotate_deg};

/// One circular collision region along a paddle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionProbe {
    /// Stable identity; survives resizes
    pub id: u32,
    /// Position along the paddle, 0 = top end, 1 = bottom end
    pub t: f32,
    /// Offset from the paddle centre along its length (unscaled)
    pub local_y: f32,
    pub radius: f32,
    pub world_pos: Vec2,
    /// Where the probe was one tick ago, for swept tests
    pub prev_pos: Vec2,
}

/// Gradual probe-count change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeRequest {
    Expand { target: usize, duration_ms: f64 },
    Retract { target: usize, duration_ms: f64 },
}

impl ResizeRequest {
    fn target(self) -> usize {
        match self {
            ResizeRequest::Expand { target, .. } | ResizeRequest::Retract { target, .. } => target,
        }
    }

    fn duration_ms(self) -> f64 {
        match self {
            ResizeRequest::Expand { duration_ms, .. }
            | ResizeRequest::Retract { duration_ms, .. } => duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveResize {
    request: ResizeRequest,
    interval_ms: f64,
    next_at: f64,
}

#[derive(Debug, Clone)]
pub struct Paddle {
    pub owner: Player,
    /// Centre of the bar
    pub pos: Vec2,
    /// Logical rotation: positive tilts the face upward for either side
    pub rotation_deg: f32,
    /// Vertical velocity this tick (px/s)
    pub vel_y: f32,
    pub base_speed: f32,
    /// Speed after status effects, re-derived every tick
    pub speed: f32,
    pub width: f32,
    /// Unscaled length
    pub base_length: f32,
    /// Length multiplier (growth effect)
    pub length_scale: f32,
    pub effects: Vec<StatusEffect>,
    probes: Vec<CollisionProbe>,
    base_probe_count: usize,
    next_probe_id: u32,
    resize_queue: VecDeque<ResizeRequest>,
    active_resize: Option<ActiveResize>,
    arena_height: f32,
}

impl Paddle {
    pub fn new(owner: Player, tuning: &Tuning) -> Self {
        let x = if owner.is_left() {
            tuning.paddle_inset
        } else {
            tuning.arena_width - tuning.paddle_inset
        };
        let mut paddle = Self {
            owner,
            pos: Vec2::new(x, tuning.arena_height / 2.0),
            rotation_deg: 0.0,
            vel_y: 0.0,
            base_speed: tuning.paddle_speed,
            speed: tuning.paddle_speed,
            width: tuning.paddle_width,
            base_length: tuning.paddle_length,
            length_scale: 1.0,
            effects: Vec::with_capacity(4),
            probes: Vec::with_capacity(tuning.grown_probe_count()),
            base_probe_count: tuning.probe_count,
            next_probe_id: 0,
            resize_queue: VecDeque::with_capacity(4),
            active_resize: None,
            arena_height: tuning.arena_height,
        };

        let radius = tuning.probe_radius();
        for _ in 0..tuning.probe_count {
            let id = paddle.next_probe_id;
            paddle.next_probe_id += 1;
            paddle.probes.push(CollisionProbe {
                id,
                t: 0.0,
                local_y: 0.0,
                radius,
                world_pos: Vec2::ZERO,
                prev_pos: Vec2::ZERO,
            });
        }
        paddle.respace_probes();
        paddle.refresh_probes(0.0);
        paddle
    }

    #[inline]
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    /// Half of the unscaled length
    #[inline]
    pub fn half_length(&self) -> f32 {
        self.base_length / 2.0
    }

    /// Angle the bar is drawn at. Logical rotation is mirrored for the left
    /// paddle so that "positive" means the same thing on both sides.
    #[inline]
    pub fn visual_angle_deg(&self) -> f32 {
        if self.owner.is_left() {
            -self.rotation_deg
        } else {
            self.rotation_deg
        }
    }

    pub fn probes(&self) -> &[CollisionProbe] {
        &self.probes
    }

    pub fn probe(&self, id: u32) -> Option<&CollisionProbe> {
        self.probes.iter().find(|p| p.id == id)
    }

    pub fn base_probe_count(&self) -> usize {
        self.base_probe_count
    }

    /// True while a resize is animating or waiting in the queue
    pub fn is_resizing(&self) -> bool {
        self.active_resize.is_some() || !self.resize_queue.is_empty()
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind() == kind)
    }

    /// Advance one tick: effects, movement, rotation, probe resize, probes
    pub fn update(&mut self, input: &InputSystem, tuning: &Tuning, dt: f32, now: f64) {
        self.update_effects(now, tuning);

        // Movement is instantaneous; Down wins when both are held
        self.vel_y = 0.0;
        if input.is_down(Action::Up, self.owner) {
            self.vel_y = -self.speed;
        }
        if input.is_down(Action::Down, self.owner) {
            self.vel_y = self.speed;
        }
        let half = self.half_length() * self.length_scale;
        let max_y = (self.arena_height - half).max(half);
        self.pos.y = (self.pos.y + self.vel_y * dt).clamp(half, max_y);

        let left = input.is_down(Action::Left, self.owner);
        let right = input.is_down(Action::Right, self.owner);
        self.apply_rotation(left, right, tuning, dt);

        self.advance_resize(now);
        self.refresh_probes(dt);
    }

    /// Rotation state machine for one tick
    pub fn apply_rotation(&mut self, left: bool, right: bool, tuning: &Tuning, dt: f32) {
        // Left tilts up on the left paddle and down on the right one
        let sign = self.owner.side();
        if left {
            self.rotation_deg += sign * tuning.rotation_speed_deg;
        }
        if right {
            self.rotation_deg -= sign * tuning.rotation_speed_deg;
        }

        let rotating = left || right;
        if !rotating && self.rotation_deg.abs() < tuning.dead_zone_deg && self.rotation_deg != 0.0 {
            let factor = (tuning.return_speed * dt * 1000.0 * 0.05).min(1.0);
            self.rotation_deg = lerp(self.rotation_deg, 0.0, factor);
            if self.rotation_deg.abs() < tuning.rotation_snap_deg {
                self.rotation_deg = 0.0;
            }
        }

        self.rotation_deg = self
            .rotation_deg
            .clamp(-tuning.max_rotation_deg, tuning.max_rotation_deg);
    }

    /// World position of a probe from the current pose
    pub fn probe_world_position(&self, probe: &CollisionProbe) -> Vec2 {
        let local = Vec2::new(0.0, probe.local_y * self.length_scale);
        self.pos + rotate_deg(local, self.visual_angle_deg())
    }

    /// All probe world positions, recomputed from the pose
    pub fn probe_world_positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.probes.iter().map(|p| self.probe_world_position(p))
    }

    /// Recompute cached probe positions
    pub fn refresh_probes(&mut self, dt: f32) {
        let step = Vec2::new(0.0, self.vel_y * dt);
        for i in 0..self.probes.len() {
            let world = self.probe_world_position(&self.probes[i]);
            let probe = &mut self.probes[i];
            probe.world_pos = world;
            probe.prev_pos = world - step;
        }
    }

    /// Queue a probe-count change; requests run one after another
    pub fn request_resize(&mut self, request: ResizeRequest) {
        self.resize_queue.push_back(request);
    }

    fn advance_resize(&mut self, now: f64) {
        loop {
            let mut job = match self.active_resize {
                Some(job) => job,
                None => {
                    let Some(request) = self.resize_queue.pop_front() else {
                        return;
                    };
                    let steps = self.resize_steps(request);
                    if steps == 0 {
                        continue;
                    }
                    log::debug!(
                        "{:?} paddle resize start: {} -> {} probes",
                        self.owner,
                        self.probes.len(),
                        request.target()
                    );
                    let interval_ms = request.duration_ms() / steps as f64;
                    let next_at = match request {
                        ResizeRequest::Expand { .. } => now + interval_ms,
                        ResizeRequest::Retract { .. } => now,
                    };
                    ActiveResize {
                        request,
                        interval_ms,
                        next_at,
                    }
                }
            };

            while now >= job.next_at && self.resize_steps(job.request) > 0 {
                match job.request {
                    ResizeRequest::Expand { .. } => self.insert_probe(),
                    ResizeRequest::Retract { .. } => self.remove_extra_probe(),
                }
                job.next_at += job.interval_ms;
            }

            if self.resize_steps(job.request) == 0 {
                log::debug!(
                    "{:?} paddle resize done: {} probes",
                    self.owner,
                    self.probes.len()
                );
                self.active_resize = None;
            } else {
                self.active_resize = Some(job);
                return;
            }
        }
    }

    /// Probes still to add/remove for a request
    fn resize_steps(&self, request: ResizeRequest) -> usize {
        let count = self.probes.len();
        match request {
            ResizeRequest::Expand { target, .. } => target.saturating_sub(count),
            ResizeRequest::Retract { target, .. } => {
                let extras = self
                    .probes
                    .iter()
                    .filter(|p| p.id as usize >= self.base_probe_count)
                    .count();
                count.saturating_sub(target).min(extras)
            }
        }
    }

    /// Add one probe in the widest gap, then even out spacing
    fn insert_probe(&mut self) {
        let mut at = 1;
        let mut widest = f32::MIN;
        for (i, pair) in self.probes.windows(2).enumerate() {
            let gap = pair[1].t - pair[0].t;
            if gap > widest {
                widest = gap;
                at = i + 1;
            }
        }
        let radius = self.probes.first().map_or(self.half_width(), |p| p.radius);
        let id = self.next_probe_id;
        self.next_probe_id += 1;
        self.probes.insert(
            at.min(self.probes.len()),
            CollisionProbe {
                id,
                t: 0.0,
                local_y: 0.0,
                radius,
                world_pos: self.pos,
                prev_pos: self.pos,
            },
        );
        self.respace_probes();
    }

    /// Remove the newest probe added by an expansion
    fn remove_extra_probe(&mut self) {
        let newest = self
            .probes
            .iter()
            .enumerate()
            .filter(|(_, p)| p.id as usize >= self.base_probe_count)
            .max_by_key(|(_, p)| p.id)
            .map(|(i, _)| i);
        if let Some(i) = newest {
            self.probes.remove(i);
            self.respace_probes();
        }
    }

    /// Spread probes evenly end to end, keeping their order
    fn respace_probes(&mut self) {
        let n = self.probes.len();
        let half = self.half_length();
        for (i, probe) in self.probes.iter_mut().enumerate() {
            probe.t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.5 };
            probe.local_y = lerp(-half + probe.radius, half - probe.radius, probe.t);
        }
    }

    /// Start (or extend) the growth effect
    pub fn grant_grow(&mut self, now: f64, tuning: &Tuning) {
        let expires = now + tuning.grow_duration_ms;
        for effect in &mut self.effects {
            if let StatusEffect::PaddleGrow {
                expires_at,
                retracting: false,
                ..
            } = effect
            {
                *expires_at = expires;
                log::info!("{:?} paddle growth extended", self.owner);
                return;
            }
        }

        // A shrinking growth is replaced, starting from the current length
        self.effects
            .retain(|e| !matches!(e, StatusEffect::PaddleGrow { .. }));
        self.effects.push(StatusEffect::PaddleGrow {
            from: self.length_scale,
            to: tuning.grow_scale,
            started_at: now,
            expires_at: expires,
            tween_ms: tuning.grow_tween_ms,
            retracting: false,
        });
        self.request_resize(ResizeRequest::Expand {
            target: tuning.grown_probe_count(),
            duration_ms: tuning.grow_tween_ms,
        });
        log::info!("{:?} paddle growing", self.owner);
    }

    /// Start (or extend) the slow-down effect
    pub fn grant_snail(&mut self, now: f64, tuning: &Tuning) {
        let expires = now + tuning.snail_duration_ms;
        for effect in &mut self.effects {
            if let StatusEffect::Snail { expires_at, .. } = effect {
                *expires_at = expires;
                return;
            }
        }
        self.effects.push(StatusEffect::Snail {
            factor: tuning.snail_factor,
            expires_at: expires,
        });
        log::info!("{:?} paddle slowed", self.owner);
    }

    fn update_effects(&mut self, now: f64, tuning: &Tuning) {
        self.speed = self.base_speed;
        self.length_scale = 1.0;

        let mut retract = false;
        for effect in &mut self.effects {
            if let StatusEffect::PaddleGrow {
                expires_at,
                retracting,
                ..
            } = effect
                && !*retracting
                && now >= *expires_at
            {
                *retracting = true;
                retract = true;
            }
        }
        if retract {
            self.request_resize(ResizeRequest::Retract {
                target: self.base_probe_count,
                duration_ms: tuning.grow_tween_ms,
            });
        }

        let owner = self.owner;
        self.effects.retain(|e| {
            let keep = !e.is_expired(now);
            if !keep {
                log::info!("{:?} paddle effect {:?} expired", owner, e.kind());
            }
            keep
        });

        let effects = std::mem::take(&mut self.effects);
        for effect in &effects {
            effect.apply(EffectTarget::Paddle(self), now);
        }
        self.effects = effects;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::input::{InputFrame, KeyCode};
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn paddle(owner: Player) -> (Paddle, Tuning) {
        let tuning = Tuning::default();
        (Paddle::new(owner, &tuning), tuning)
    }

    #[test]
    fn test_initial_layout() {
        let (p1, tuning) = paddle(Player::One);
        let (p2, _) = paddle(Player::Two);
        assert_eq!(p1.pos, Vec2::new(100.0, 540.0));
        assert_eq!(p2.pos, Vec2::new(1820.0, 540.0));
        assert_eq!(p1.probes().len(), tuning.probe_count);

        // First/last probe sit one radius inside the ends
        let first = p1.probes()[0];
        let last = p1.probes()[tuning.probe_count - 1];
        assert!((first.local_y - -90.0).abs() < 1e-4);
        assert!((last.local_y - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_clamps() {
        let (mut p, tuning) = paddle(Player::One);
        for _ in 0..100 {
            p.apply_rotation(true, false, &tuning, DT);
        }
        assert_eq!(p.rotation_deg, tuning.max_rotation_deg);
    }

    #[test]
    fn test_rotation_sign_is_mirrored() {
        let (mut p1, tuning) = paddle(Player::One);
        let (mut p2, _) = paddle(Player::Two);
        p1.apply_rotation(true, false, &tuning, DT);
        p2.apply_rotation(true, false, &tuning, DT);
        assert_eq!(p1.rotation_deg, 2.5);
        assert_eq!(p2.rotation_deg, -2.5);
    }

    #[test]
    fn test_outside_dead_zone_holds() {
        let (mut p, tuning) = paddle(Player::One);
        p.rotation_deg = 30.0;
        for _ in 0..60 {
            p.apply_rotation(false, false, &tuning, DT);
        }
        assert_eq!(p.rotation_deg, 30.0);
    }

    #[test]
    fn test_movement_and_bounds() {
        let (mut p, tuning) = paddle(Player::One);
        let mut input = InputSystem::default();
        input.update(&InputFrame::new().with_key(KeyCode::W));
        p.update(&input, &tuning, DT, 0.0);
        assert_eq!(p.vel_y, -1200.0);
        assert!((p.pos.y - (540.0 - 20.0)).abs() < 1e-3);

        for _ in 0..120 {
            p.update(&input, &tuning, DT, 0.0);
        }
        assert_eq!(p.pos.y, 100.0, "top edge clamps at half length");

        input.update(&InputFrame::new());
        p.update(&input, &tuning, DT, 0.0);
        assert_eq!(p.vel_y, 0.0);
    }

    #[test]
    fn test_prev_pos_trails_velocity() {
        let (mut p, tuning) = paddle(Player::Two);
        let mut input = InputSystem::default();
        input.update(&InputFrame::new().with_key(KeyCode::ArrowDown));
        p.update(&input, &tuning, DT, 0.0);
        for probe in p.probes() {
            let step = probe.world_pos - probe.prev_pos;
            assert!((step.y - 1200.0 * DT).abs() < 1e-3);
            assert!(step.x.abs() < 1e-4);
        }
    }

    #[test]
    fn test_snail_halves_speed_then_expires() {
        let (mut p, tuning) = paddle(Player::One);
        let input = InputSystem::default();
        p.grant_snail(0.0, &tuning);
        p.update(&input, &tuning, DT, 100.0);
        assert_eq!(p.speed, 600.0);
        p.update(&input, &tuning, DT, 5_000.0);
        assert_eq!(p.speed, 1200.0);
        assert!(!p.has_effect(EffectKind::Snail));
    }

    #[test]
    fn test_grow_expands_then_retracts_probes() {
        let tuning = Tuning {
            probe_count: 5,
            ..Tuning::default()
        };
        let mut p = Paddle::new(Player::One, &tuning);
        let input = InputSystem::default();
        let original_ids: Vec<u32> = p.probes().iter().map(|pr| pr.id).collect();

        p.grant_grow(0.0, &tuning);
        p.update(&input, &tuning, DT, 0.0);
        p.update(&input, &tuning, DT, 2_100.0);
        assert_eq!(p.probes().len(), 17);
        assert!((p.length_scale - 1.5).abs() < 1e-5);

        // Pre-existing probes keep their identity and relative order
        let kept: Vec<u32> = p
            .probes()
            .iter()
            .map(|pr| pr.id)
            .filter(|id| original_ids.contains(id))
            .collect();
        assert_eq!(kept, original_ids);

        p.update(&input, &tuning, DT, 12_000.0);
        p.update(&input, &tuning, DT, 14_000.0);
        assert_eq!(p.probes().len(), 5);
        assert!(!p.is_resizing());
        assert_eq!(p.length_scale, 1.0);
    }

    #[test]
    fn test_resize_requests_are_serialized() {
        let (mut p, tuning) = paddle(Player::One);
        p.request_resize(ResizeRequest::Expand {
            target: 30,
            duration_ms: 1_000.0,
        });
        p.request_resize(ResizeRequest::Retract {
            target: 20,
            duration_ms: 1_000.0,
        });
        let input = InputSystem::default();

        p.update(&input, &tuning, DT, 0.0);
        p.update(&input, &tuning, DT, 500.0);
        assert_eq!(p.probes().len(), 25, "expansion runs first, half way");
        p.update(&input, &tuning, DT, 1_000.0);
        assert_eq!(p.probes().len(), 29, "retraction starts as soon as expansion ends");
        assert!(p.is_resizing());
        p.update(&input, &tuning, DT, 2_000.0);
        assert_eq!(p.probes().len(), 20);
        assert!(!p.is_resizing());
    }

    proptest! {
        #[test]
        fn prop_dead_zone_converges_without_overshoot(start in -14.9f32..14.9f32) {
            let (mut p, tuning) = paddle(Player::One);
            p.rotation_deg = start;
            let sign = start.signum();
            let mut last = start.abs();
            for _ in 0..200 {
                p.apply_rotation(false, false, &tuning, DT);
                prop_assert!(p.rotation_deg == 0.0 || p.rotation_deg.signum() == sign);
                prop_assert!(p.rotation_deg.abs() <= last);
                last = p.rotation_deg.abs();
            }
            prop_assert_eq!(p.rotation_deg, 0.0);
        }

        #[test]
        fn prop_probe_positions_are_pure(rot in -55.0f32..55.0, y in 100.0f32..980.0) {
            let (mut p, _) = paddle(Player::Two);
            p.rotation_deg = rot;
            p.pos.y = y;
            let a: Vec<Vec2> = p.probe_world_positions().collect();
            let b: Vec<Vec2> = p.probe_world_positions().collect();
            prop_assert_eq!(&a, &b);
            p.refresh_probes(DT);
            p.refresh_probes(DT);
            for (probe, pos) in p.probes().iter().zip(&a) {
                prop_assert_eq!(probe.world_pos, *pos);
            }
        }
    }
}
