//! The volleyed particle: charge, attachment and deflection

use glam::Vec2;
use rand::Rng;

use super::arena::Recycle;
use super::charge::{ChargeState, charge_state, saturating_charge};
use super::effects::{EffectKind, EffectTarget, StatusEffect};
use super::paddle::Paddle;
use super::tether::TetherBinding;
use crate::consts::{CLAIMABLE_STROKE, NEUTRAL_STROKE};
use crate::{Player, Tuning, rotate_deg};

/// Particle lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleState {
    /// Riding a paddle in one of its slots, waiting for launch
    Attached { owner: Player, slot: usize },
    /// Moving freely
    #[default]
    Free,
    /// Neutral and immovable, waiting to be claimed
    Claimable,
}

#[derive(Debug, Clone, Default)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub base_radius: f32,
    /// `base_radius` scaled by the charge level
    pub radius: f32,
    pub base_speed: f32,
    pub state: ParticleState,
    pub charge: u8,
    pub max_charge: u8,
    pub last_hit_by: Option<Player>,
    /// Creation order, used to claim the oldest particles first
    pub spawn_seq: u64,
    /// Fill color from the charge table
    pub color: u32,
    /// Outline color: last hitter, neutral or claimable
    pub stroke: u32,
    pub tether: Option<TetherBinding>,
    pub effects: Vec<StatusEffect>,
    last_hit_ms: [Option<f64>; 2],
    last_barrier_ms: Option<f64>,
}

impl Particle {
    pub fn new(
        pos: Vec2,
        state: ParticleState,
        max_charge: u8,
        spawn_seq: u64,
        tuning: &Tuning,
    ) -> Self {
        let stroke = if state == ParticleState::Claimable {
            CLAIMABLE_STROKE
        } else {
            NEUTRAL_STROKE
        };
        let mut particle = Self {
            pos,
            base_radius: tuning.particle_radius,
            radius: tuning.particle_radius,
            base_speed: tuning.particle_speed,
            state,
            max_charge,
            spawn_seq,
            stroke,
            ..Default::default()
        };
        particle.normalize();
        particle
    }

    /// Reinitialise a pooled particle in place, keeping its effect buffer
    pub fn respawn(
        &mut self,
        pos: Vec2,
        state: ParticleState,
        max_charge: u8,
        spawn_seq: u64,
        tuning: &Tuning,
    ) {
        let mut effects = std::mem::take(&mut self.effects);
        effects.clear();
        *self = Self::new(pos, state, max_charge, spawn_seq, tuning);
        self.effects = effects;
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.state == ParticleState::Free
    }

    #[inline]
    pub fn is_claimable(&self) -> bool {
        self.state == ParticleState::Claimable
    }

    /// Paddle owner and slot when attached
    #[inline]
    pub fn attachment(&self) -> Option<(Player, usize)> {
        match self.state {
            ParticleState::Attached { owner, slot } => Some((owner, slot)),
            _ => None,
        }
    }

    #[inline]
    pub fn charge_state(&self) -> &'static ChargeState {
        charge_state(self.charge)
    }

    /// False while `player` struck this particle less than `cooldown_ms` ago
    pub fn can_accept_hit(&self, player: Player, now: f64, cooldown_ms: f64) -> bool {
        match self.last_hit_ms[player.index()] {
            Some(last) => now - last >= cooldown_ms,
            None => true,
        }
    }

    pub fn record_hit(&mut self, player: Player, now: f64) {
        self.last_hit_ms[player.index()] = Some(now);
    }

    /// Set the last hitter. A shield keeps its owner as last hitter.
    pub fn set_last_hit(&mut self, player: Player) {
        if let Some(owner) = self.shield_owner() {
            self.last_hit_by = Some(owner);
            return;
        }
        self.last_hit_by = Some(player);
        self.stroke = player.color();
    }

    pub fn add_charge(&mut self) -> u8 {
        self.charge = saturating_charge(self.charge, self.max_charge);
        self.charge
    }

    pub fn discharge(&mut self) -> u8 {
        self.charge = self.charge.saturating_sub(1);
        self.charge
    }

    /// Re-derive radius, speed and color from the charge level. Position is
    /// never touched.
    pub fn normalize(&mut self) {
        let level = self.charge_state();
        self.radius = self.base_radius * level.scale;
        self.color = level.color;
        if self.vel != Vec2::ZERO {
            self.vel = self.vel.normalize() * self.base_speed * level.speed_multiplier;
        }
    }

    /// Set velocity along `dir` at the charge-scaled speed
    pub fn deflect(&mut self, dir: Vec2) {
        let speed = self.base_speed * self.charge_state().speed_multiplier;
        self.vel = dir.normalize_or_zero() * speed;
    }

    /// Integrate a free particle; top and bottom walls reflect
    pub fn integrate(&mut self, dt: f32, arena_height: f32) {
        if !self.is_free() {
            return;
        }
        self.pos += self.vel * dt;
        if self.pos.y - self.radius < 0.0 && self.vel.y < 0.0 {
            self.pos.y = self.radius;
            self.vel.y = -self.vel.y;
        } else if self.pos.y + self.radius > arena_height && self.vel.y > 0.0 {
            self.pos.y = arena_height - self.radius;
            self.vel.y = -self.vel.y;
        }
    }

    /// Ride a paddle: zero velocity, charge reset
    pub fn attach(&mut self, owner: Player, slot: usize) {
        self.state = ParticleState::Attached { owner, slot };
        self.vel = Vec2::ZERO;
        self.charge = 0;
        self.stroke = NEUTRAL_STROKE;
        self.set_last_hit(owner);
        self.normalize();
    }

    /// Follow the paddle pose; never integrated
    pub fn follow_paddle(&mut self, paddle: &Paddle, tuning: &Tuning) {
        let Some((owner, slot)) = self.attachment() else {
            return;
        };
        self.vel = Vec2::ZERO;
        self.pos = attached_position(paddle, slot, self.radius, tuning);
        self.set_last_hit(owner);
    }

    /// Leave the paddle; a launch that would be too flat is tipped up or
    /// down at random
    pub fn launch(&mut self, paddle: &Paddle, tuning: &Tuning, rng: &mut impl Rng) {
        if self.attachment().is_none() {
            return;
        }
        let dir = launch_direction(
            paddle.owner,
            paddle.rotation_deg,
            tuning.max_rotation_deg,
            paddle.vel_y / tuning.paddle_speed,
            rng.random_bool(0.5),
        );
        self.state = ParticleState::Free;
        self.deflect(dir);
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind() == kind)
    }

    pub fn shield_owner(&self) -> Option<Player> {
        self.effects.iter().find_map(|e| match e {
            StatusEffect::Shield { owner } => Some(*owner),
            _ => None,
        })
    }

    /// Add a shield; false if one is already up
    pub fn grant_shield(&mut self, owner: Player) -> bool {
        if self.shield_owner().is_some() {
            return false;
        }
        self.effects.push(StatusEffect::Shield { owner });
        self.last_hit_by = Some(owner);
        self.stroke = owner.color();
        true
    }

    /// Remove the shield; false if there was none
    pub fn consume_shield(&mut self) -> bool {
        let before = self.effects.len();
        self.effects
            .retain(|e| !matches!(e, StatusEffect::Shield { .. }));
        self.effects.len() != before
    }

    /// Start (or refresh) the ice effect
    pub fn grant_ice(&mut self, now: f64, tuning: &Tuning) {
        let expires = now + tuning.ice_duration_ms;
        for effect in &mut self.effects {
            if let StatusEffect::Ice { expires_at, .. } = effect {
                *expires_at = expires;
                return;
            }
        }
        self.effects.push(StatusEffect::Ice {
            speed: tuning.ice_speed,
            expires_at: expires,
        });
        if self.is_free() && self.vel != Vec2::ZERO {
            self.vel = self.vel.normalize() * tuning.ice_speed;
        }
    }

    /// Drop expired effects and apply the rest
    pub fn apply_effects(&mut self, now: f64) {
        if self.effects.is_empty() {
            return;
        }
        self.effects.retain(|e| {
            let keep = !e.is_expired(now);
            if !keep {
                log::info!("Particle effect {:?} expired", e.kind());
            }
            keep
        });
        let effects = std::mem::take(&mut self.effects);
        for effect in &effects {
            effect.apply(EffectTarget::Particle(self), now);
        }
        self.effects = effects;
    }

    /// True if a barrier contact at `now` is new rather than a repeat of
    /// one within `window_ms`; records it if so
    pub fn accept_barrier_contact(&mut self, now: f64, window_ms: f64) -> bool {
        if let Some(last) = self.last_barrier_ms
            && now - last < window_ms
        {
            return false;
        }
        self.last_barrier_ms = Some(now);
        true
    }
}

impl Recycle for Particle {
    fn recycle(&mut self) {
        let mut effects = std::mem::take(&mut self.effects);
        effects.clear();
        *self = Self::default();
        self.effects = effects;
    }
}

/// Unit direction after a paddle strike.
///
/// `probe_offset` is the struck probe's offset from the paddle centre along
/// its length, `half_length` half the paddle's unscaled length.
pub fn deflection(
    player: Player,
    probe_offset: f32,
    half_length: f32,
    rotation_deg: f32,
    max_rotation_deg: f32,
) -> Vec2 {
    let from_offset = (probe_offset / half_length).clamp(-1.0, 1.0);
    let from_angle = -(rotation_deg / max_rotation_deg).clamp(-1.0, 1.0);
    let y = (0.5 * from_offset + 0.5 * from_angle).clamp(-0.95, 0.95);
    Vec2::new(player.side(), y).normalize()
}

/// Unit direction of a launch. `paddle_speed_ratio` is the paddle's vertical
/// velocity over its base speed; `coin` picks up or down for flat launches.
pub fn launch_direction(
    player: Player,
    rotation_deg: f32,
    max_rotation_deg: f32,
    paddle_speed_ratio: f32,
    coin: bool,
) -> Vec2 {
    let tilt = -(rotation_deg / max_rotation_deg).clamp(-1.0, 1.0);
    let mut y = tilt * 0.8 + paddle_speed_ratio * 0.5;
    if y.abs() < 0.2 {
        y = if coin { 0.3 } else { -0.3 };
    }
    Vec2::new(player.side(), y).normalize()
}

/// Where a particle in `slot` sits on a paddle: slot 0 level with the centre,
/// slots 1 and 2 stacked above and below
pub fn attached_position(paddle: &Paddle, slot: usize, radius: f32, tuning: &Tuning) -> Vec2 {
    let separation = radius * 2.0 + tuning.attach_stack_gap;
    let local_y = match slot {
        1 => -separation,
        2 => separation,
        _ => 0.0,
    };
    let local_x = (paddle.half_width() + radius + tuning.attach_gap) * paddle.owner.side();
    paddle.pos + rotate_deg(Vec2::new(local_x, local_y), paddle.visual_angle_deg())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn free_particle(tuning: &Tuning) -> Particle {
        let mut p = Particle::new(Vec2::new(960.0, 540.0), ParticleState::Free, 5, 0, tuning);
        p.vel = Vec2::new(-1000.0, 0.0);
        p
    }

    #[test]
    fn test_centre_hit_on_flat_paddle_goes_straight() {
        let dir = deflection(Player::One, 0.0, 100.0, 0.0, 55.0);
        assert_eq!(dir, Vec2::new(1.0, 0.0));
        let dir = deflection(Player::Two, 0.0, 100.0, 0.0, 55.0);
        assert_eq!(dir, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_deflection_clamps_vertical() {
        let dir = deflection(Player::One, 500.0, 100.0, -55.0, 55.0);
        let expected = Vec2::new(1.0, 0.95).normalize();
        assert!((dir - expected).length() < 1e-6);
    }

    #[test]
    fn test_tilted_paddle_sends_upward() {
        let dir = deflection(Player::One, 0.0, 100.0, 55.0, 55.0);
        assert!(dir.y < 0.0);
        assert!((dir.y / dir.x + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_flat_launch_gets_jitter() {
        let up = launch_direction(Player::One, 0.0, 55.0, 0.0, true);
        let down = launch_direction(Player::One, 0.0, 55.0, 0.0, false);
        assert!((up.y / up.x - 0.3).abs() < 1e-6);
        assert!((down.y / down.x + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_launch_blends_rotation_and_movement() {
        let dir = launch_direction(Player::Two, 55.0, 55.0, 1.0, true);
        // -0.8 from the tilt, +0.5 from moving down
        assert!((dir.y / -dir.x - -0.3).abs() < 1e-6);
    }

    #[test]
    fn test_charge_saturates_and_rescales() {
        let tuning = Tuning::default();
        let mut p = free_particle(&tuning);
        for _ in 0..10 {
            p.add_charge();
        }
        assert_eq!(p.charge, 5);
        p.normalize();
        assert!((p.radius - 30.0).abs() < 1e-4);
        assert!((p.vel.length() - 1500.0).abs() < 1e-2);
    }

    #[test]
    fn test_normalize_keeps_position() {
        let tuning = Tuning::default();
        let mut p = free_particle(&tuning);
        p.charge = 3;
        let before = p.pos;
        p.normalize();
        assert_eq!(p.pos, before);
    }

    #[test]
    fn test_hit_cooldown_per_player() {
        let tuning = Tuning::default();
        let mut p = free_particle(&tuning);
        assert!(p.can_accept_hit(Player::One, 0.0, 200.0));
        p.record_hit(Player::One, 1_000.0);
        assert!(!p.can_accept_hit(Player::One, 1_150.0, 200.0));
        assert!(p.can_accept_hit(Player::Two, 1_150.0, 200.0));
        assert!(p.can_accept_hit(Player::One, 1_200.0, 200.0));
    }

    #[test]
    fn test_shield_pins_last_hitter() {
        let tuning = Tuning::default();
        let mut p = free_particle(&tuning);
        assert!(p.grant_shield(Player::Two));
        assert!(!p.grant_shield(Player::One), "second shield is refused");
        p.set_last_hit(Player::One);
        assert_eq!(p.last_hit_by, Some(Player::Two));
        assert!(p.consume_shield());
        p.set_last_hit(Player::One);
        assert_eq!(p.last_hit_by, Some(Player::One));
    }

    #[test]
    fn test_ice_holds_speed_until_expiry() {
        let tuning = Tuning::default();
        let mut p = free_particle(&tuning);
        p.grant_ice(0.0, &tuning);
        p.normalize();
        p.apply_effects(100.0);
        assert!((p.vel.length() - 250.0).abs() < 1e-3);

        p.normalize();
        p.apply_effects(5_000.0);
        assert!(!p.has_effect(EffectKind::Ice));
        assert!((p.vel.length() - 1000.0).abs() < 1e-2);
    }

    #[test]
    fn test_barrier_contact_dedupe() {
        let tuning = Tuning::default();
        let mut p = free_particle(&tuning);
        assert!(p.accept_barrier_contact(0.0, 100.0));
        assert!(!p.accept_barrier_contact(50.0, 100.0));
        assert!(p.accept_barrier_contact(100.0, 100.0));
    }

    #[test]
    fn test_walls_reflect() {
        let tuning = Tuning::default();
        let mut p = free_particle(&tuning);
        p.pos.y = 25.0;
        p.vel = Vec2::new(0.0, -600.0);
        p.integrate(1.0 / 60.0, tuning.arena_height);
        assert!(p.vel.y > 0.0);
        assert_eq!(p.pos.y, p.radius);
    }

    #[test]
    fn test_attach_and_launch() {
        let tuning = Tuning::default();
        let paddle = Paddle::new(Player::One, &tuning);
        let mut rng = Pcg32::seed_from_u64(7);
        let mut p = free_particle(&tuning);
        p.charge = 4;

        p.attach(Player::One, 0);
        assert_eq!(p.vel, Vec2::ZERO);
        assert_eq!(p.charge, 0);
        assert_eq!(p.last_hit_by, Some(Player::One));

        p.follow_paddle(&paddle, &tuning);
        assert_eq!(p.pos, Vec2::new(100.0 + 10.0 + 20.0 + 30.0, 540.0));

        p.launch(&paddle, &tuning, &mut rng);
        assert!(p.is_free());
        assert!(p.vel.x > 0.0);
        assert!((p.vel.length() - 1000.0).abs() < 1e-2);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(level in 0u8..=5, angle in 0.0f32..6.28) {
            let tuning = Tuning::default();
            let mut p = free_particle(&tuning);
            p.vel = Vec2::from_angle(angle) * 1000.0;
            p.charge = level;
            p.normalize();
            let once = (p.radius, p.vel, p.pos);
            p.normalize();
            prop_assert!((p.radius - once.0).abs() < 1e-6);
            prop_assert!((p.vel - once.1).length() < 1e-2);
            prop_assert_eq!(p.pos, once.2);
        }

        #[test]
        fn prop_attached_within_paddle_extent(
            rot in -55.0f32..55.0,
            y in 100.0f32..980.0,
            slot in 0usize..3,
            right in any::<bool>(),
        ) {
            let tuning = Tuning::default();
            let owner = if right { Player::Two } else { Player::One };
            let mut paddle = Paddle::new(owner, &tuning);
            paddle.rotation_deg = rot;
            paddle.pos.y = y;

            let mut p = Particle::new(Vec2::ZERO, ParticleState::Free, 5, 0, &tuning);
            p.attach(owner, slot);
            p.follow_paddle(&paddle, &tuning);
            prop_assert_eq!(p.vel, Vec2::ZERO);
            prop_assert!((p.pos.y - y).abs() <= paddle.half_length());
        }
    }
}
