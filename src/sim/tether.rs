//! Tethers: player-controlled curving of particles they last struck
//!
//! While a player's tether is switched on, every particle they last struck
//! carries a `TetherBinding`. Rotating the owner's paddle away from the
//! rotation it had when the binding was made bends the particle's vertical
//! velocity. Tension fades over time and is topped up by further rotation.

use super::arena::Arena;
use super::particle::{Particle, ParticleState};
use super::state::GameEvent;
use crate::{Player, Tuning};

/// Curvature direction per player (both inverted)
pub const CURVE_SIGN: [f32; 2] = [-1.0, -1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TetherBinding {
    pub owner: Player,
    pub color: u32,
    /// Owner paddle rotation the curvature is measured from
    pub rotation_at_bind: f32,
    /// 0..=1
    pub tension: f32,
    /// Smoothed, -1..=1
    pub curvature: f32,
    last_rotation: f32,
    /// False until the particle has spent one tick free after a launch
    settled: bool,
}

impl TetherBinding {
    pub fn new(owner: Player, rotation: f32, settled: bool) -> Self {
        Self {
            owner,
            color: owner.color(),
            rotation_at_bind: rotation,
            tension: 1.0,
            curvature: 0.0,
            last_rotation: rotation,
            settled,
        }
    }

    /// Transfer to a new owner, measured from their current rotation
    pub fn rebind(&mut self, owner: Player, rotation: f32) {
        let settled = self.settled;
        *self = Self::new(owner, rotation, settled);
    }

    /// Attached particles keep a straight, fully tensioned tether that
    /// follows the paddle
    fn hold(&mut self, rotation: f32) {
        self.rotation_at_bind = rotation;
        self.last_rotation = rotation;
        self.tension = 1.0;
        self.curvature = 0.0;
        self.settled = false;
    }

    /// Advance tension and curvature. Returns the signed strength
    /// (curvature x tension) to apply this tick, if any.
    fn step(&mut self, rotation: f32, tuning: &Tuning, dt: f32) -> Option<f32> {
        if !self.settled {
            // Just launched: measure from here, no pull yet
            self.rotation_at_bind = rotation;
            self.last_rotation = rotation;
            self.settled = true;
            return None;
        }

        let delta = rotation - self.rotation_at_bind;
        let sign = CURVE_SIGN[self.owner.index()];
        let target = (delta / tuning.max_rotation_deg).clamp(-1.0, 1.0) * sign;

        let change = (rotation - self.last_rotation).abs();
        if change > tuning.tether_recharge_threshold_deg {
            self.tension = (self.tension + change * tuning.tether_recharge_factor).min(1.0);
        }
        self.last_rotation = rotation;
        self.tension = (self.tension - tuning.tether_tension_decay * dt).max(0.0);

        let smooth = (dt * tuning.tether_smoothing).min(1.0);
        self.curvature += (target - self.curvature) * smooth;

        (self.tension > 0.0).then_some(self.curvature * self.tension)
    }
}

/// Per-player tether switches
#[derive(Debug, Clone, Default)]
pub struct TetherController {
    enabled: [bool; 2],
}

impl TetherController {
    pub fn is_enabled(&self, player: Player) -> bool {
        self.enabled[player.index()]
    }

    /// Flip a player's tether. Switching on binds every particle they
    /// already struck; switching off drops their bindings.
    pub fn toggle(
        &mut self,
        player: Player,
        particles: &mut Arena<Particle>,
        rotations: [f32; 2],
    ) -> bool {
        let on = !self.enabled[player.index()];
        self.enabled[player.index()] = on;

        let mut affected = 0;
        for (_, particle) in particles.iter_mut() {
            if on {
                if particle.last_hit_by == Some(player) && particle.tether.is_none() {
                    self.sync(particle, rotations);
                    affected += particle.tether.is_some() as usize;
                }
            } else if particle.tether.is_some_and(|t| t.owner == player) {
                particle.tether = None;
                affected += 1;
            }
        }
        log::info!(
            "{:?} tether {} ({} particles)",
            player,
            if on { "on" } else { "off" },
            affected
        );
        on
    }

    /// Make a particle's binding agree with its last hitter. Returns the
    /// (from, to) owners when the binding was transferred.
    pub fn sync(&self, particle: &mut Particle, rotations: [f32; 2]) -> Option<(Player, Player)> {
        let owner = match (particle.last_hit_by, particle.state) {
            (_, ParticleState::Claimable) | (None, _) => {
                particle.tether = None;
                return None;
            }
            (Some(owner), _) => owner,
        };
        if !self.enabled[owner.index()] {
            particle.tether = None;
            return None;
        }

        let rotation = rotations[owner.index()];
        let settled = particle.is_free();
        let Some(binding) = particle.tether.as_mut() else {
            particle.tether = Some(TetherBinding::new(owner, rotation, settled));
            return None;
        };
        if binding.owner == owner {
            return None;
        }
        let from = binding.owner;
        binding.rebind(owner, rotation);
        Some((from, owner))
    }

    /// Per-tick tether pass over every particle
    pub fn update(
        &self,
        particles: &mut Arena<Particle>,
        rotations: [f32; 2],
        tuning: &Tuning,
        dt: f32,
        events: &mut Vec<GameEvent>,
    ) {
        for (_, particle) in particles.iter_mut() {
            if let Some((from, to)) = self.sync(particle, rotations) {
                log::debug!("Tether re-parented {:?} -> {:?}", from, to);
                events.push(GameEvent::TetherReparented { from, to });
            }

            let state = particle.state;
            let influence = particle.charge_state().curve_influence;
            let Some(binding) = particle.tether.as_mut() else {
                continue;
            };
            let rotation = rotations[binding.owner.index()];

            match state {
                ParticleState::Attached { .. } => binding.hold(rotation),
                ParticleState::Free => {
                    if let Some(strength) = binding.step(rotation, tuning, dt) {
                        let max = tuning.tether_max_vertical_speed;
                        let vy = particle.vel.y + strength * influence * dt;
                        particle.vel.y = vy.clamp(-max, max);
                    }
                }
                ParticleState::Claimable => {}
            }
        }
    }
}
