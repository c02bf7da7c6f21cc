//! Falling power-up pickups

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arena::Recycle;
use crate::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PickupKind {
    #[default]
    Shield,
    Ice,
    Snail,
    PaddleGrow,
}

impl PickupKind {
    pub const ALL: [PickupKind; 4] = [
        PickupKind::Shield,
        PickupKind::Ice,
        PickupKind::Snail,
        PickupKind::PaddleGrow,
    ];

    /// Time after dropping before the pickup can be collected
    pub fn activation_delay_ms(self, tuning: &Tuning) -> f64 {
        match self {
            PickupKind::Ice => tuning.ice_activation_ms,
            _ => tuning.powerup_activation_ms,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pickup {
    pub kind: PickupKind,
    pub pos: Vec2,
    pub radius: f32,
    pub spawned_at: f64,
}

impl Pickup {
    pub fn new(kind: PickupKind, pos: Vec2, now: f64, tuning: &Tuning) -> Self {
        Self {
            kind,
            pos,
            radius: tuning.powerup_radius,
            spawned_at: now,
        }
    }

    pub fn is_active(&self, now: f64, tuning: &Tuning) -> bool {
        now - self.spawned_at >= self.kind.activation_delay_ms(tuning)
    }

    /// Fall one tick. Returns false once the pickup has left the bottom of
    /// the arena.
    pub fn fall(&mut self, dt: f32, tuning: &Tuning) -> bool {
        self.pos.y += tuning.powerup_fall_speed * dt;
        self.pos.y <= tuning.arena_height + tuning.bounds_margin
    }
}

impl Recycle for Pickup {}

/// Roll whether a broken block drops something, and what
pub fn roll_drop(rng: &mut impl Rng, chance: f32) -> Option<PickupKind> {
    if !rng.random_bool(f64::from(chance.clamp(0.0, 1.0))) {
        return None;
    }
    let i = rng.random_range(0..PickupKind::ALL.len());
    Some(PickupKind::ALL[i])
}
