//! Timed status effects granted by power-ups
//!
//! Effects are plain tagged data held in a list on their target. Every tick
//! the owner walks the list, calls `apply` and drops whatever has expired;
//! nothing patches a particle's or paddle's behaviour in place.

use serde::{Deserialize, Serialize};

use super::paddle::Paddle;
use super::particle::{Particle, ParticleState};
use crate::{Player, ease_in_out_sine, lerp};

/// Effect tag, for events and lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Shield,
    Ice,
    Snail,
    PaddleGrow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEffect {
    /// Particle keeps `owner` as its last hitter until the shield is consumed
    Shield { owner: Player },
    /// Particle speed held constant
    Ice { speed: f32, expires_at: f64 },
    /// Paddle speed scaled down
    Snail { factor: f32, expires_at: f64 },
    /// Paddle length eased from `from` to `to`, held, then eased back to 1
    PaddleGrow {
        from: f32,
        to: f32,
        started_at: f64,
        expires_at: f64,
        tween_ms: f64,
        retracting: bool,
    },
}

/// What an effect acts on
pub enum EffectTarget<'a> {
    Particle(&'a mut Particle),
    Paddle(&'a mut Paddle),
}

impl StatusEffect {
    pub fn kind(&self) -> EffectKind {
        match self {
            StatusEffect::Shield { .. } => EffectKind::Shield,
            StatusEffect::Ice { .. } => EffectKind::Ice,
            StatusEffect::Snail { .. } => EffectKind::Snail,
            StatusEffect::PaddleGrow { .. } => EffectKind::PaddleGrow,
        }
    }

    /// Timestamp (ms) after which the effect is dropped; `None` = until consumed
    pub fn expires_at(&self) -> Option<f64> {
        match *self {
            StatusEffect::Shield { .. } => None,
            StatusEffect::Ice { expires_at, .. } | StatusEffect::Snail { expires_at, .. } => {
                Some(expires_at)
            }
            // Fully gone once the shrink tween has finished
            StatusEffect::PaddleGrow {
                expires_at,
                tween_ms,
                ..
            } => Some(expires_at + tween_ms),
        }
    }

    pub fn is_expired(&self, now: f64) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }

    /// Length multiplier of a growth effect at `now`
    pub fn grow_scale_at(&self, now: f64) -> Option<f32> {
        let StatusEffect::PaddleGrow {
            from,
            to,
            started_at,
            expires_at,
            tween_ms,
            ..
        } = *self
        else {
            return None;
        };
        let scale = if now < expires_at {
            let t = ((now - started_at) / tween_ms) as f32;
            lerp(from, to, ease_in_out_sine(t))
        } else {
            let t = ((now - expires_at) / tween_ms) as f32;
            lerp(to, 1.0, ease_in_out_sine(t))
        };
        Some(scale)
    }

    /// Apply this tick's contribution to the target. Effects that do not
    /// concern the target kind are ignored.
    pub fn apply(&self, target: EffectTarget<'_>, now: f64) {
        match (self, target) {
            (StatusEffect::Shield { owner }, EffectTarget::Particle(p)) => {
                p.last_hit_by = Some(*owner);
                p.stroke = owner.color();
            }
            (StatusEffect::Ice { speed, .. }, EffectTarget::Particle(p)) => {
                if p.state == ParticleState::Free && p.vel != glam::Vec2::ZERO {
                    p.vel = p.vel.normalize() * *speed;
                }
            }
            (StatusEffect::Snail { factor, .. }, EffectTarget::Paddle(paddle)) => {
                paddle.speed *= *factor;
            }
            (StatusEffect::PaddleGrow { .. }, EffectTarget::Paddle(paddle)) => {
                if let Some(scale) = self.grow_scale_at(now) {
                    paddle.length_scale = scale;
                }
            }
            _ => {}
        }
    }
}
