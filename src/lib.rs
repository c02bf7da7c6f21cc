//! Tether Volley - simulation core for a two-player rotating-paddle volley game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (input, paddles, particles, tethers, claims)
//! - `tuning`: Data-driven game balance and key bindings

pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matching the browser frame rate the game was tuned at)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Maximum particles attached to one paddle (slots 0, 1, 2)
    pub const MAX_ATTACHED: usize = 3;

    /// Pool capacities
    pub const PARTICLE_CAPACITY: usize = 64;
    pub const PICKUP_CAPACITY: usize = 32;

    /// Undrained events kept before the oldest are dropped
    pub const EVENT_BACKLOG: usize = 4096;

    /// Player colors (paddle, stroke and tether)
    pub const P1_COLOR: u32 = 0x0000FF;
    pub const P2_COLOR: u32 = 0xFF0000;
    /// Stroke of a neutral particle
    pub const NEUTRAL_STROKE: u32 = 0xFFFFFF;
    /// Stroke of a claimable particle
    pub const CLAIMABLE_STROKE: u32 = 0xFFFF00;
}

/// One of the two logical players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    /// Left side of the court
    One,
    /// Right side of the court
    Two,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// +1 for the left-side player, -1 for the right-side player
    #[inline]
    pub fn side(self) -> f32 {
        match self {
            Player::One => 1.0,
            Player::Two => -1.0,
        }
    }

    #[inline]
    pub fn is_left(self) -> bool {
        self == Player::One
    }

    pub fn color(self) -> u32 {
        match self {
            Player::One => consts::P1_COLOR,
            Player::Two => consts::P2_COLOR,
        }
    }
}

/// Rotate a vector by an angle in degrees
#[inline]
pub fn rotate_deg(v: Vec2, deg: f32) -> Vec2 {
    Vec2::from_angle(deg.to_radians()).rotate(v)
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Sine ease-in-out over t in [0, 1]
#[inline]
pub fn ease_in_out_sine(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    -((std::f32::consts::PI * t).cos() - 1.0) / 2.0
}
