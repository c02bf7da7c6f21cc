//! Data-driven game balance
//!
//! Every gameplay constant lives here so a host can override balance from a
//! JSON document without touching the simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::input::KeyBindings;

/// Errors produced while loading tuning overrides
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("tuning field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },

    #[error("paddle needs at least 2 collision probes, got {0}")]
    InvalidProbeCount(usize),
}

/// Game balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,
    /// Distance past an arena edge at which a particle counts as gone
    pub bounds_margin: f32,

    // === Paddle ===
    pub paddle_width: f32,
    pub paddle_length: f32,
    /// Horizontal distance of each paddle from its side wall
    pub paddle_inset: f32,
    /// Vertical speed (px/s)
    pub paddle_speed: f32,
    /// Collision probes along the paddle
    pub probe_count: usize,
    /// Rotation limit (degrees)
    pub max_rotation_deg: f32,
    /// Below this rotation the paddle drifts back to neutral when released
    pub dead_zone_deg: f32,
    /// Degrees per tick while a rotate action is held
    pub rotation_speed_deg: f32,
    pub return_speed: f32,
    /// Rotation snaps to 0 below this (degrees)
    pub rotation_snap_deg: f32,

    // === Particle ===
    pub particle_radius: f32,
    /// Base particle speed (px/s), scaled by the charge table
    pub particle_speed: f32,
    /// Gap between paddle face and an attached particle
    pub attach_gap: f32,
    /// Extra spacing between stacked attached particles
    pub attach_stack_gap: f32,
    pub hit_cooldown_ms: f64,
    pub barrier_dedupe_ms: f64,
    /// Upward speed floor after a barrier bounce
    pub barrier_bounce_speed: f32,
    /// Distance from the bottom edge to the barrier centre line
    pub barrier_offset: f32,
    pub barrier_thickness: f32,
    /// Square bumpers in the bottom corners, either side of the barrier
    pub corner_block_size: f32,
    /// Distance from the bottom edge to the bumper centres
    pub corner_block_offset: f32,

    // === Tether ===
    /// Exponential smoothing rate toward target curvature (1/s)
    pub tether_smoothing: f32,
    /// Tension lost per second
    pub tether_tension_decay: f32,
    /// Rotation change (degrees) that recharges tension
    pub tether_recharge_threshold_deg: f32,
    pub tether_recharge_factor: f32,
    pub tether_max_vertical_speed: f32,

    // === Blocks & power-ups ===
    pub block_rows: u32,
    pub block_cols: u32,
    pub block_width: f32,
    pub block_height: f32,
    pub block_spacing: f32,
    pub block_top: f32,
    /// Chance (0-1) that a broken block drops a power-up
    pub powerup_drop_chance: f32,
    pub powerup_fall_speed: f32,
    pub powerup_radius: f32,
    /// Delay before a dropped power-up can be collected
    pub powerup_activation_ms: f64,
    pub ice_activation_ms: f64,

    // === Status effects ===
    /// Speed an iced particle is held at
    pub ice_speed: f32,
    pub ice_duration_ms: f64,
    /// Paddle speed multiplier while slowed
    pub snail_factor: f32,
    pub snail_duration_ms: f64,
    /// Paddle length multiplier at full growth
    pub grow_scale: f32,
    pub grow_duration_ms: f64,
    /// Ease in/out time of the growth
    pub grow_tween_ms: f64,

    // === Controls ===
    pub p1_keys: KeyBindings,
    pub p2_keys: KeyBindings,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            arena_width: 1920.0,
            arena_height: 1080.0,
            bounds_margin: 50.0,

            paddle_width: 20.0,
            paddle_length: 200.0,
            paddle_inset: 100.0,
            paddle_speed: 1200.0,
            probe_count: 20,
            max_rotation_deg: 55.0,
            dead_zone_deg: 15.0,
            rotation_speed_deg: 2.5,
            return_speed: 0.8,
            rotation_snap_deg: 0.1,

            particle_radius: 20.0,
            particle_speed: 1000.0,
            attach_gap: 30.0,
            attach_stack_gap: 30.0,
            hit_cooldown_ms: 200.0,
            barrier_dedupe_ms: 100.0,
            barrier_bounce_speed: 600.0,
            barrier_offset: 42.0,
            barrier_thickness: 20.0,
            corner_block_size: 120.0,
            corner_block_offset: 40.0,

            tether_smoothing: 10.0,
            tether_tension_decay: 1.0,
            tether_recharge_threshold_deg: 0.1,
            tether_recharge_factor: 0.5,
            tether_max_vertical_speed: 1200.0,

            block_rows: 6,
            block_cols: 6,
            block_width: 100.0,
            block_height: 30.0,
            block_spacing: 5.0,
            block_top: 150.0,
            powerup_drop_chance: 0.2,
            powerup_fall_speed: 100.0,
            powerup_radius: 24.0,
            powerup_activation_ms: 2000.0,
            ice_activation_ms: 300.0,

            ice_speed: 250.0,
            ice_duration_ms: 5000.0,
            snail_factor: 0.5,
            snail_duration_ms: 5000.0,
            grow_scale: 1.5,
            grow_duration_ms: 12000.0,
            grow_tween_ms: 2000.0,

            p1_keys: KeyBindings::player_one(),
            p2_keys: KeyBindings::player_two(),
        }
    }
}

impl Tuning {
    /// Parse overrides from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!("Loaded tuning overrides");
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot work with
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.probe_count < 2 {
            return Err(TuningError::InvalidProbeCount(self.probe_count));
        }

        let positive = [
            ("arena_width", self.arena_width),
            ("arena_height", self.arena_height),
            ("paddle_width", self.paddle_width),
            ("paddle_length", self.paddle_length),
            ("paddle_speed", self.paddle_speed),
            ("max_rotation_deg", self.max_rotation_deg),
            ("particle_radius", self.particle_radius),
            ("particle_speed", self.particle_speed),
        ];
        for (field, value) in positive {
            if value <= 0.0 || !value.is_finite() {
                return Err(TuningError::OutOfRange { field, value });
            }
        }

        if self.paddle_length <= self.paddle_width {
            return Err(TuningError::OutOfRange {
                field: "paddle_length",
                value: self.paddle_length,
            });
        }
        if self.grow_scale < 1.0 {
            return Err(TuningError::OutOfRange {
                field: "grow_scale",
                value: self.grow_scale,
            });
        }
        if !(0.0..=1.0).contains(&self.powerup_drop_chance) {
            return Err(TuningError::OutOfRange {
                field: "powerup_drop_chance",
                value: self.powerup_drop_chance,
            });
        }
        if self.dead_zone_deg < 0.0 || self.dead_zone_deg > self.max_rotation_deg {
            return Err(TuningError::OutOfRange {
                field: "dead_zone_deg",
                value: self.dead_zone_deg,
            });
        }
        Ok(())
    }

    /// Half of the paddle's unscaled length
    #[inline]
    pub fn paddle_half_length(&self) -> f32 {
        self.paddle_length / 2.0
    }

    /// Probes a fully grown paddle carries: enough to cover the grown
    /// length at 1.8 radii spacing, never fewer than the base count
    #[inline]
    pub fn grown_probe_count(&self) -> usize {
        let spacing = self.probe_radius() * 1.8;
        let needed = (self.paddle_length * self.grow_scale / spacing).ceil() as usize;
        needed.max(self.probe_count)
    }

    /// Probe radius (half the paddle width)
    #[inline]
    pub fn probe_radius(&self) -> f32 {
        self.paddle_width / 2.0
    }
}
