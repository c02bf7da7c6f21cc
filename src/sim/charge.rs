//! Discrete charge levels
//!
//! Each paddle hit raises a particle's charge by one (saturating at the mode's
//! cap). Every tick the particle re-derives radius, speed, color and tether
//! influence from this table, so the values never drift.

/// Properties of one charge level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeState {
    /// Fill color
    pub color: u32,
    /// Radius multiplier over the base radius
    pub scale: f32,
    /// Speed multiplier over the base speed
    pub speed_multiplier: f32,
    /// Vertical acceleration (px/s²) a fully-curved, fully-tensioned tether applies
    pub curve_influence: f32,
}

/// Charge table, level 0 (uncharged) to level 8
pub const CHARGE_TABLE: [ChargeState; 9] = [
    ChargeState { color: 0x000000, scale: 1.0, speed_multiplier: 1.0, curve_influence: 400.0 },
    ChargeState { color: 0xABA244, scale: 1.1, speed_multiplier: 1.1, curve_influence: 800.0 },
    ChargeState { color: 0x71B359, scale: 1.2, speed_multiplier: 1.2, curve_influence: 1200.0 },
    ChargeState { color: 0x77B8B0, scale: 1.3, speed_multiplier: 1.3, curve_influence: 1600.0 },
    ChargeState { color: 0xA9B2CF, scale: 1.4, speed_multiplier: 1.4, curve_influence: 1800.0 },
    ChargeState { color: 0xFFFFFF, scale: 1.5, speed_multiplier: 1.5, curve_influence: 2000.0 },
    ChargeState { color: 0xE8BEBE, scale: 1.6, speed_multiplier: 1.6, curve_influence: 2200.0 },
    ChargeState { color: 0xD95F5F, scale: 1.7, speed_multiplier: 1.7, curve_influence: 2400.0 },
    ChargeState { color: 0xFF0000, scale: 1.8, speed_multiplier: 1.8, curve_influence: 2600.0 },
];

/// Look up a level; levels past the table hold the last entry
#[inline]
pub fn charge_state(level: u8) -> &'static ChargeState {
    let idx = (level as usize).min(CHARGE_TABLE.len() - 1);
    &CHARGE_TABLE[idx]
}

/// Saturating increment toward `max`; returns the new level
#[inline]
pub fn saturating_charge(level: u8, max: u8) -> u8 {
    if level < max { level + 1 } else { max }
}
