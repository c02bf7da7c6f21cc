//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (pool slot order, spawn order for claims)
//! - No rendering, audio or platform dependencies

pub mod arena;
pub mod blocks;
pub mod charge;
pub mod claim;
pub mod clock;
pub mod collision;
pub mod effects;
pub mod input;
pub mod mode;
pub mod paddle;
pub mod particle;
pub mod pickup;
pub mod state;
pub mod tether;
pub mod tick;

pub use arena::{Arena, Handle};
pub use blocks::{Block, BlockGrid};
pub use charge::{CHARGE_TABLE, ChargeState, charge_state};
pub use claim::{ClaimOutcome, claim, handle_claim_attempt};
pub use clock::SimClock;
pub use collision::{Contacts, ProbeContact};
pub use effects::{EffectKind, StatusEffect};
pub use input::{Action, GamepadState, InputFrame, InputSystem, KeyBindings, KeyCode};
pub use mode::{GameMode, ModeRules};
pub use paddle::{CollisionProbe, Paddle};
pub use particle::{Particle, ParticleState, deflection};
pub use pickup::{Pickup, PickupKind};
pub use state::{DestroyCause, GameEvent, GamePhase, GameState, Scoreboard};
pub use tether::{TetherBinding, TetherController};
pub use tick::{
    launch, on_barrier_hit, on_block_hit, on_corner_hit, on_out_of_bounds,
    on_pickup_overlap, on_probe_particle_overlap, tick, tick_post_collision,
    tick_pre_collision, tick_with_collisions,
};
