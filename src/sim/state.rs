//! Game state and core simulation types
//!
//! Everything a tick reads or writes lives in `GameState`. Mode rules, the
//! tick and the host collision callbacks all operate on it through
//! `&mut GameState`; there are no back-references between entities.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::arena::{Arena, Handle};
use super::blocks::BlockGrid;
use super::clock::SimClock;
use super::input::InputSystem;
use super::mode::{GameMode, ModeRules};
use super::paddle::Paddle;
use super::particle::{Particle, ParticleState};
use super::pickup::{Pickup, PickupKind};
use super::tether::TetherController;
use crate::consts::{EVENT_BACKLOG, MAX_ATTACHED, PARTICLE_CAPACITY, PICKUP_CAPACITY};
use crate::{Player, Tuning};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    Playing,
    /// Match ended; `winner` is `None` for a cooperative loss
    GameOver { winner: Option<Player> },
}

/// Why a particle left the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DestroyCause {
    /// Reached the cooperative charge cap
    Overcharged,
    OutOfBounds,
    Barrier,
    /// Claimed while the claimer's paddle was full
    ClaimOverflow,
}

/// Points per player (versus) and the shared team score (cooperative)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Scoreboard {
    pub points: [u32; 2],
    pub team: u32,
}

/// Things that happened during a tick, drained by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GameEvent {
    Served { player: Player, particles: usize },
    Launched { player: Player },
    ParticleHit { player: Player, charge: u8 },
    ParticleDestroyed { cause: DestroyCause },
    Claimed { player: Player, attached: usize, destroyed: usize },
    TetherToggled { player: Player, enabled: bool },
    TetherReparented { from: Player, to: Player },
    ScoreChanged { scores: Scoreboard },
    BarrierBounce { last_hit_by: Option<Player> },
    ShieldConsumed { owner: Player },
    BlockBroken { id: u32, row: u32 },
    RowCleared { row: u32 },
    PickupDropped { kind: PickupKind, pos: Vec2 },
    PickupCollected { player: Player, kind: PickupKind },
    PlayersSwapped { swapped: bool },
    GameOver { winner: Option<Player> },
}

/// Seeded RNG used for launch jitter and power-up drops
#[derive(Debug, Clone)]
pub struct RngState {
    pub seed: u64,
    rng: Pcg32,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub rng_state: RngState,
    pub mode: GameMode,
    pub tuning: Tuning,
    pub phase: GamePhase,
    pub clock: SimClock,
    pub input: InputSystem,
    pub paddles: [Paddle; 2],
    pub particles: Arena<Particle>,
    pub pickups: Arena<Pickup>,
    pub blocks: BlockGrid,
    pub tethers: TetherController,
    pub scores: Scoreboard,
    /// Player who serves when the field next empties
    pub server: Player,
    pub events: Vec<GameEvent>,
    pending_serve: Option<Player>,
    next_spawn_seq: u64,
}

impl GameState {
    /// Create a new match and serve the opening particles
    pub fn new(seed: u64, mode: GameMode, tuning: Tuning) -> Self {
        let mut state = Self {
            rng_state: RngState::new(seed),
            mode,
            phase: GamePhase::Playing,
            clock: SimClock::default(),
            input: InputSystem::new(tuning.p1_keys, tuning.p2_keys),
            paddles: [
                Paddle::new(Player::One, &tuning),
                Paddle::new(Player::Two, &tuning),
            ],
            particles: Arena::with_capacity(PARTICLE_CAPACITY),
            pickups: Arena::with_capacity(PICKUP_CAPACITY),
            blocks: BlockGrid::new(&tuning),
            tethers: TetherController::default(),
            scores: Scoreboard::default(),
            server: Player::One,
            events: Vec::with_capacity(32),
            pending_serve: None,
            next_spawn_seq: 0,
            tuning,
        };
        log::info!("New {:?} match (seed {})", mode, seed);
        (state.rules().reset_serve)(&mut state, Player::One);
        state
    }

    #[inline]
    pub fn rules(&self) -> &'static ModeRules {
        self.mode.rules()
    }

    /// Simulation time in ms
    #[inline]
    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::GameOver { .. })
    }

    #[inline]
    pub fn paddle(&self, player: Player) -> &Paddle {
        &self.paddles[player.index()]
    }

    #[inline]
    pub fn paddle_mut(&mut self, player: Player) -> &mut Paddle {
        &mut self.paddles[player.index()]
    }

    /// Logical paddle rotations, indexed by player
    pub fn rotations(&self) -> [f32; 2] {
        [self.paddles[0].rotation_deg, self.paddles[1].rotation_deg]
    }

    pub fn live_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn attached_count(&self, player: Player) -> usize {
        self.particles
            .iter()
            .filter(|(_, p)| p.attachment().is_some_and(|(owner, _)| owner == player))
            .count()
    }

    /// Handle of the particle in a paddle slot
    pub fn attached_in_slot(&self, player: Player, slot: usize) -> Option<Handle> {
        self.particles
            .iter()
            .find(|(_, p)| p.attachment() == Some((player, slot)))
            .map(|(h, _)| h)
    }

    /// Take a particle from the pool. `None` when the pool is exhausted or
    /// the match is over.
    pub fn spawn_particle(&mut self, pos: Vec2, state: ParticleState) -> Option<Handle> {
        if self.is_over() {
            return None;
        }
        let max_charge = self.rules().max_charge;
        let seq = self.next_spawn_seq;
        let Some((handle, slot)) = self.particles.spawn() else {
            log::warn!("Particle pool exhausted, spawn dropped");
            return None;
        };
        slot.respawn(pos, state, max_charge, seq, &self.tuning);
        self.next_spawn_seq += 1;
        Some(handle)
    }

    /// Spawn a particle straight onto a paddle's next free slot
    pub fn spawn_attached(&mut self, player: Player) -> Option<Handle> {
        if self.attached_count(player) >= MAX_ATTACHED {
            return None;
        }
        let pos = self.paddle(player).pos;
        let handle = self.spawn_particle(pos, ParticleState::Free)?;
        self.attach_to(handle, player);
        Some(handle)
    }

    /// Put a particle on a paddle's next free slot; false if the paddle is
    /// full or the handle is stale
    pub fn attach_to(&mut self, handle: Handle, player: Player) -> bool {
        let slot = self.attached_count(player);
        if slot >= MAX_ATTACHED {
            return false;
        }
        let rotations = self.rotations();
        let Some(particle) = self.particles.get_mut(handle) else {
            return false;
        };
        particle.attach(player, slot);
        particle.follow_paddle(&self.paddles[player.index()], &self.tuning);
        self.tethers.sync(particle, rotations);
        true
    }

    /// Return a particle to the pool. Its tether and effects go with it.
    pub fn destroy_particle(&mut self, handle: Handle, cause: DestroyCause) -> bool {
        let owner = self
            .particles
            .get(handle)
            .and_then(|p| p.attachment())
            .map(|(owner, _)| owner);
        if !self.particles.release(handle) {
            log::debug!("Destroy of stale particle handle ignored");
            return false;
        }
        if let Some(owner) = owner {
            self.compact_slots(owner);
        }
        self.events.push(GameEvent::ParticleDestroyed { cause });
        true
    }

    /// Renumber a paddle's attached particles so slots stay dense
    pub fn compact_slots(&mut self, player: Player) {
        let mut next = 0;
        for slot in 0..MAX_ATTACHED {
            let Some(handle) = self.attached_in_slot(player, slot) else {
                continue;
            };
            if slot != next
                && let Some(p) = self.particles.get_mut(handle)
            {
                p.state = ParticleState::Attached {
                    owner: player,
                    slot: next,
                };
            }
            next += 1;
        }
    }

    /// Drop a power-up at `pos`
    pub fn spawn_pickup(&mut self, kind: PickupKind, pos: Vec2) -> Option<Handle> {
        let now = self.now();
        let Some((handle, slot)) = self.pickups.spawn() else {
            log::warn!("Pickup pool exhausted, {:?} dropped", kind);
            return None;
        };
        *slot = Pickup::new(kind, pos, now, &self.tuning);
        self.events.push(GameEvent::PickupDropped { kind, pos });
        log::info!("{:?} power-up dropped", kind);
        Some(handle)
    }

    pub fn clear_particles(&mut self) {
        self.particles.clear();
    }

    /// Ask for a serve reset once the current collision phase is over
    pub fn request_serve(&mut self, player: Player) {
        self.server = player;
        self.pending_serve = Some(player);
    }

    pub(crate) fn take_pending_serve(&mut self) -> Option<Player> {
        self.pending_serve.take()
    }

    pub fn award_point(&mut self, player: Player) {
        self.scores.points[player.index()] += 1;
        self.score_changed();
    }

    /// Remove a point, never below zero
    pub fn take_point(&mut self, player: Player) {
        let points = &mut self.scores.points[player.index()];
        *points = points.saturating_sub(1);
        self.score_changed();
    }

    pub fn add_team_score(&mut self, amount: u32) {
        self.scores.team += amount;
        self.score_changed();
    }

    fn score_changed(&mut self) {
        log::debug!("Score {:?}", self.scores);
        self.events.push(GameEvent::ScoreChanged {
            scores: self.scores,
        });
    }

    /// End the match and clear the field
    pub fn finish(&mut self, winner: Option<Player>) {
        if self.is_over() {
            return;
        }
        self.phase = GamePhase::GameOver { winner };
        self.particles.clear();
        self.pickups.clear();
        self.pending_serve = None;
        self.events.push(GameEvent::GameOver { winner });
        log::info!("Game over: winner {:?}, scores {:?}", winner, self.scores);
    }

    /// Hand the accumulated events to the host
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }

    /// Drop the oldest events once a host stops draining
    pub(crate) fn trim_event_backlog(&mut self) {
        let excess = self.events.len().saturating_sub(EVENT_BACKLOG);
        if excess > 0 {
            log::warn!("Event backlog full, dropping {} oldest events", excess);
            self.events.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_match_serves_player_one() {
        let state = GameState::new(1, GameMode::Versus, Tuning::default());
        assert_eq!(state.live_particles(), 1);
        assert_eq!(state.attached_count(Player::One), 1);
        assert_eq!(state.attached_count(Player::Two), 0);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_paddle_holds_at_most_three() {
        let mut state = GameState::new(1, GameMode::Practice, Tuning::default());
        assert!(state.spawn_attached(Player::One).is_some());
        assert!(state.spawn_attached(Player::One).is_some());
        assert!(state.spawn_attached(Player::One).is_none());
        assert_eq!(state.attached_count(Player::One), 3);
    }

    #[test]
    fn test_destroy_compacts_slots() {
        let mut state = GameState::new(1, GameMode::Practice, Tuning::default());
        let second = state.spawn_attached(Player::One).unwrap();
        let third = state.spawn_attached(Player::One).unwrap();
        let first = state.attached_in_slot(Player::One, 0).unwrap();

        assert!(state.destroy_particle(first, DestroyCause::OutOfBounds));
        assert!(!state.destroy_particle(first, DestroyCause::OutOfBounds));
        assert_eq!(
            state.particles.get(second).unwrap().attachment(),
            Some((Player::One, 0))
        );
        assert_eq!(
            state.particles.get(third).unwrap().attachment(),
            Some((Player::One, 1))
        );
    }

    #[test]
    fn test_points_floor_at_zero() {
        let mut state = GameState::new(1, GameMode::Versus, Tuning::default());
        state.take_point(Player::Two);
        assert_eq!(state.scores.points, [0, 0]);
        state.award_point(Player::Two);
        state.take_point(Player::Two);
        assert_eq!(state.scores.points, [0, 0]);
    }

    #[test]
    fn test_finish_clears_and_blocks_spawns() {
        let mut state = GameState::new(1, GameMode::Cooperative, Tuning::default());
        assert_eq!(state.live_particles(), 6);
        state.finish(None);
        assert!(state.is_over());
        assert_eq!(state.live_particles(), 0);
        assert!(state.spawn_particle(Vec2::ZERO, ParticleState::Free).is_none());
        assert_eq!(
            state.drain_events().last(),
            Some(GameEvent::GameOver { winner: None })
        );
    }

    #[test]
    fn test_spawn_order_is_recorded() {
        let mut state = GameState::new(1, GameMode::Practice, Tuning::default());
        let a = state.spawn_particle(Vec2::ZERO, ParticleState::Claimable).unwrap();
        let b = state.spawn_particle(Vec2::ZERO, ParticleState::Claimable).unwrap();
        let seq = |h| state.particles.get(h).unwrap().spawn_seq;
        assert!(seq(a) < seq(b));
    }

    #[test]
    fn test_respawned_particle_starts_without_effects() {
        let mut state = GameState::new(1, GameMode::Practice, Tuning::default());
        state.clear_particles();
        let h = state.spawn_particle(Vec2::ZERO, ParticleState::Free).unwrap();
        let now = state.clock.now_ms();
        state.particles.get_mut(h).unwrap().grant_ice(now, &state.tuning);
        assert!(state.destroy_particle(h, DestroyCause::OutOfBounds));

        let again = state.spawn_particle(Vec2::ZERO, ParticleState::Free).unwrap();
        let p = state.particles.get(again).unwrap();
        assert!(p.effects.is_empty());
        assert!(p.effects.capacity() >= 1, "effect buffer reused");
    }

    #[test]
    fn test_event_backlog_is_bounded() {
        let mut state = GameState::new(1, GameMode::Practice, Tuning::default());
        for _ in 0..EVENT_BACKLOG + 100 {
            state.events.push(GameEvent::PlayersSwapped { swapped: false });
        }
        state.trim_event_backlog();
        assert_eq!(state.events.len(), EVENT_BACKLOG);
        state.trim_event_backlog();
        assert_eq!(state.events.len(), EVENT_BACKLOG);
    }
}
