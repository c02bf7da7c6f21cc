//! Game modes as tables of rule hooks
//!
//! Each mode is a `ModeRules` value of plain function pointers. The tick and
//! the collision callbacks look the table up through `GameState::rules()`
//! and call the hook; no mode state lives outside `GameState`.

use serde::{Deserialize, Serialize};

use super::arena::Handle;
use super::state::{DestroyCause, GameEvent, GameState};
use crate::Player;
use crate::consts::MAX_ATTACHED;

/// Points needed to win a versus match
pub const POINTS_TO_WIN: u32 = 5;
/// Charge at which a particle bounces off the barrier instead of being lost
pub const BARRIER_CHARGE: u8 = 5;

/// Cooperative scoring
pub const COOP_HIT_SCORE: u32 = 100;
pub const COOP_BLOCK_SCORE: u32 = 50;
pub const COOP_PICKUP_SCORE: u32 = 20;
pub const COOP_BARRIER_FULL: u32 = 1000;
pub const COOP_BARRIER_OVER: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    /// Free play: charge builds, nothing scores
    #[default]
    Practice,
    Versus,
    Cooperative,
}

impl GameMode {
    pub fn rules(self) -> &'static ModeRules {
        match self {
            GameMode::Practice => &PRACTICE,
            GameMode::Versus => &VERSUS,
            GameMode::Cooperative => &COOPERATIVE,
        }
    }
}

/// Mode-specific rule hooks
#[derive(Debug)]
pub struct ModeRules {
    pub max_charge: u8,
    /// Particles placed on each serving paddle
    pub serve_count: usize,
    /// After a paddle strike; returns true if the particle was destroyed
    pub handle_hit_particle: fn(&mut GameState, Handle) -> bool,
    pub handle_block_break: fn(&mut GameState),
    /// Scoring and out-of-bounds check for one free particle
    pub check_scoring: fn(&mut GameState, Handle),
    pub handle_barrier_hit: fn(&mut GameState, Handle),
    /// A pickup was collected by `player`
    pub handle_pickup: fn(&mut GameState, Player),
    /// Clear the field and put fresh particles on the serving paddle(s)
    pub reset_serve: fn(&mut GameState, Player),
}

pub static PRACTICE: ModeRules = ModeRules {
    max_charge: 5,
    serve_count: 1,
    handle_hit_particle: charge_on_hit,
    handle_block_break: no_block_score,
    check_scoring: practice_scoring,
    handle_barrier_hit: practice_barrier,
    handle_pickup: no_pickup_score,
    reset_serve: serve_single,
};

pub static VERSUS: ModeRules = ModeRules {
    max_charge: 5,
    serve_count: 1,
    handle_hit_particle: charge_on_hit,
    handle_block_break: no_block_score,
    check_scoring: versus_scoring,
    handle_barrier_hit: versus_barrier,
    handle_pickup: no_pickup_score,
    reset_serve: serve_single,
};

pub static COOPERATIVE: ModeRules = ModeRules {
    max_charge: 9,
    serve_count: 3,
    handle_hit_particle: coop_hit,
    handle_block_break: coop_block,
    check_scoring: coop_scoring,
    handle_barrier_hit: coop_barrier,
    handle_pickup: coop_pickup,
    reset_serve: serve_both,
};

// === Shared ===

fn charge_on_hit(state: &mut GameState, handle: Handle) -> bool {
    if let Some(p) = state.particles.get_mut(handle) {
        p.add_charge();
    }
    false
}

fn no_block_score(_: &mut GameState) {}

fn no_pickup_score(_: &mut GameState, _: Player) {}

fn serve_on(state: &mut GameState, player: Player, count: usize) {
    let mut served = 0;
    for _ in 0..count.min(MAX_ATTACHED) {
        if state.spawn_attached(player).is_some() {
            served += 1;
        }
    }
    state.events.push(GameEvent::Served {
        player,
        particles: served,
    });
    log::info!("{:?} serves {} particle(s)", player, served);
}

fn serve_single(state: &mut GameState, player: Player) {
    state.clear_particles();
    state.server = player;
    let count = state.rules().serve_count;
    serve_on(state, player, count);
}

fn serve_both(state: &mut GameState, _: Player) {
    state.clear_particles();
    let count = state.rules().serve_count;
    for player in Player::ALL {
        serve_on(state, player, count);
    }
}

/// Past a side edge: the player on the other side of the court scores
fn side_exit(state: &GameState, handle: Handle) -> Option<Player> {
    let p = state.particles.get(handle)?;
    let margin = state.tuning.bounds_margin;
    if p.pos.x < -margin {
        Some(Player::Two)
    } else if p.pos.x > state.tuning.arena_width + margin {
        Some(Player::One)
    } else {
        None
    }
}

fn vertical_exit(state: &GameState, handle: Handle) -> bool {
    let margin = state.tuning.bounds_margin;
    state
        .particles
        .get(handle)
        .is_some_and(|p| p.pos.y < -margin || p.pos.y > state.tuning.arena_height + margin)
}

/// Send a shielded particle back into the court on the far side of `exit`.
/// With `required_owner` only a shield owned by that player counts.
fn shield_bounce(
    state: &mut GameState,
    handle: Handle,
    exit: Player,
    required_owner: Option<Player>,
) -> bool {
    let Some(p) = state.particles.get_mut(handle) else {
        return false;
    };
    let Some(owner) = p.shield_owner() else {
        return false;
    };
    if required_owner.is_some_and(|req| owner != req) {
        return false;
    }
    p.consume_shield();
    // `exit` is the player who would have scored; bounce toward them
    p.vel.x = p.base_speed * exit.opponent().side();
    state.events.push(GameEvent::ShieldConsumed { owner });
    log::info!("Shield of {:?} saved a particle", owner);
    true
}

// === Practice ===

fn practice_scoring(state: &mut GameState, handle: Handle) {
    if side_exit(state, handle).is_none() && !vertical_exit(state, handle) {
        return;
    }
    state.destroy_particle(handle, DestroyCause::OutOfBounds);
    if state.live_particles() == 0 {
        let server = state.server;
        state.request_serve(server);
    }
}

/// The barrier's own reflection is the whole response
fn practice_barrier(state: &mut GameState, handle: Handle) {
    if let Some(p) = state.particles.get(handle) {
        let last_hit_by = p.last_hit_by;
        state.events.push(GameEvent::BarrierBounce { last_hit_by });
    }
}

// === Versus ===

fn check_victory(state: &mut GameState) -> bool {
    for player in Player::ALL {
        if state.scores.points[player.index()] >= POINTS_TO_WIN {
            state.finish(Some(player));
            return true;
        }
    }
    false
}

fn versus_scoring(state: &mut GameState, handle: Handle) {
    let scorer = side_exit(state, handle);
    if let Some(scorer) = scorer
        && shield_bounce(state, handle, scorer, Some(scorer))
    {
        return;
    }
    if scorer.is_none() && !vertical_exit(state, handle) {
        return;
    }

    state.destroy_particle(handle, DestroyCause::OutOfBounds);
    if let Some(scorer) = scorer {
        state.award_point(scorer);
        state.server = scorer.opponent();
        log::info!("{:?} scores: {:?}", scorer, state.scores.points);
        if check_victory(state) {
            return;
        }
    }
    if state.live_particles() == 0 {
        let server = state.server;
        state.request_serve(server);
    }
}

fn versus_barrier(state: &mut GameState, handle: Handle) {
    let Some(p) = state.particles.get(handle) else {
        return;
    };
    let last_hit_by = p.last_hit_by;
    let charged = p.charge >= BARRIER_CHARGE;

    let Some(last) = last_hit_by else {
        state.destroy_particle(handle, DestroyCause::Barrier);
        if state.live_particles() == 0 {
            let server = state.server;
            state.request_serve(server);
        }
        return;
    };

    if charged {
        let bounce = state.tuning.barrier_bounce_speed;
        if let Some(p) = state.particles.get_mut(handle) {
            p.vel.y = -bounce.max(p.base_speed * 0.5);
            p.tether = None;
            p.discharge();
        }
        state.take_point(last);
        state.events.push(GameEvent::BarrierBounce { last_hit_by });
        log::info!("Charged particle bounced off the barrier, {:?} loses a point", last);
    } else {
        state.destroy_particle(handle, DestroyCause::Barrier);
        state.award_point(last.opponent());
        state.take_point(last);
        state.server = last.opponent();
        log::info!("Barrier caught {:?}'s particle: {:?}", last, state.scores.points);
        if state.live_particles() == 0 {
            state.request_serve(last.opponent());
        }
    }
    check_victory(state);
}

// === Cooperative ===

fn coop_game_over_if_empty(state: &mut GameState) {
    if state.live_particles() == 0 {
        state.finish(None);
    }
}

fn coop_hit(state: &mut GameState, handle: Handle) -> bool {
    let Some(p) = state.particles.get_mut(handle) else {
        return false;
    };
    let charge = p.add_charge();
    let cap = p.max_charge;
    state.add_team_score(COOP_HIT_SCORE);
    if charge < cap {
        return false;
    }
    state.destroy_particle(handle, DestroyCause::Overcharged);
    log::info!("Particle overcharged and burst");
    coop_game_over_if_empty(state);
    true
}

fn coop_block(state: &mut GameState) {
    state.add_team_score(COOP_BLOCK_SCORE);
}

fn coop_scoring(state: &mut GameState, handle: Handle) {
    if let Some(exit) = side_exit(state, handle) {
        if shield_bounce(state, handle, exit, None) {
            return;
        }
    } else if !vertical_exit(state, handle) {
        return;
    }
    state.destroy_particle(handle, DestroyCause::OutOfBounds);
    coop_game_over_if_empty(state);
}

fn coop_barrier(state: &mut GameState, handle: Handle) {
    let Some(p) = state.particles.get(handle) else {
        return;
    };
    let bonus = match p.charge {
        BARRIER_CHARGE => COOP_BARRIER_FULL,
        c if c > BARRIER_CHARGE => COOP_BARRIER_OVER,
        _ => 0,
    };
    if bonus > 0 {
        state.add_team_score(bonus);
    }
    state.destroy_particle(handle, DestroyCause::Barrier);
    coop_game_over_if_empty(state);
}

fn coop_pickup(state: &mut GameState, _: Player) {
    state.add_team_score(COOP_PICKUP_SCORE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::sim::particle::ParticleState;
    use glam::Vec2;

    fn free_at(state: &mut GameState, pos: Vec2, hitter: Option<Player>) -> Handle {
        let h = state.spawn_particle(pos, ParticleState::Free).unwrap();
        let p = state.particles.get_mut(h).unwrap();
        p.vel = Vec2::new(-1000.0, 0.0);
        p.last_hit_by = hitter;
        h
    }

    #[test]
    fn test_rule_tables() {
        assert_eq!(GameMode::Practice.rules().max_charge, 5);
        assert_eq!(GameMode::Versus.rules().serve_count, 1);
        assert_eq!(GameMode::Cooperative.rules().max_charge, 9);
        assert_eq!(GameMode::Cooperative.rules().serve_count, 3);
    }

    #[test]
    fn test_versus_left_exit_scores_for_two() {
        let mut state = GameState::new(1, GameMode::Versus, Tuning::default());
        state.clear_particles();
        let h = free_at(&mut state, Vec2::new(-60.0, 500.0), Some(Player::One));
        (state.rules().check_scoring)(&mut state, h);

        assert_eq!(state.scores.points, [0, 1]);
        assert!(!state.particles.contains(h));
        assert_eq!(state.take_pending_serve(), Some(Player::One));
    }

    #[test]
    fn test_versus_shield_saves_goal() {
        let mut state = GameState::new(1, GameMode::Versus, Tuning::default());
        let h = free_at(&mut state, Vec2::new(-60.0, 500.0), None);
        state.particles.get_mut(h).unwrap().grant_shield(Player::Two);
        (state.rules().check_scoring)(&mut state, h);

        let p = state.particles.get(h).unwrap();
        assert_eq!(state.scores.points, [0, 0]);
        assert!(p.shield_owner().is_none());
        assert_eq!(p.vel.x, p.base_speed);
    }

    #[test]
    fn test_versus_vertical_exit_no_score() {
        let mut state = GameState::new(1, GameMode::Versus, Tuning::default());
        let h = free_at(&mut state, Vec2::new(900.0, 1200.0), Some(Player::One));
        (state.rules().check_scoring)(&mut state, h);
        assert!(!state.particles.contains(h));
        assert_eq!(state.scores.points, [0, 0]);
    }

    #[test]
    fn test_versus_fifth_point_wins() {
        let mut state = GameState::new(1, GameMode::Versus, Tuning::default());
        state.scores.points = [4, 0];
        let h = free_at(&mut state, Vec2::new(2000.0, 500.0), Some(Player::One));
        (state.rules().check_scoring)(&mut state, h);
        assert!(state.is_over());
        assert_eq!(
            state.phase,
            crate::sim::state::GamePhase::GameOver {
                winner: Some(Player::One)
            }
        );
    }

    #[test]
    fn test_versus_charged_barrier_bounce() {
        let mut state = GameState::new(1, GameMode::Versus, Tuning::default());
        state.scores.points = [2, 2];
        let h = free_at(&mut state, Vec2::new(900.0, 1030.0), Some(Player::One));
        state.particles.get_mut(h).unwrap().charge = 5;
        (state.rules().handle_barrier_hit)(&mut state, h);

        let p = state.particles.get(h).unwrap();
        assert_eq!(p.vel.y, -600.0);
        assert_eq!(p.charge, 4);
        assert_eq!(state.scores.points, [1, 2]);
    }

    #[test]
    fn test_versus_uncharged_barrier_gives_point_away() {
        let mut state = GameState::new(1, GameMode::Versus, Tuning::default());
        let h = free_at(&mut state, Vec2::new(900.0, 1030.0), Some(Player::One));
        (state.rules().handle_barrier_hit)(&mut state, h);
        assert!(!state.particles.contains(h));
        assert_eq!(state.scores.points, [0, 1]);
        assert_eq!(state.server, Player::Two);
    }

    #[test]
    fn test_coop_overcharge_destroys() {
        let mut state = GameState::new(1, GameMode::Cooperative, Tuning::default());
        let h = free_at(&mut state, Vec2::new(900.0, 500.0), Some(Player::One));
        state.particles.get_mut(h).unwrap().charge = 8;
        assert!((state.rules().handle_hit_particle)(&mut state, h));
        assert!(!state.particles.contains(h));
        assert_eq!(state.scores.team, COOP_HIT_SCORE);
        assert!(!state.is_over(), "attached serve particles remain");
    }

    #[test]
    fn test_coop_barrier_bonus_by_charge() {
        let mut state = GameState::new(1, GameMode::Cooperative, Tuning::default());
        let full = free_at(&mut state, Vec2::new(900.0, 1030.0), Some(Player::One));
        let over = free_at(&mut state, Vec2::new(900.0, 1030.0), Some(Player::Two));
        let weak = free_at(&mut state, Vec2::new(900.0, 1030.0), Some(Player::Two));
        state.particles.get_mut(full).unwrap().charge = 5;
        state.particles.get_mut(over).unwrap().charge = 7;
        state.particles.get_mut(weak).unwrap().charge = 2;

        for h in [full, over, weak] {
            (state.rules().handle_barrier_hit)(&mut state, h);
        }
        assert_eq!(state.scores.team, COOP_BARRIER_FULL + COOP_BARRIER_OVER);
        assert_eq!(state.live_particles(), 6);
    }

    #[test]
    fn test_coop_last_particle_lost_ends_game() {
        let mut state = GameState::new(1, GameMode::Cooperative, Tuning::default());
        state.clear_particles();
        let h = free_at(&mut state, Vec2::new(-60.0, 500.0), Some(Player::One));
        (state.rules().check_scoring)(&mut state, h);
        assert_eq!(
            state.phase,
            crate::sim::state::GamePhase::GameOver { winner: None }
        );
    }
}
