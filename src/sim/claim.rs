//! Claiming neutral particles
//!
//! A South press claims every claimable particle on the field, oldest first.
//! Whatever fits on the claimer's paddle attaches; the rest are destroyed.

use super::arena::{Arena, Handle};
use super::input::Action;
use super::particle::Particle;
use super::state::{DestroyCause, GameEvent, GameState};
use crate::Player;
use crate::consts::MAX_ATTACHED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub player: Player,
    pub attached: usize,
    pub destroyed: usize,
}

/// Oldest claimable particle by spawn order
fn oldest_claimable(particles: &Arena<Particle>) -> Option<Handle> {
    particles
        .iter()
        .filter(|(_, p)| p.is_claimable())
        .min_by_key(|(_, p)| p.spawn_seq)
        .map(|(h, _)| h)
}

/// Read this tick's South edges and run at most one claim. Player one wins
/// when both press on the same tick.
pub fn handle_claim_attempt(state: &mut GameState) -> Option<ClaimOutcome> {
    if state.is_over() {
        return None;
    }
    let claimer = Player::ALL
        .into_iter()
        .find(|&p| state.input.is_just_pressed(Action::South, p))?;
    claim(state, claimer)
}

/// Claim every claimable particle for `claimer`. `None` if there was
/// nothing to claim.
pub fn claim(state: &mut GameState, claimer: Player) -> Option<ClaimOutcome> {
    let claimable = state.particles.iter().filter(|(_, p)| p.is_claimable()).count();
    if claimable == 0 {
        log::debug!("{:?} claim with nothing to claim", claimer);
        return None;
    }

    let space = MAX_ATTACHED.saturating_sub(state.attached_count(claimer));
    let mut attached = 0;
    while attached < space.min(claimable) {
        let Some(handle) = oldest_claimable(&state.particles) else {
            break;
        };
        if !state.attach_to(handle, claimer) {
            break;
        }
        attached += 1;
    }

    let mut destroyed = 0;
    while let Some(handle) = oldest_claimable(&state.particles) {
        state.destroy_particle(handle, DestroyCause::ClaimOverflow);
        destroyed += 1;
    }

    let outcome = ClaimOutcome {
        player: claimer,
        attached,
        destroyed,
    };
    state.events.push(GameEvent::Claimed {
        player: claimer,
        attached,
        destroyed,
    });
    log::info!(
        "{:?} claimed {} particle(s), {} lost to a full paddle",
        claimer,
        attached,
        destroyed
    );
    Some(outcome)
}
