//! Fixed timestep simulation tick
//!
//! A tick is split around the host's collision phase:
//!
//! 1. `tick_pre_collision`: input, controller swap, tether toggles, paddles,
//!    particle integration, falling pickups
//! 2. host collision phase: any number of `on_*` callbacks
//! 3. `tick_post_collision`: normalization, particle effects, attached
//!    particles, launches, scoring, tethers, claims, pending serves, and the
//!    input edge snapshot
//!
//! Mode hooks never reset the serve in the middle of a callback; they ask for
//! one and it runs at the end of the tick.

use super::arena::Handle;
use super::claim::handle_claim_attempt;
use super::collision::{Contacts, circle_rect_collision, corner_rects, reflect_velocity};
use super::input::{Action, InputFrame};
use super::particle::{ParticleState, deflection};
use super::pickup::{PickupKind, roll_drop};
use super::state::{GameEvent, GameState};
use crate::Player;
use glam::Vec2;

/// Advance one tick with no collisions
pub fn tick(state: &mut GameState, frame: &InputFrame, dt: f32) {
    tick_pre_collision(state, frame, dt);
    tick_post_collision(state, dt);
}

/// Advance one tick, detecting and dispatching collisions with the bundled
/// helpers. `contacts` is scratch space reused across ticks.
pub fn tick_with_collisions(
    state: &mut GameState,
    frame: &InputFrame,
    dt: f32,
    contacts: &mut Contacts,
) {
    tick_pre_collision(state, frame, dt);
    contacts.detect(state, dt);
    dispatch_contacts(state, contacts);
    tick_post_collision(state, dt);
}

/// Feed detected contacts through the collision callbacks
pub fn dispatch_contacts(state: &mut GameState, contacts: &Contacts) {
    for contact in &contacts.probes {
        on_probe_particle_overlap(state, contact.player, contact.probe_id, contact.particle);
    }
    for &(particle, block) in &contacts.blocks {
        on_block_hit(state, particle, block);
    }
    for &(pickup, particle) in &contacts.pickups {
        on_pickup_overlap(state, pickup, particle);
    }
    for &(particle, corner) in &contacts.corners {
        on_corner_hit(state, particle, corner);
    }
    for &particle in &contacts.barrier {
        on_barrier_hit(state, particle);
    }
    for &particle in &contacts.out_of_bounds {
        on_out_of_bounds(state, particle);
    }
}

/// Steps 1-2: input, paddles, integration
pub fn tick_pre_collision(state: &mut GameState, frame: &InputFrame, dt: f32) {
    state.trim_event_backlog();
    state.input.update(frame);
    if state.input.poll_swap_button() {
        state.input.swap_players();
        state.events.push(GameEvent::PlayersSwapped {
            swapped: state.input.is_swapped(),
        });
    }
    state.clock.advance(dt);

    for player in Player::ALL {
        if state.input.is_just_pressed(Action::East, player) {
            let rotations = state.rotations();
            let enabled = state.tethers.toggle(player, &mut state.particles, rotations);
            state.events.push(GameEvent::TetherToggled { player, enabled });
        }
    }

    let now = state.now();
    for paddle in &mut state.paddles {
        paddle.update(&state.input, &state.tuning, dt, now);
    }

    if state.is_over() {
        return;
    }

    let height = state.tuning.arena_height;
    for (_, particle) in state.particles.iter_mut() {
        particle.integrate(dt, height);
    }
    update_pickups(state, dt);
}

/// Steps 4-7: everything after the collision phase
pub fn tick_post_collision(state: &mut GameState, dt: f32) {
    if state.is_over() {
        state.input.late_update();
        return;
    }
    let now = state.now();

    for (_, particle) in state.particles.iter_mut() {
        particle.normalize();
        particle.apply_effects(now);
        if let Some((owner, _)) = particle.attachment() {
            particle.follow_paddle(&state.paddles[owner.index()], &state.tuning);
        }
    }

    for player in Player::ALL {
        if state.input.is_just_pressed(Action::North, player) {
            launch(state, player);
        }
    }

    let check_scoring = state.rules().check_scoring;
    for i in 0..state.particles.capacity() {
        if state.is_over() {
            break;
        }
        let Some(handle) = state.particles.handle_at(i) else {
            continue;
        };
        if state.particles.get(handle).is_some_and(|p| p.is_free()) {
            check_scoring(state, handle);
        }
    }

    let rotations = state.rotations();
    state.tethers.update(
        &mut state.particles,
        rotations,
        &state.tuning,
        dt,
        &mut state.events,
    );

    handle_claim_attempt(state);

    if let Some(server) = state.take_pending_serve()
        && !state.is_over()
    {
        if state.live_particles() == 0 {
            (state.rules().reset_serve)(state, server);
        } else {
            log::debug!("Serve for {:?} skipped, field is not empty", server);
        }
    }

    state.input.late_update();
}

/// Launch the particle in slot 0 of a paddle; the others move up a slot
pub fn launch(state: &mut GameState, player: Player) -> bool {
    let Some(handle) = state.attached_in_slot(player, 0) else {
        return false;
    };
    let paddle = &state.paddles[player.index()];
    let Some(particle) = state.particles.get_mut(handle) else {
        return false;
    };
    particle.launch(paddle, &state.tuning, state.rng_state.rng());
    state.compact_slots(player);
    state.events.push(GameEvent::Launched { player });
    log::debug!("{:?} launched a particle", player);
    true
}

fn update_pickups(state: &mut GameState, dt: f32) {
    for i in 0..state.pickups.capacity() {
        let Some(handle) = state.pickups.handle_at(i) else {
            continue;
        };
        let on_screen = state
            .pickups
            .get_mut(handle)
            .is_some_and(|pickup| pickup.fall(dt, &state.tuning));
        if !on_screen {
            state.pickups.release(handle);
        }
    }
}

/// A particle touched a paddle probe. Returns true if the strike counted.
pub fn on_probe_particle_overlap(
    state: &mut GameState,
    player: Player,
    probe_id: u32,
    handle: Handle,
) -> bool {
    if state.is_over() {
        return false;
    }
    let now = state.now();
    let cooldown = state.tuning.hit_cooldown_ms;
    let paddle = &state.paddles[player.index()];
    let Some(probe) = paddle.probe(probe_id) else {
        log::debug!("{:?} probe {} no longer exists", player, probe_id);
        return false;
    };
    let dir = deflection(
        player,
        probe.local_y,
        paddle.half_length(),
        paddle.rotation_deg,
        state.tuning.max_rotation_deg,
    );
    let rotations = state.rotations();

    let Some(particle) = state.particles.get_mut(handle) else {
        log::debug!("Strike on a destroyed particle ignored");
        return false;
    };
    if !particle.is_free() || !particle.can_accept_hit(player, now, cooldown) {
        return false;
    }
    particle.record_hit(player, now);
    particle.set_last_hit(player);
    if let Some((from, to)) = state.tethers.sync(particle, rotations) {
        state.events.push(GameEvent::TetherReparented { from, to });
    }

    if (state.rules().handle_hit_particle)(state, handle) {
        return true;
    }
    if let Some(particle) = state.particles.get_mut(handle) {
        particle.deflect(dir);
        let charge = particle.charge;
        state.events.push(GameEvent::ParticleHit { player, charge });
    }
    true
}

/// A particle left the arena area
pub fn on_out_of_bounds(state: &mut GameState, handle: Handle) {
    if state.is_over() {
        return;
    }
    if state.particles.get(handle).is_some_and(|p| p.is_free()) {
        (state.rules().check_scoring)(state, handle);
    }
}

/// A particle touched the stabilizer barrier. The barrier always reflects;
/// a shield absorbs the contact, otherwise free particles go to the mode.
pub fn on_barrier_hit(state: &mut GameState, handle: Handle) -> bool {
    if state.is_over() {
        return false;
    }
    let now = state.now();
    let window = state.tuning.barrier_dedupe_ms;
    let Some(particle) = state.particles.get_mut(handle) else {
        return false;
    };
    particle.vel.y = -particle.vel.y.abs();
    if !particle.accept_barrier_contact(now, window) {
        return false;
    }
    if let Some(owner) = particle.shield_owner() {
        particle.consume_shield();
        state.events.push(GameEvent::ShieldConsumed { owner });
        log::info!("Shield of {:?} absorbed a barrier hit", owner);
        return true;
    }
    if !particle.is_free() {
        return false;
    }
    (state.rules().handle_barrier_hit)(state, handle);
    true
}

/// A particle broke a block
pub fn on_block_hit(state: &mut GameState, handle: Handle, block_id: u32) -> bool {
    if state.is_over() {
        return false;
    }
    let Some(block) = state.blocks.get(block_id).copied() else {
        log::debug!("Block {} already broken", block_id);
        return false;
    };
    if let Some(particle) = state.particles.get_mut(handle) {
        let hit =
            circle_rect_collision(particle.pos, particle.radius, block.center, block.half_size());
        if hit.hit {
            particle.pos += hit.normal * hit.penetration;
            if particle.vel.dot(hit.normal) < 0.0 {
                particle.vel = reflect_velocity(particle.vel, hit.normal);
            }
        }
    }

    state.blocks.remove(block_id);
    state.events.push(GameEvent::BlockBroken {
        id: block.id,
        row: block.row,
    });
    (state.rules().handle_block_break)(state);
    if state.is_over() {
        return true;
    }

    let chance = state.tuning.powerup_drop_chance;
    if let Some(kind) = roll_drop(state.rng_state.rng(), chance) {
        state.spawn_pickup(kind, block.center);
    }

    if state.blocks.collapse_if_empty(block.row) {
        state.events.push(GameEvent::RowCleared { row: block.row });
        let center = Vec2::new(state.tuning.arena_width, state.tuning.arena_height) / 2.0;
        state.spawn_particle(center, ParticleState::Claimable);
    }
    true
}

/// A particle bumped one of the bottom corner blocks
pub fn on_corner_hit(state: &mut GameState, handle: Handle, corner: usize) {
    let Some(&(center, half)) = corner_rects(&state.tuning).get(corner) else {
        return;
    };
    let Some(particle) = state.particles.get_mut(handle) else {
        return;
    };
    let hit = circle_rect_collision(particle.pos, particle.radius, center, half);
    if hit.hit {
        particle.pos += hit.normal * hit.penetration;
        if particle.vel.dot(hit.normal) < 0.0 {
            particle.vel = reflect_velocity(particle.vel, hit.normal);
        }
    }
}

/// A particle touched a pickup. Returns true if it was collected.
pub fn on_pickup_overlap(state: &mut GameState, pickup: Handle, handle: Handle) -> bool {
    if state.is_over() {
        return false;
    }
    let now = state.now();
    let Some(kind) = state
        .pickups
        .get(pickup)
        .filter(|p| p.is_active(now, &state.tuning))
        .map(|p| p.kind)
    else {
        return false;
    };
    let Some(collector) = state.particles.get(handle).map(|p| p.last_hit_by) else {
        return false;
    };
    state.pickups.release(pickup);
    let Some(player) = collector else {
        log::debug!("{:?} pickup touched by an unclaimed particle, discarded", kind);
        return false;
    };

    (state.rules().handle_pickup)(state, player);
    let tuning = &state.tuning;
    match kind {
        PickupKind::Shield => {
            if let Some(particle) = state.particles.get_mut(handle)
                && !particle.grant_shield(player)
            {
                log::debug!("Particle already shielded, shield pickup wasted");
            }
        }
        PickupKind::Ice => {
            if let Some(particle) = state.particles.get_mut(handle) {
                particle.grant_ice(now, tuning);
            }
        }
        PickupKind::Snail => state.paddles[player.index()].grant_snail(now, tuning),
        PickupKind::PaddleGrow => state.paddles[player.index()].grant_grow(now, tuning),
    }
    state.events.push(GameEvent::PickupCollected { player, kind });
    log::info!("{:?} collected {:?}", player, kind);
    true
}
