//! Per-frame simulation step
//!
//! Order within a frame: input, vehicle, road, collision, recovery,
//! pursuer, rumble.

use super::events::GameOverCause;
use super::hazard::CollisionOutcome;
use super::state::Session;
use super::vehicle::Steer;

/// Input commands for a single frame
///
/// Steering flags are presses (edge-triggered by the host), not held keys.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Start the run
    pub start: bool,
    pub steer_left: bool,
    pub steer_right: bool,
    /// Give up
    pub end: bool,
}

/// Advance the session by `dt` seconds
pub fn tick(session: &mut Session, input: &TickInput, dt: f32) -> CollisionOutcome {
    let frame = session.frame;
    session.frame += 1;
    session.elapsed += dt;

    let Session {
        vehicle,
        pursuer,
        road,
        hazard,
        rumble,
        rng,
        events,
        ..
    } = session;

    if !vehicle.is_game_over() {
        if input.end {
            vehicle.end_run(GameOverCause::Abandoned, events);
        } else if input.start && !vehicle.is_started() {
            if let Err(e) = vehicle.start() {
                log::warn!("Start ignored: {e}");
            }
        }
    }
    if input.steer_left {
        vehicle.steer(Steer::Left, events);
    } else if input.steer_right {
        vehicle.steer(Steer::Right, events);
    }

    vehicle.advance(frame, dt, events);
    road.advance(vehicle.position.z, rng, events);

    let outcome = hazard.check_collision(vehicle, road, events);
    if vehicle.is_started() {
        hazard.recover(dt, outcome.is_hit(), vehicle, road, events);
    }

    pursuer.update(frame, dt, vehicle, rng, events);

    if vehicle.is_started() && !vehicle.is_game_over() {
        rumble.update(dt);
    }
    outcome
}
