//! The player's vehicle

use glam::Vec3;
use serde::Serialize;

use super::events::{Entity, EventQueue, GameOverCause, SimEvent};
use super::lane::{Lane, LaneAnimator, LaneReach, author_lane_timeline};
use crate::error::{Error, Result};
use crate::kmh_displacement;
use crate::tuning::VehicleTuning;

/// Steering direction in lane-index terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Steer {
    /// Towards lane 0
    Left,
    /// Towards lane 2
    Right,
}

impl Steer {
    fn delta(self) -> i8 {
        match self {
            Steer::Left => -1,
            Steer::Right => 1,
        }
    }
}

/// Player vehicle state
///
/// Mutated by its own update (movement, steering), by the hazard monitor
/// (speed, hit counter, game over) and by the pursuer (lane lock, forced
/// speed).
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// World position; z is the distance travelled, x follows the lane blend
    pub position: Vec3,
    lanes: LaneAnimator,
    locked_lane: Option<Lane>,
    /// Current speed (km/h)
    speed: f32,
    base_speed: f32,
    intro_speed: f32,
    hits: u32,
    game_over: bool,
    started: bool,
    last_frame: Option<u64>,
}

impl Vehicle {
    pub fn new(tuning: &VehicleTuning) -> Result<Self> {
        let timeline = author_lane_timeline(
            "vehicle lanes",
            LaneReach::Adjacent,
            tuning.lane_change_ms,
            tuning.lane_skip_ms,
        );
        let lanes = LaneAnimator::new(
            Entity::Vehicle,
            timeline,
            LaneReach::Adjacent,
            tuning.lane_width,
        )?;
        Ok(Self {
            position: Vec3::ZERO,
            lanes,
            locked_lane: None,
            speed: tuning.intro_speed,
            base_speed: tuning.base_speed,
            intro_speed: tuning.intro_speed,
            hits: 0,
            game_over: false,
            started: false,
            last_frame: None,
        })
    }

    /// Begin the run; starting twice is a caller bug
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::Invariant {
                detail: "game already started",
            });
        }
        if self.game_over {
            return Err(Error::Invariant {
                detail: "cannot start a finished game",
            });
        }
        self.started = true;
        log::info!("Game started");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Set the speed (km/h), never below zero
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn intro_speed(&self) -> f32 {
        self.intro_speed
    }

    /// Difference from cruising speed (negative after a hit)
    pub fn delta_speed(&self) -> f32 {
        self.speed - self.base_speed
    }

    pub fn lane(&self) -> Lane {
        self.lanes.current_lane()
    }

    pub fn lanes(&self) -> &LaneAnimator {
        &self.lanes
    }

    pub fn locked_lane(&self) -> Option<Lane> {
        self.locked_lane
    }

    /// Forbid steering into `lane` (`None` unlocks)
    pub fn lock_lane(&mut self, lane: Option<Lane>) {
        self.locked_lane = lane;
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Count an obstacle hit and return the new total
    pub fn register_hit(&mut self) -> u32 {
        self.hits += 1;
        self.hits
    }

    /// Forget one hit once the vehicle is back near cruising speed
    pub fn forgive_hit(&mut self) {
        self.hits = self.hits.saturating_sub(1);
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// End the run and halt the vehicle; returns false if already over
    pub fn game_over(&mut self) -> bool {
        if self.game_over {
            return false;
        }
        self.game_over = true;
        self.speed = 0.0;
        true
    }

    /// End the run with a cause, notifying the host exactly once
    pub fn end_run(&mut self, cause: GameOverCause, events: &mut EventQueue) -> bool {
        if !self.game_over() {
            return false;
        }
        log::info!("Game over: {cause:?} at z={:.1}", self.position.z);
        events.push(SimEvent::GameOver { cause });
        true
    }

    /// Request a lane change one lane over
    ///
    /// Ignored while stopped, towards the locked lane, past the road edge,
    /// or while a blend is in flight.
    pub fn steer(&mut self, direction: Steer, events: &mut EventQueue) -> bool {
        if self.speed <= 0.0 || self.game_over {
            return false;
        }
        let Some(target) = self.lane().step(direction.delta()) else {
            return false;
        };
        self.lanes
            .request_lane_change(target, self.locked_lane, events)
    }

    /// Move and blend for one frame; runs at most once per frame number
    pub fn advance(&mut self, frame: u64, dt: f32, events: &mut EventQueue) -> bool {
        if self.last_frame == Some(frame) {
            return false;
        }
        self.last_frame = Some(frame);

        self.lanes.advance(dt, events);
        if self.started && !self.game_over {
            self.position.z += kmh_displacement(self.speed, dt);
        }
        self.position.x = self.lanes.lateral_offset();
        true
    }

    /// Heading offset of the body during a lane blend
    pub fn yaw(&self) -> f32 {
        self.lanes.yaw()
    }

    /// Distance read-out digits, least significant first
    pub fn distance_digits(&self) -> Vec<u8> {
        scoreboard_digits(self.position.z as i64)
    }

    /// Speed read-out digits, least significant first
    pub fn speed_digits(&self) -> Vec<u8> {
        scoreboard_digits(self.speed as i64)
    }
}

/// Decimal digits of `value`, least significant first (empty for zero)
pub fn scoreboard_digits(value: i64) -> Vec<u8> {
    let mut value = value.unsigned_abs();
    let mut digits = Vec::new();
    while value != 0 {
        digits.push((value % 10) as u8);
        value /= 10;
    }
    digits
}
