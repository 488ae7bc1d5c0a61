//! Obstacle collisions and recovery

use super::events::{Entity, EventQueue, GameOverCause};
use super::road::RoadStreamer;
use super::vehicle::Vehicle;
use crate::tuning::HazardTuning;

/// Result of one collision check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// Nothing to check this frame
    Skipped,
    /// Passed an obstacle in another lane
    Miss { segment: usize },
    Hit {
        segment: usize,
        hits: u32,
        game_over: bool,
    },
}

impl CollisionOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, CollisionOutcome::Hit { .. })
    }
}

/// Detects obstacle hits and applies slowdown, recovery and game over
#[derive(Debug, Clone)]
pub struct HazardMonitor {
    enabled: bool,
    slowdown: f32,
    acceleration: f32,
    game_over_hits: u32,
    recovery_secs: u32,
    hit_sample: String,
    /// Last integer z at which an obstacle was resolved
    last_collision: Option<i32>,
    /// Seconds since the monitor started counting
    clock: f32,
}

impl HazardMonitor {
    pub fn new(tuning: &HazardTuning, hit_sample: &str) -> Self {
        Self {
            enabled: tuning.enabled,
            slowdown: tuning.slowdown,
            acceleration: tuning.acceleration,
            game_over_hits: tuning.game_over_hits,
            recovery_secs: tuning.recovery_secs,
            hit_sample: hit_sample.to_string(),
            last_collision: None,
            clock: 0.0,
        }
    }

    pub fn last_collision(&self) -> Option<i32> {
        self.last_collision
    }

    /// Resolve the obstacle at the vehicle's integer position, if any
    pub fn check_collision(
        &mut self,
        vehicle: &mut Vehicle,
        road: &mut RoadStreamer,
        events: &mut EventQueue,
    ) -> CollisionOutcome {
        let z = vehicle.position.z as i32;
        if !self.enabled || z <= 0 || self.last_collision == Some(z) || vehicle.is_game_over() {
            return CollisionOutcome::Skipped;
        }
        let Some(id) = road.obstacle_at(z) else {
            return CollisionOutcome::Skipped;
        };
        self.last_collision = Some(z);

        let Some(segment) = road.segment(id) else {
            log::debug!("Obstacle segment {id} vanished");
            return CollisionOutcome::Skipped;
        };
        if !segment.obstacle.visible || segment.obstacle.lane() != vehicle.lane() {
            return CollisionOutcome::Miss { segment: id };
        }

        road.set_obstacle_visible(id, false, events);
        if let Some(segment) = road.segments_mut().get_mut(id) {
            segment.obstacle.recovery = Some(0);
        }
        events.play_cue(&self.hit_sample, false, 1.0, Some(Entity::Vehicle));

        vehicle.set_speed(vehicle.speed() - self.slowdown);
        let hits = vehicle.register_hit();
        log::info!("Obstacle hit at z={z} (hit {hits}/{})", self.game_over_hits);

        let game_over = hits >= self.game_over_hits;
        if game_over {
            vehicle.end_run(GameOverCause::Obstacles, events);
        }
        CollisionOutcome::Hit {
            segment: id,
            hits,
            game_over,
        }
    }

    /// Per-frame recovery: obstacle reappearance, speed regain, hit forgiveness
    pub fn recover(
        &mut self,
        dt: f32,
        collided: bool,
        vehicle: &mut Vehicle,
        road: &mut RoadStreamer,
        events: &mut EventQueue,
    ) {
        let before = self.clock.floor();
        self.clock += dt.max(0.0);
        let seconds = (self.clock.floor() - before) as u32;

        for _ in 0..seconds {
            self.tick_obstacles(road, events);
            let speed = vehicle.speed();
            if speed > 0.0 && !collided && speed + self.acceleration <= vehicle.base_speed() {
                vehicle.set_speed(speed + self.acceleration);
            }
        }

        let speed = vehicle.speed();
        if speed > 0.0 && !collided && speed > vehicle.base_speed() - self.slowdown {
            vehicle.forgive_hit();
        }
    }

    fn tick_obstacles(&self, road: &mut RoadStreamer, events: &mut EventQueue) {
        let mut reappeared = Vec::new();
        for segment in road.segments_mut() {
            let Some(hidden_for) = segment.obstacle.recovery else {
                continue;
            };
            if hidden_for > self.recovery_secs {
                segment.obstacle.recovery = None;
                reappeared.push(segment.id);
            } else {
                segment.obstacle.recovery = Some(hidden_for + 1);
            }
        }
        for id in reappeared {
            road.set_obstacle_visible(id, true, events);
        }
    }
}
