//! Rex Chase - gameplay core of a lane-based endless pursuit runner
//!
//! Core modules:
//! - `sim`: Frame-stepped simulation (vehicle, pursuer, road, hazards)
//! - `tuning`: Data-driven game balance
//! - `error`: Configuration and invariant errors

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{Error, Result};
pub use tuning::Tuning;

/// Game configuration constants (authored defaults for [`Tuning`])
pub mod consts {
    /// Number of driving lanes
    pub const NUM_LANES: u8 = 3;

    /// Road streaming
    pub const ROAD_CHUNK_LENGTH: f32 = 50.0;
    pub const ROAD_WIDTH: f32 = 10.0;
    pub const FRONT_VIEW_DISTANCE: f32 = 200.0;
    pub const CHUNK_POOL_SIZE: usize = 10;
    pub const BOOTSTRAP_CHUNKS: usize = 6;
    pub const PROPS_PER_SIDE: usize = 5;
    /// Stock chunks are parked this far below the road
    pub const STOCK_DEPTH: f32 = -50.0;

    /// Vehicle defaults
    pub const CAR_BASE_SPEED: f32 = 60.0;
    pub const CAR_INTRO_SPEED: f32 = 0.0;
    pub const CAR_WIDTH: f32 = 1.75;
    pub const LANE_WIDTH: f32 = CAR_WIDTH * 1.333;

    /// Lane blend durations (milliseconds)
    pub const LANE_CHANGE_DURATION_MS: u32 = 450;
    pub const LANE_SKIP_DURATION_MS: u32 = 675;

    /// Obstacle hits
    pub const COLLISION_SLOWDOWN: f32 = 20.0;
    pub const COLLISION_ACCELERATION: f32 = 2.0;
    pub const GAME_OVER_HIT_COUNT: u32 = 2;
    /// Whole seconds an obstacle stays hidden after a hit
    pub const OBSTACLE_RECOVERY_SECS: u32 = 2;

    /// Body rumble
    pub const RUMBLE_LEVEL: f32 = 50.0;
    pub const RUMBLE_THRESHOLD: f32 = 0.025;
    pub const RUMBLE_DELAY_SECS: u32 = 5;

    /// Pursuer defaults
    pub const DINO_INTRO_SPEED: f32 = 35.0;
    pub const DINO_BASE_SPEED: f32 = 60.0;
    pub const DINO_LENGTH: f32 = 13.0;
    pub const DINO_STARTING_DIST: f32 = 30.0;
    pub const DINO_DIST: f32 = 7.0;
    pub const DINO_DIST_WHEN_CAR_IS_SLOWN: f32 = 3.5;
    pub const DINO_ATTACKING_DIST: f32 = -0.8;
    pub const DINO_ACCELERATING_BONUS: f32 = 15.0;
    pub const DINO_RECOVERING_PENALTY: f32 = 15.0;
    pub const DINO_FOLLOWING_DELAY: f32 = 1.0;
    pub const DINO_WALKING_TO_SCREAMING_DELAY: f32 = 1.0;
    pub const DINO_AFTER_ATTACK_COOLDOWN: f32 = 2.0;
    /// Eat sequence plays this many times slower than authored
    pub const DINO_GAME_OVER_TIME_SCALE: f32 = 3.0;
}

/// Convert a speed in km/h to a displacement in metres over `dt` seconds
#[inline]
pub fn kmh_displacement(speed_kmh: f32, dt: f32) -> f32 {
    speed_kmh / 3.6 * dt
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
