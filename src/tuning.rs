//! Data-driven game balance
//!
//! Every number the simulation uses lives here so a level designer can tweak
//! a run from a JSON file. Missing fields fall back to the authored defaults
//! in [`crate::consts`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Error, Result};

/// Road streaming and scenery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadTuning {
    /// Length of one recyclable chunk (metres)
    pub chunk_length: f32,
    /// Full road width; obstacle slots sit at `width / 3.2` from the centre
    pub road_width: f32,
    /// How far ahead of the vehicle the road must exist
    pub front_view_distance: f32,
    /// Number of chunks instantiated at start (never changes afterwards)
    pub pool_size: usize,
    /// Chunks placed when the active sequence is empty
    pub bootstrap_chunks: usize,
    /// Props on each side of a chunk
    pub props_per_side: usize,
    /// Height at which stock chunks are parked
    pub stock_depth: f32,
    /// Scenery prop templates (avoid-repeat selection)
    pub prop_templates: Vec<String>,
    /// Obstacle templates
    pub obstacle_templates: Vec<String>,
    /// Light well on the right side of every chunk
    pub light_well: bool,
}

impl Default for RoadTuning {
    fn default() -> Self {
        Self {
            chunk_length: ROAD_CHUNK_LENGTH,
            road_width: ROAD_WIDTH,
            front_view_distance: FRONT_VIEW_DISTANCE,
            pool_size: CHUNK_POOL_SIZE,
            bootstrap_chunks: BOOTSTRAP_CHUNKS,
            props_per_side: PROPS_PER_SIDE,
            stock_depth: STOCK_DEPTH,
            prop_templates: ["a", "b", "c", "d", "e"]
                .iter()
                .map(|s| format!("model/map_block_{s}.scene"))
                .collect(),
            obstacle_templates: ["a", "b", "c", "d"]
                .iter()
                .map(|s| format!("model/item_trunk_{s}.scene"))
                .collect(),
            light_well: true,
        }
    }
}

/// Player vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Cruising speed (km/h)
    pub base_speed: f32,
    /// Speed while the pursuer makes its entrance
    pub intro_speed: f32,
    /// Lateral distance between lane centres
    pub lane_width: f32,
    /// Duration of an adjacent lane blend (ms)
    pub lane_change_ms: u32,
    /// Duration of a two-lane blend (ms)
    pub lane_skip_ms: u32,
    /// Base rumble divisor (higher = calmer)
    pub rumble_level: f32,
    /// Maximum accumulated roll (radians)
    pub rumble_threshold: f32,
    /// Seconds between rumble intensity steps
    pub rumble_delay_secs: u32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            base_speed: CAR_BASE_SPEED,
            intro_speed: CAR_INTRO_SPEED,
            lane_width: LANE_WIDTH,
            lane_change_ms: LANE_CHANGE_DURATION_MS,
            lane_skip_ms: LANE_SKIP_DURATION_MS,
            rumble_level: RUMBLE_LEVEL,
            rumble_threshold: RUMBLE_THRESHOLD,
            rumble_delay_secs: RUMBLE_DELAY_SECS,
        }
    }
}

/// Obstacle collisions and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTuning {
    /// Collision detection on/off
    pub enabled: bool,
    /// Speed lost per hit (km/h)
    pub slowdown: f32,
    /// Speed regained per whole second (km/h)
    pub acceleration: f32,
    /// Hits that end the run
    pub game_over_hits: u32,
    /// Whole seconds a hit obstacle stays hidden
    pub recovery_secs: u32,
}

impl Default for HazardTuning {
    fn default() -> Self {
        Self {
            enabled: true,
            slowdown: COLLISION_SLOWDOWN,
            acceleration: COLLISION_ACCELERATION,
            game_over_hits: GAME_OVER_HIT_COUNT,
            recovery_secs: OBSTACLE_RECOVERY_SECS,
        }
    }
}

/// Pursuer behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PursuerTuning {
    pub intro_speed: f32,
    pub base_speed: f32,
    pub length: f32,
    /// Gap between the pursuer's snout and the vehicle at spawn
    pub starting_distance: f32,
    /// Extra distance kept while walking
    pub distance: f32,
    /// Extra distance kept once the vehicle has been hit
    pub distance_when_slowed: f32,
    /// Extra distance that triggers the attack (negative = overlapping)
    pub attacking_distance: f32,
    pub accelerating_bonus: f32,
    pub recovering_penalty: f32,
    pub following_delay: f32,
    pub walking_to_screaming_delay: f32,
    pub after_attack_cooldown: f32,
    /// Slow-motion factor for the eat sequence
    pub game_over_time_scale: f32,
    /// When false a successful attack only leads to recovery
    pub fail_state: bool,
    /// Skinned clip labels (ms)
    pub clip_labels: BTreeMap<String, u32>,
}

impl Default for PursuerTuning {
    fn default() -> Self {
        Self {
            intro_speed: DINO_INTRO_SPEED,
            base_speed: DINO_BASE_SPEED,
            length: DINO_LENGTH,
            starting_distance: DINO_STARTING_DIST,
            distance: DINO_DIST,
            distance_when_slowed: DINO_DIST_WHEN_CAR_IS_SLOWN,
            attacking_distance: DINO_ATTACKING_DIST,
            accelerating_bonus: DINO_ACCELERATING_BONUS,
            recovering_penalty: DINO_RECOVERING_PENALTY,
            following_delay: DINO_FOLLOWING_DELAY,
            walking_to_screaming_delay: DINO_WALKING_TO_SCREAMING_DELAY,
            after_attack_cooldown: DINO_AFTER_ATTACK_COOLDOWN,
            game_over_time_scale: DINO_GAME_OVER_TIME_SCALE,
            fail_state: true,
            clip_labels: default_clip_labels(),
        }
    }
}

/// Authored label table of the pursuer's skinned clip
pub fn default_clip_labels() -> BTreeMap<String, u32> {
    [
        ("footStepLeftStart", 0),
        ("footStepLeftStop", 500),
        ("footStepRightStart", 500),
        ("footStepRightStop", 1000),
        ("screamStart", 1500),
        ("screamStop", 3500),
        ("attackStart", 5000),
        ("attackStop", 7333),
        ("eatStart", 8000),
        ("eatMoveCamera", 8233),
        ("eatGameOver", 11000),
        ("eatStop", 13000),
        ("runStart", 14000),
        ("runStop", 14800),
        ("footStep2", 2000),
        ("footStep3", 2500),
        ("footStep4", 3000),
        ("footStep5", 3500),
        ("footStep6", 4833),
        ("footStep7", 5333),
        ("footStep8", 5866),
        ("footStep9", 6333),
        ("footStep10", 6833),
        ("footStep11", 7333),
        ("footStep12", 14400),
        ("footStep13", 7333),
        ("footStep14", 7333),
    ]
    .into_iter()
    .map(|(name, ms)| (name.to_string(), ms))
    .collect()
}

/// Sound samples
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioTuning {
    pub eat: Vec<String>,
    pub roar: Vec<String>,
    pub footstep: Vec<String>,
    pub attack: Vec<String>,
    pub rush: Vec<String>,
    pub obstacle_hit: String,
    pub music: String,
    pub music_volume: f32,
}

fn samples(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| format!("sound/{n}.ogg")).collect()
}

impl Default for AudioTuning {
    fn default() -> Self {
        Self {
            eat: samples(&["trex_eat"]),
            roar: samples(&[
                "trex_roar_loud_2",
                "trex_roar_loud_4",
                "trex_roar_loud_7",
                "trex_roar_loud_9",
            ]),
            footstep: samples(&[
                "trex_step_close_1",
                "trex_step_close_2",
                "trex_step_close_3",
                "trex_step_close_4",
                "trex_step_close_5",
                "trex_step_close_6",
            ]),
            attack: samples(&[
                "trex_roar_loud_1",
                "trex_roar_loud_10",
                "trex_roar_loud_11",
                "trex_roar_loud_12",
            ]),
            rush: samples(&["trex_roar_middle_1", "trex_roar_middle_2", "trex_roar_middle_3"]),
            obstacle_hit: "sound/car_hit_1.ogg".to_string(),
            music: "sound/music.ogg".to_string(),
            music_volume: 0.4,
        }
    }
}

/// Complete balance sheet for a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub road: RoadTuning,
    pub vehicle: VehicleTuning,
    pub hazard: HazardTuning,
    pub pursuer: PursuerTuning,
    pub audio: AudioTuning,
}

fn require_positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::config(field, format!("must be positive, got {value}")))
    }
}

fn require_finite(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::config(field, "must be finite"))
    }
}

fn require_samples(field: &'static str, list: &[String]) -> Result<()> {
    if list.is_empty() {
        Err(Error::config(field, "sample list is empty"))
    } else {
        Ok(())
    }
}

impl Tuning {
    /// Parse tuning from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!("Loaded tuning (pool size {})", tuning.road.pool_size);
        Ok(tuning)
    }

    /// Check every value the simulation's timing math depends on
    pub fn validate(&self) -> Result<()> {
        let road = &self.road;
        if road.pool_size == 0 {
            return Err(Error::config("road.pool_size", "pool is empty"));
        }
        if road.bootstrap_chunks == 0 || road.bootstrap_chunks > road.pool_size {
            return Err(Error::config(
                "road.bootstrap_chunks",
                format!("must be within 1..={}", road.pool_size),
            ));
        }
        if road.props_per_side == 0 {
            return Err(Error::config("road.props_per_side", "must be at least 1"));
        }
        if road.prop_templates.is_empty() {
            return Err(Error::config("road.prop_templates", "template list is empty"));
        }
        if road.obstacle_templates.is_empty() {
            return Err(Error::config("road.obstacle_templates", "template list is empty"));
        }
        require_positive("road.chunk_length", road.chunk_length)?;
        require_positive("road.road_width", road.road_width)?;
        require_positive("road.front_view_distance", road.front_view_distance)?;
        require_finite("road.stock_depth", road.stock_depth)?;

        let vehicle = &self.vehicle;
        require_positive("vehicle.base_speed", vehicle.base_speed)?;
        require_positive("vehicle.lane_width", vehicle.lane_width)?;
        require_positive("vehicle.rumble_level", vehicle.rumble_level)?;
        require_finite("vehicle.intro_speed", vehicle.intro_speed)?;
        if vehicle.intro_speed < 0.0 {
            return Err(Error::config("vehicle.intro_speed", "must not be negative"));
        }
        if vehicle.lane_change_ms == 0 {
            return Err(Error::config("vehicle.lane_change_ms", "must be non-zero"));
        }
        if vehicle.lane_skip_ms <= vehicle.lane_change_ms {
            return Err(Error::config(
                "vehicle.lane_skip_ms",
                "two-lane blend must be longer than an adjacent blend",
            ));
        }

        let hazard = &self.hazard;
        require_positive("hazard.slowdown", hazard.slowdown)?;
        require_positive("hazard.acceleration", hazard.acceleration)?;
        if hazard.game_over_hits == 0 {
            return Err(Error::config("hazard.game_over_hits", "must be at least 1"));
        }

        let pursuer = &self.pursuer;
        require_positive("pursuer.length", pursuer.length)?;
        require_positive("pursuer.base_speed", pursuer.base_speed)?;
        require_positive("pursuer.intro_speed", pursuer.intro_speed)?;
        require_positive("pursuer.game_over_time_scale", pursuer.game_over_time_scale)?;
        require_finite("pursuer.attacking_distance", pursuer.attacking_distance)?;
        for (field, value) in [
            ("pursuer.starting_distance", pursuer.starting_distance),
            ("pursuer.distance", pursuer.distance),
            ("pursuer.distance_when_slowed", pursuer.distance_when_slowed),
            ("pursuer.following_delay", pursuer.following_delay),
            ("pursuer.walking_to_screaming_delay", pursuer.walking_to_screaming_delay),
            ("pursuer.after_attack_cooldown", pursuer.after_attack_cooldown),
        ] {
            require_finite(field, value)?;
            if value < 0.0 {
                return Err(Error::config(field, "must not be negative"));
            }
        }

        let audio = &self.audio;
        require_samples("audio.eat", &audio.eat)?;
        require_samples("audio.roar", &audio.roar)?;
        require_samples("audio.footstep", &audio.footstep)?;
        require_samples("audio.attack", &audio.attack)?;
        require_samples("audio.rush", &audio.rush)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_is_valid() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "road": { "pool_size": 12 } }"#).unwrap();
        assert_eq!(tuning.road.pool_size, 12);
        assert_eq!(tuning.road.bootstrap_chunks, BOOTSTRAP_CHUNKS);
        assert_eq!(tuning.vehicle.base_speed, CAR_BASE_SPEED);
    }

    #[test]
    fn test_attack_end_carries_three_footsteps() {
        let labels = default_clip_labels();
        let at_attack_stop = labels
            .iter()
            .filter(|(name, ms)| name.starts_with("footStep") && **ms == labels["attackStop"])
            .count();
        assert_eq!(at_attack_stop, 3);
    }

    #[test]
    fn test_empty_pool_rejected() {
        let mut tuning = Tuning::default();
        tuning.road.pool_size = 0;
        let err = tuning.validate().unwrap_err();
        assert!(matches!(err, Error::Config { field: "road.pool_size", .. }));
    }

    #[test]
    fn test_empty_templates_rejected() {
        let mut tuning = Tuning::default();
        tuning.road.prop_templates.clear();
        assert!(tuning.validate().is_err());

        let mut tuning = Tuning::default();
        tuning.road.obstacle_templates.clear();
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_skip_blend_must_be_longer() {
        let mut tuning = Tuning::default();
        tuning.vehicle.lane_skip_ms = tuning.vehicle.lane_change_ms;
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_bad_json_reports_parse_error() {
        let err = Tuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
