//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Frame-stepped with caller-supplied `dt`
//! - Seeded RNG only
//! - Stable iteration order (by pool slot)
//! - No rendering, audio or platform dependencies; the host drains
//!   [`SimEvent`]s instead

pub mod events;
pub mod hazard;
pub mod lane;
pub mod picker;
pub mod pursuer;
pub mod road;
pub mod rumble;
pub mod state;
pub mod tick;
pub mod timeline;
pub mod timers;
pub mod vehicle;

pub use events::{CueHandle, Entity, EventQueue, GameOverCause, SimEvent};
pub use hazard::{CollisionOutcome, HazardMonitor};
pub use lane::{Lane, LaneAnimator, LaneReach, LaneTransitionTable};
pub use pursuer::{GAME_OVER_CAMERA_ANCHOR, Pursuer, PursuerState};
pub use road::{Membership, Obstacle, RoadStreamer, Segment, StreamStep};
pub use rumble::Rumble;
pub use state::{Session, SessionPhase, Snapshot};
pub use tick::{TickInput, tick};
pub use vehicle::{Steer, Vehicle};
