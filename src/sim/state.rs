//! Session state and read-only snapshots
//!
//! A [`Session`] owns every entity of one run plus the seeded RNG and the
//! outbound event queue. Two sessions built from the same tuning and seed
//! and fed the same inputs produce identical state.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::events::{CueHandle, EventQueue, SimEvent};
use super::hazard::HazardMonitor;
use super::lane::Lane;
use super::pursuer::{Pursuer, PursuerState};
use super::road::RoadStreamer;
use super::rumble::Rumble;
use super::vehicle::Vehicle;
use crate::error::Result;
use crate::tuning::Tuning;

/// Coarse phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Waiting for the start input
    Waiting,
    Running,
    GameOver,
}

/// Everything a HUD or a test needs to read after a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub frame: u64,
    pub elapsed: f32,
    pub phase: SessionPhase,
    pub lane: Lane,
    pub locked_lane: Option<Lane>,
    pub transitioning: bool,
    /// Vehicle speed (km/h)
    pub speed: f32,
    pub hits: u32,
    pub game_over: bool,
    /// Distance travelled
    pub vehicle_z: f32,
    pub vehicle_x: f32,
    pub yaw: f32,
    pub roll: f32,
    pub pursuer_state: PursuerState,
    pub pursuer_lane: Lane,
    pub pursuer_speed: f32,
    /// Longitudinal gap between pursuer and vehicle
    pub distance: f32,
    pub active_segments: usize,
    pub stock_segments: usize,
    /// Scoreboard digits, least significant first
    pub distance_digits: Vec<u8>,
    pub speed_digits: Vec<u8>,
}

/// One run of the game
#[derive(Debug)]
pub struct Session {
    pub vehicle: Vehicle,
    pub pursuer: Pursuer,
    pub road: RoadStreamer,
    pub hazard: HazardMonitor,
    pub rumble: Rumble,
    pub(crate) rng: Pcg32,
    pub(crate) events: EventQueue,
    pub(crate) frame: u64,
    pub(crate) elapsed: f32,
    seed: u64,
}

impl Session {
    /// Validate the tuning and build every entity
    pub fn new(tuning: &Tuning, seed: u64) -> Result<Self> {
        tuning.validate()?;
        let mut rng = Pcg32::seed_from_u64(seed);
        let road = RoadStreamer::new(&tuning.road, &mut rng)?;
        let vehicle = Vehicle::new(&tuning.vehicle)?;
        let pursuer = Pursuer::new(tuning)?;
        let hazard = HazardMonitor::new(&tuning.hazard, &tuning.audio.obstacle_hit);
        let rumble = Rumble::new(&tuning.vehicle);

        log::info!("Session created with seed {seed}");
        Ok(Self {
            vehicle,
            pursuer,
            road,
            hazard,
            rumble,
            rng,
            events: EventQueue::default(),
            frame: 0,
            elapsed: 0.0,
            seed,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Start the run; starting twice is an error
    pub fn start_game(&mut self) -> Result<()> {
        self.vehicle.start()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.vehicle.is_game_over() {
            SessionPhase::GameOver
        } else if self.vehicle.is_started() {
            SessionPhase::Running
        } else {
            SessionPhase::Waiting
        }
    }

    /// Report that the host finished playing a cue
    pub fn notify_cue_complete(&mut self, handle: CueHandle) {
        if !self.pursuer.notify_cue_complete(handle) {
            log::debug!("Completion for unattached cue {handle:?}");
        }
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    pub fn pending_events(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    pub fn snapshot(&self) -> Snapshot {
        let vehicle = &self.vehicle;
        Snapshot {
            frame: self.frame,
            elapsed: self.elapsed,
            phase: self.phase(),
            lane: vehicle.lane(),
            locked_lane: vehicle.locked_lane(),
            transitioning: vehicle.lanes().is_transitioning(),
            speed: vehicle.speed(),
            hits: vehicle.hits(),
            game_over: vehicle.is_game_over(),
            vehicle_z: vehicle.position.z,
            vehicle_x: vehicle.position.x,
            yaw: vehicle.yaw(),
            roll: self.rumble.roll(),
            pursuer_state: self.pursuer.state(),
            pursuer_lane: self.pursuer.lane(),
            pursuer_speed: self.pursuer.speed(),
            distance: self.pursuer.distance_to(vehicle),
            active_segments: self.road.active_len(),
            stock_segments: self.road.stock_len(),
            distance_digits: vehicle.distance_digits(),
            speed_digits: vehicle.speed_digits(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_new_session_is_waiting() {
        let session = Session::new(&Tuning::default(), 1).unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.phase, SessionPhase::Waiting);
        assert_eq!(snap.lane, Lane::CENTER);
        assert_eq!(snap.pursuer_state, PursuerState::None);
        assert_eq!(snap.stock_segments, 10);
        assert_eq!(snap.distance, 36.5);
    }

    #[test]
    fn test_invalid_tuning_blocks_session() {
        let mut tuning = Tuning::default();
        tuning.road.obstacle_templates.clear();
        assert!(matches!(Session::new(&tuning, 1), Err(Error::Config { .. })));

        let mut tuning = Tuning::default();
        tuning.pursuer.clip_labels.remove("attackStop");
        assert!(matches!(Session::new(&tuning, 1), Err(Error::MissingLabel { .. })));
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut session = Session::new(&Tuning::default(), 1).unwrap();
        session.start_game().unwrap();
        assert!(matches!(session.start_game(), Err(Error::Invariant { .. })));
        assert_eq!(session.phase(), SessionPhase::Running);
    }

    #[test]
    fn test_unknown_cue_completion_is_ignored() {
        let mut session = Session::new(&Tuning::default(), 1).unwrap();
        session.notify_cue_complete(CueHandle(1234));
        assert_eq!(session.pending_events().count(), 0);
    }
}
