//! The pursuing creature
//!
//! A finite-state machine whose guards read the vehicle's position, lane and
//! hit count. The skinned clip is modelled as a labelled [`Timeline`]; the
//! scream and attack sequences end when their window's stop label is
//! crossed, exactly as the authored animation dictates.
//!
//! ```text
//! None -> Spawning -> Walking <-> Following
//!                     Walking -> Screaming -> Accelerating -> Attacking
//!                     Attacking -> Recovering -> Walking
//!                     Attacking -> CaughtGameOver
//! ```

use glam::Vec3;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::events::{CueAttachments, CueHandle, Entity, EventQueue, GameOverCause, SimEvent};
use super::lane::{Lane, LaneAnimator, LaneReach, author_lane_timeline};
use super::picker::SamplePicker;
use super::timeline::{Playback, Timeline, Window};
use super::timers::{TimerBank, TimerKey};
use super::vehicle::Vehicle;
use crate::error::{Error, Result};
use crate::kmh_displacement;
use crate::tuning::{AudioTuning, PursuerTuning, Tuning};

const LABEL_FOOT_STEP_LEFT_START: &str = "footStepLeftStart";
const LABEL_FOOT_STEP_RIGHT_START: &str = "footStepRightStart";
const LABEL_FOOT_STEP_RIGHT_STOP: &str = "footStepRightStop";
const LABEL_SCREAM_START: &str = "screamStart";
const LABEL_SCREAM_STOP: &str = "screamStop";
const LABEL_ATTACK_START: &str = "attackStart";
const LABEL_ATTACK_STOP: &str = "attackStop";
const LABEL_EAT_START: &str = "eatStart";
const LABEL_EAT_MOVE_CAMERA: &str = "eatMoveCamera";
const LABEL_EAT_GAME_OVER: &str = "eatGameOver";
const LABEL_EAT_STOP: &str = "eatStop";
const LABEL_RUN_START: &str = "runStart";
const LABEL_RUN_STOP: &str = "runStop";

/// Scene anchor the camera moves to during the eat sequence
pub const GAME_OVER_CAMERA_ANCHOR: &str = "Box_Camera_Game_Over";

/// Behavioural state of the pursuer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PursuerState {
    /// Not yet spawned
    #[default]
    None,
    /// Closing in while the vehicle waits
    Spawning,
    Walking,
    /// Switching to the vehicle's lane
    Following,
    Screaming,
    Accelerating,
    Attacking,
    /// Falling back after an attack
    Recovering,
    /// Terminal: the vehicle was caught
    CaughtGameOver,
}

fn is_footstep(label: &str) -> bool {
    label == LABEL_FOOT_STEP_LEFT_START
        || label == LABEL_FOOT_STEP_RIGHT_START
        || label
            .strip_prefix("footStep")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// A playable range of the skinned clip
#[derive(Debug, Clone, Copy)]
struct ClipWindow {
    start: &'static str,
    end: &'static str,
    window: Window,
}

impl ClipWindow {
    fn resolve(clip: &Timeline, start: &'static str, end: &'static str) -> Result<Self> {
        Ok(Self {
            start,
            end,
            window: clip.window(start, end)?,
        })
    }
}

/// Windows of the skinned clip, resolved once at construction
#[derive(Debug, Clone, Copy)]
struct ClipWindows {
    walk: ClipWindow,
    scream: ClipWindow,
    run: ClipWindow,
    attack: ClipWindow,
    eat: ClipWindow,
}

impl ClipWindows {
    fn resolve(clip: &Timeline) -> Result<Self> {
        let windows = Self {
            walk: ClipWindow::resolve(clip, LABEL_FOOT_STEP_LEFT_START, LABEL_FOOT_STEP_RIGHT_STOP)?,
            scream: ClipWindow::resolve(clip, LABEL_SCREAM_START, LABEL_SCREAM_STOP)?,
            run: ClipWindow::resolve(clip, LABEL_RUN_START, LABEL_RUN_STOP)?,
            attack: ClipWindow::resolve(clip, LABEL_ATTACK_START, LABEL_ATTACK_STOP)?,
            eat: ClipWindow::resolve(clip, LABEL_EAT_START, LABEL_EAT_STOP)?,
        };
        for label in [LABEL_EAT_MOVE_CAMERA, LABEL_EAT_GAME_OVER] {
            let t = clip.label(label)?;
            if t < windows.eat.window.start || t > windows.eat.window.end {
                return Err(Error::config(
                    "pursuer.clip_labels",
                    format!("`{label}` lies outside the eat window"),
                ));
            }
        }
        Ok(windows)
    }
}

/// Sound pickers, one per call site
#[derive(Debug, Clone)]
struct Voices {
    eat: SamplePicker<String>,
    roar: SamplePicker<String>,
    footstep: SamplePicker<String>,
    attack: SamplePicker<String>,
    rush: SamplePicker<String>,
    music: String,
    music_volume: f32,
}

impl Voices {
    fn new(audio: &AudioTuning) -> Self {
        Self {
            eat: SamplePicker::new(audio.eat.clone()),
            roar: SamplePicker::new(audio.roar.clone()),
            footstep: SamplePicker::new(audio.footstep.clone()),
            attack: SamplePicker::new(audio.attack.clone()),
            rush: SamplePicker::new(audio.rush.clone()),
            music: audio.music.clone(),
            music_volume: audio.music_volume,
        }
    }
}

fn play_attached(
    picker: &mut SamplePicker<String>,
    cues: &mut CueAttachments,
    rng: &mut Pcg32,
    events: &mut EventQueue,
) -> Option<CueHandle> {
    let sample = picker.next(rng)?;
    let handle = events.play_cue(sample, false, 1.0, Some(Entity::Pursuer));
    cues.attach(handle, Entity::Pursuer);
    Some(handle)
}

/// Everything outside the pursuer that one update touches
struct Chase<'a> {
    vehicle: &'a mut Vehicle,
    rng: &'a mut Pcg32,
    events: &'a mut EventQueue,
}

/// The pursuer and its behaviour
#[derive(Debug, Clone)]
pub struct Pursuer {
    pub position: Vec3,
    state: PursuerState,
    tuning: PursuerTuning,
    lanes: LaneAnimator,
    lane_change_secs: f32,
    /// Speed the current state asks for at cruising vehicle speed (km/h)
    required_speed: f32,
    speed: f32,
    timers: TimerBank,
    had_same_lane: bool,
    eating: bool,
    game_is_over: bool,
    clip: Timeline,
    playback: Playback,
    windows: ClipWindows,
    voices: Voices,
    cues: CueAttachments,
    last_frame: Option<u64>,
}

impl Pursuer {
    /// Build the pursuer; a clip missing a window label is rejected
    pub fn new(tuning: &Tuning) -> Result<Self> {
        let clip = Timeline::new(
            "pursuer clip",
            tuning
                .pursuer
                .clip_labels
                .iter()
                .map(|(name, &ms)| (name.clone(), ms)),
        );
        let windows = ClipWindows::resolve(&clip)?;

        let lane_timeline = author_lane_timeline(
            "pursuer lanes",
            LaneReach::Any,
            tuning.vehicle.lane_change_ms,
            tuning.vehicle.lane_skip_ms,
        );
        let lanes = LaneAnimator::new(
            Entity::Pursuer,
            lane_timeline,
            LaneReach::Any,
            tuning.vehicle.lane_width,
        )?;

        let p = &tuning.pursuer;
        Ok(Self {
            position: Vec3::new(0.0, 0.0, -(p.length / 2.0) - p.starting_distance),
            state: PursuerState::None,
            tuning: p.clone(),
            lanes,
            lane_change_secs: tuning.vehicle.lane_change_ms as f32 / 1000.0,
            required_speed: p.base_speed,
            speed: 0.0,
            timers: TimerBank::default(),
            had_same_lane: false,
            eating: false,
            game_is_over: false,
            clip,
            playback: Playback::default(),
            windows,
            voices: Voices::new(&tuning.audio),
            cues: CueAttachments::default(),
            last_frame: None,
        })
    }

    pub fn state(&self) -> PursuerState {
        self.state
    }

    pub fn lane(&self) -> Lane {
        self.lanes.current_lane()
    }

    pub fn lanes(&self) -> &LaneAnimator {
        &self.lanes
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn required_speed(&self) -> f32 {
        self.required_speed
    }

    pub fn timers(&self) -> &TimerBank {
        &self.timers
    }

    pub fn is_eating(&self) -> bool {
        self.eating
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    /// Sounds still attached to the pursuer
    pub fn active_cues(&self) -> usize {
        self.cues.len()
    }

    /// Longitudinal gap to the vehicle
    pub fn distance_to(&self, vehicle: &Vehicle) -> f32 {
        (vehicle.position.z - self.position.z).abs()
    }

    /// Gap the pursuer aims to keep: half its body plus `extra`
    pub fn required_distance(&self, extra: f32) -> f32 {
        self.tuning.length / 2.0 + extra
    }

    /// Extra gap while walking; shorter once the vehicle has been hit
    pub fn default_extra_distance(&self, vehicle: &Vehicle) -> f32 {
        if vehicle.hits() > 0 {
            self.tuning.distance_when_slowed
        } else {
            self.tuning.distance
        }
    }

    /// Record that the host finished playing a cue
    pub fn notify_cue_complete(&mut self, handle: CueHandle) -> bool {
        self.cues.complete(handle)
    }

    /// Leave `None` and start the entrance
    pub fn spawn(&mut self, vehicle: &mut Vehicle, rng: &mut Pcg32, events: &mut EventQueue) -> Result<()> {
        if self.state != PursuerState::None {
            return Err(Error::Invariant {
                detail: "pursuer already spawned",
            });
        }
        let mut chase = Chase { vehicle, rng, events };
        self.change_state(PursuerState::Spawning, &mut chase);
        Ok(())
    }

    /// One frame of pursuit; runs at most once per frame number
    pub fn update(
        &mut self,
        frame: u64,
        dt: f32,
        vehicle: &mut Vehicle,
        rng: &mut Pcg32,
        events: &mut EventQueue,
    ) -> bool {
        if self.last_frame == Some(frame) || !vehicle.is_started() {
            return false;
        }
        self.last_frame = Some(frame);
        if vehicle.is_game_over() {
            // The run is decided; only finished cues are still released
            self.cues.sweep(events);
            return false;
        }
        let mut chase = Chase { vehicle, rng, events };

        if self.state == PursuerState::None {
            self.change_state(PursuerState::Spawning, &mut chase);
        }
        self.cues.sweep(chase.events);

        self.position.z += kmh_displacement(self.speed, dt);
        self.lanes.advance(dt, chase.events);
        self.position.x = self.lanes.lateral_offset();

        let same_lane = self.lane() == chase.vehicle.lane();
        if self.had_same_lane && !same_lane {
            log::debug!("Vehicle left the pursuer's lane");
            self.timers.reset(TimerKey::CarExitedLane);
        } else if !self.had_same_lane && same_lane {
            log::debug!("Vehicle entered the pursuer's lane");
            self.timers.reset(TimerKey::CarEnteredLane);
        }
        self.had_same_lane = same_lane;

        self.speed = if self.eating {
            0.0
        } else {
            self.required_speed + chase.vehicle.delta_speed()
        };

        self.timers.accumulate(dt);
        self.evaluate_guards(&mut chase);

        let labels = self.playback.advance(&self.clip, dt);
        for label in labels {
            self.on_clip_label(&label, &mut chase);
        }
        true
    }

    fn evaluate_guards(&mut self, chase: &mut Chase<'_>) {
        let vehicle = &*chase.vehicle;
        let distance = self.distance_to(vehicle);
        let default_gap = self.required_distance(self.default_extra_distance(vehicle));
        let same_lane = self.lane() == vehicle.lane();

        let next = match self.state {
            PursuerState::Spawning if distance > 0.0 && distance <= default_gap => {
                Some(PursuerState::Walking)
            }
            PursuerState::Walking
                if !same_lane
                    && self.timers.elapsed(TimerKey::CarExitedLane) > self.tuning.following_delay =>
            {
                Some(PursuerState::Following)
            }
            PursuerState::Walking
                if same_lane
                    && self.timers.elapsed(TimerKey::CarEnteredLane)
                        > self.tuning.walking_to_screaming_delay
                    && self.timers.elapsed(TimerKey::AttackEnded)
                        > self.tuning.after_attack_cooldown =>
            {
                Some(PursuerState::Screaming)
            }
            PursuerState::Following
                if self.timers.elapsed(TimerKey::StateChanged) > self.lane_change_secs =>
            {
                Some(PursuerState::Walking)
            }
            PursuerState::Accelerating
                if distance < self.required_distance(self.tuning.attacking_distance) =>
            {
                Some(PursuerState::Attacking)
            }
            PursuerState::Recovering if distance > default_gap => Some(PursuerState::Walking),
            _ => None,
        };
        if let Some(next) = next {
            self.change_state(next, chase);
        }
    }

    fn on_clip_label(&mut self, label: &str, chase: &mut Chase<'_>) {
        let same_lane = self.lane() == chase.vehicle.lane();
        match label {
            LABEL_SCREAM_STOP if self.state == PursuerState::Screaming => {
                let next = if same_lane {
                    PursuerState::Accelerating
                } else {
                    PursuerState::Walking
                };
                self.change_state(next, chase);
            }
            LABEL_ATTACK_STOP if self.state == PursuerState::Attacking => {
                let next = if same_lane && self.tuning.fail_state {
                    PursuerState::CaughtGameOver
                } else {
                    PursuerState::Recovering
                };
                self.change_state(next, chase);
            }
            LABEL_EAT_MOVE_CAMERA if self.state == PursuerState::CaughtGameOver => {
                chase.events.push(SimEvent::MoveCameraToAnchor {
                    anchor: GAME_OVER_CAMERA_ANCHOR,
                });
            }
            LABEL_EAT_GAME_OVER if self.state == PursuerState::CaughtGameOver => {
                self.game_over(chase);
            }
            label if is_footstep(label) => {
                play_attached(&mut self.voices.footstep, &mut self.cues, chase.rng, chase.events);
            }
            _ => {}
        }
    }

    /// Exit the old state, enter the new one, reset the state clock
    fn change_state(&mut self, next: PursuerState, chase: &mut Chase<'_>) {
        if next == self.state {
            return;
        }
        let previous = self.state;
        log::info!("Pursuer {previous:?} -> {next:?}");

        self.exit_state(previous, chase);
        self.state = next;
        self.enter_state(next, previous, chase);
        self.timers.reset(TimerKey::StateChanged);

        chase.events.push(SimEvent::PursuerState {
            from: previous,
            to: next,
        });
    }

    fn exit_state(&mut self, state: PursuerState, chase: &mut Chase<'_>) {
        match state {
            PursuerState::Spawning => {
                chase.vehicle.set_speed(chase.vehicle.base_speed());
                chase.events.play_cue(
                    &self.voices.music,
                    true,
                    self.voices.music_volume,
                    None,
                );
            }
            PursuerState::Attacking => {
                chase.vehicle.lock_lane(None);
                self.timers.reset(TimerKey::AttackEnded);
            }
            _ => {}
        }
    }

    fn enter_state(&mut self, state: PursuerState, previous: PursuerState, chase: &mut Chase<'_>) {
        let base = self.tuning.base_speed;
        match state {
            PursuerState::None => {}
            PursuerState::Spawning => {
                chase.vehicle.set_speed(chase.vehicle.intro_speed());
                self.required_speed =
                    self.tuning.intro_speed - chase.vehicle.delta_speed().min(0.0);
                self.play_window(self.windows.walk, chase.events);
            }
            PursuerState::Walking => {
                self.required_speed = base;
                if previous != PursuerState::Following {
                    self.play_window(self.windows.walk, chase.events);
                }
            }
            PursuerState::Following => {
                let target = chase.vehicle.lane();
                self.lanes.retarget(target, chase.events);
            }
            PursuerState::Screaming => {
                self.play_window(self.windows.scream, chase.events);
                play_attached(&mut self.voices.roar, &mut self.cues, chase.rng, chase.events);
            }
            PursuerState::Accelerating => {
                self.required_speed = base + self.tuning.accelerating_bonus;
                self.play_window(self.windows.run, chase.events);
                play_attached(&mut self.voices.rush, &mut self.cues, chase.rng, chase.events);
            }
            PursuerState::Attacking => {
                self.required_speed = base;
                chase.vehicle.lock_lane(Some(self.lane()));
                self.play_window(self.windows.attack, chase.events);
                play_attached(&mut self.voices.attack, &mut self.cues, chase.rng, chase.events);
            }
            PursuerState::Recovering => {
                self.play_window(self.windows.walk, chase.events);
                self.required_speed = base - self.tuning.recovering_penalty;
            }
            PursuerState::CaughtGameOver => {
                self.eat(chase);
                self.play_window(self.windows.eat, chase.events);
                let rate = 1.0 / self.tuning.game_over_time_scale;
                self.playback.set_rate(rate);
                chase.events.push(SimEvent::AnimationRate {
                    entity: Entity::Pursuer,
                    rate,
                });
            }
        }
    }

    fn play_window(&mut self, clip: ClipWindow, events: &mut EventQueue) {
        self.playback.play_window(clip.window, true);
        events.push(SimEvent::PlayWindow {
            entity: Entity::Pursuer,
            start: clip.start.to_string(),
            end: clip.end.to_string(),
            looping: true,
        });
    }

    fn eat(&mut self, chase: &mut Chase<'_>) {
        self.eating = true;
        chase.vehicle.set_speed(0.0);
        self.required_speed = 0.0;
        play_attached(&mut self.voices.eat, &mut self.cues, chase.rng, chase.events);
    }

    fn game_over(&mut self, chase: &mut Chase<'_>) {
        if self.game_is_over {
            return;
        }
        self.game_is_over = true;
        self.playback.stop();
        chase.events.push(SimEvent::StopAnimation {
            entity: Entity::Pursuer,
        });
        chase.vehicle.end_run(GameOverCause::Caught, chase.events);
        self.position = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::vehicle::Steer;
    use proptest::prelude::*;
    use rand::SeedableRng;

    struct Rig {
        vehicle: Vehicle,
        pursuer: Pursuer,
        rng: Pcg32,
        events: EventQueue,
        frame: u64,
    }

    impl Rig {
        fn new(tuning: &Tuning) -> Self {
            let mut vehicle = Vehicle::new(&tuning.vehicle).unwrap();
            vehicle.start().unwrap();
            Self {
                vehicle,
                pursuer: Pursuer::new(tuning).unwrap(),
                rng: Pcg32::seed_from_u64(42),
                events: EventQueue::default(),
                frame: 0,
            }
        }

        fn step(&mut self, dt: f32) {
            self.vehicle.advance(self.frame, dt, &mut self.events);
            self.pursuer
                .update(self.frame, dt, &mut self.vehicle, &mut self.rng, &mut self.events);
            self.frame += 1;
        }

        /// Step until `pred` holds or `secs` elapse; returns whether it held
        fn run_until(&mut self, secs: f32, pred: impl Fn(&Rig) -> bool) -> bool {
            let dt = 1.0 / 60.0;
            let mut t = 0.0;
            while t < secs {
                self.step(dt);
                if pred(self) {
                    return true;
                }
                t += dt;
            }
            false
        }
    }

    fn rig() -> Rig {
        Rig::new(&Tuning::default())
    }

    #[test]
    fn test_footstep_labels() {
        assert!(is_footstep("footStepLeftStart"));
        assert!(is_footstep("footStep12"));
        assert!(!is_footstep("footStepLeftStop"));
        assert!(!is_footstep("footStep"));
    }

    #[test]
    fn test_missing_clip_label_rejected() {
        let mut tuning = Tuning::default();
        tuning.pursuer.clip_labels.remove("screamStop");
        let err = Pursuer::new(&tuning).unwrap_err();
        assert!(matches!(err, Error::MissingLabel { .. }));
    }

    #[test]
    fn test_first_update_spawns_and_stops_vehicle() {
        let mut r = rig();
        r.step(0.0);
        assert_eq!(r.pursuer.state(), PursuerState::Spawning);
        assert_eq!(r.vehicle.speed(), 0.0);
        // Intro speed compensates for the stopped vehicle
        assert_eq!(r.pursuer.required_speed(), 95.0);
        assert_eq!(r.pursuer.speed(), 35.0);
        assert!(matches!(
            r.pursuer.spawn(&mut r.vehicle, &mut r.rng, &mut r.events),
            Err(Error::Invariant { .. })
        ));
    }

    #[test]
    fn test_nothing_happens_before_start() {
        let tuning = Tuning::default();
        let mut vehicle = Vehicle::new(&tuning.vehicle).unwrap();
        let mut pursuer = Pursuer::new(&tuning).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut events = EventQueue::default();
        assert!(!pursuer.update(0, 1.0, &mut vehicle, &mut rng, &mut events));
        assert_eq!(pursuer.state(), PursuerState::None);
    }

    #[test]
    fn test_spawning_walks_once_within_required_distance() {
        let mut r = rig();
        r.step(0.0);

        r.pursuer.position.z = -20.0;
        r.step(0.0);
        assert_eq!(r.pursuer.state(), PursuerState::Spawning);

        r.pursuer.position.z = -13.6;
        r.step(0.0);
        assert_eq!(r.pursuer.state(), PursuerState::Spawning);

        r.pursuer.position.z = -13.5;
        r.step(0.0);
        assert_eq!(r.pursuer.state(), PursuerState::Walking);
        // Leaving the intro restores cruising speed and starts the music
        assert_eq!(r.vehicle.speed(), r.vehicle.base_speed());
        assert!(r.events.iter().any(|e| matches!(
            e,
            SimEvent::PlayCue { sample, looping: true, .. } if sample == "sound/music.ogg"
        )));
    }

    #[test]
    fn test_spawning_waits_closer_after_a_hit() {
        let mut r = rig();
        r.step(0.0);
        r.vehicle.register_hit();

        r.pursuer.position.z = -12.0;
        r.step(0.0);
        assert_eq!(r.pursuer.state(), PursuerState::Spawning);

        r.pursuer.position.z = -10.0;
        r.step(0.0);
        assert_eq!(r.pursuer.state(), PursuerState::Walking);
    }

    #[test]
    fn test_state_clock_resets_on_transition() {
        let mut r = rig();
        r.step(0.0);
        r.pursuer.position.z = -10.0;
        r.step(0.0);
        assert_eq!(r.pursuer.state(), PursuerState::Walking);
        assert_eq!(r.pursuer.timers().elapsed(TimerKey::StateChanged), 0.0);

        r.step(0.25);
        assert_eq!(r.pursuer.state(), PursuerState::Walking);
        assert!((r.pursuer.timers().elapsed(TimerKey::StateChanged) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_self_transition_is_a_noop() {
        let mut r = rig();
        r.step(0.0);
        r.events.drain();
        r.step(0.1);
        let before = r.pursuer.timers().elapsed(TimerKey::StateChanged);
        let mut chase = Chase {
            vehicle: &mut r.vehicle,
            rng: &mut r.rng,
            events: &mut r.events,
        };
        r.pursuer.change_state(PursuerState::Spawning, &mut chase);
        assert_eq!(r.pursuer.timers().elapsed(TimerKey::StateChanged), before);
        assert!(!r.events.iter().any(|e| matches!(e, SimEvent::PursuerState { .. })));
    }

    #[test]
    fn test_follows_vehicle_into_new_lane() {
        let mut tuning = Tuning::default();
        // Keep the pursuer from screaming while the vehicle shares its lane
        tuning.pursuer.after_attack_cooldown = 1000.0;
        let mut r = Rig::new(&tuning);
        assert!(r.run_until(10.0, |r| r.pursuer.state() == PursuerState::Walking));

        r.vehicle.steer(Steer::Right, &mut r.events);
        assert!(r.run_until(3.0, |r| r.pursuer.state() == PursuerState::Following));
        assert!(r.pursuer.lanes().is_transitioning());

        assert!(r.run_until(1.0, |r| r.pursuer.state() == PursuerState::Walking));
        assert_eq!(r.pursuer.lane(), Lane::RIGHT);
        assert_eq!(r.vehicle.lane(), Lane::RIGHT);
    }

    #[test]
    fn test_walking_lets_a_skip_blend_finish() {
        let mut tuning = Tuning::default();
        tuning.pursuer.after_attack_cooldown = 1000.0;
        let lane_width = tuning.vehicle.lane_width;
        let mut r = Rig::new(&tuning);
        r.step(0.0);

        // Pursuer on the left lane, vehicle on the right
        r.pursuer.lanes.retarget(Lane::LEFT, &mut r.events);
        r.pursuer.lanes.advance(1.0, &mut r.events);
        r.vehicle.set_speed(r.vehicle.base_speed());
        assert!(r.vehicle.steer(Steer::Right, &mut r.events));
        r.vehicle.advance(r.frame, 1.0, &mut r.events);
        r.frame += 1;
        assert_eq!(r.vehicle.lane(), Lane::RIGHT);

        let mut chase = Chase {
            vehicle: &mut r.vehicle,
            rng: &mut r.rng,
            events: &mut r.events,
        };
        r.pursuer.change_state(PursuerState::Following, &mut chase);
        assert_eq!(r.pursuer.lanes().target_lane(), Some(Lane::RIGHT));

        // Following lasts one adjacent blend, shorter than the skip
        assert!(r.run_until(1.0, |r| r.pursuer.state() == PursuerState::Walking));
        assert!(r.pursuer.lanes().is_transitioning());
        assert_eq!(r.pursuer.lane(), Lane::RIGHT);

        assert!(r.run_until(0.5, |r| !r.pursuer.lanes().is_transitioning()));
        assert!((r.pursuer.position.x - Lane::RIGHT.lateral_offset(lane_width)).abs() < 1e-4);
    }

    #[test]
    fn test_pursuer_freezes_once_obstacles_end_the_run() {
        let mut r = rig();
        assert!(r.run_until(10.0, |r| r.pursuer.state() == PursuerState::Screaming));
        let cue = r
            .events
            .iter()
            .find_map(|e| match e {
                SimEvent::PlayCue {
                    handle,
                    attach: Some(Entity::Pursuer),
                    ..
                } => Some(*handle),
                _ => None,
            })
            .unwrap();

        r.vehicle.end_run(GameOverCause::Obstacles, &mut r.events);
        r.events.drain();
        let z = r.pursuer.position.z;
        for _ in 0..(30 * 60) {
            r.step(1.0 / 60.0);
        }
        assert_eq!(r.pursuer.state(), PursuerState::Screaming);
        assert_eq!(r.pursuer.position.z, z);
        assert!(r.events.is_empty());

        // Finished sounds are still released
        assert!(r.pursuer.notify_cue_complete(cue));
        r.step(1.0 / 60.0);
        assert_eq!(
            r.events.drain(),
            vec![SimEvent::DetachCue {
                handle: cue,
                entity: Entity::Pursuer
            }]
        );
    }

    #[test]
    fn test_full_attack_ends_in_game_over() {
        let mut r = rig();
        assert!(r.run_until(10.0, |r| r.pursuer.state() == PursuerState::Screaming));
        assert!(r.run_until(5.0, |r| r.pursuer.state() == PursuerState::Accelerating));
        r.step(1.0 / 60.0);
        assert!(r.pursuer.speed() > r.vehicle.speed());
        assert!(r.run_until(10.0, |r| r.pursuer.state() == PursuerState::Attacking));
        assert_eq!(r.vehicle.locked_lane(), Some(r.pursuer.lane()));

        assert!(r.run_until(5.0, |r| r.pursuer.state() == PursuerState::CaughtGameOver));
        assert!(r.pursuer.is_eating());
        assert_eq!(r.vehicle.speed(), 0.0);
        assert_eq!(r.vehicle.locked_lane(), None);

        // The eat sequence plays three times slower than authored
        assert!(r.run_until(20.0, |r| r.vehicle.is_game_over()));
        let events = r.events.drain();
        assert!(events.contains(&SimEvent::MoveCameraToAnchor {
            anchor: GAME_OVER_CAMERA_ANCHOR
        }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SimEvent::GameOver { cause: GameOverCause::Caught }))
                .count(),
            1
        );
        assert!(!r.pursuer.playback().is_playing());
        assert_eq!(r.pursuer.speed(), 0.0);
    }

    #[test]
    fn test_attack_without_fail_state_recovers() {
        let mut tuning = Tuning::default();
        tuning.pursuer.fail_state = false;
        let mut r = Rig::new(&tuning);
        assert!(r.run_until(30.0, |r| r.pursuer.state() == PursuerState::Recovering));
        assert!(!r.vehicle.is_game_over());
        r.step(1.0 / 60.0);
        assert!(r.pursuer.speed() < r.vehicle.speed());
        assert!(r.run_until(10.0, |r| r.pursuer.state() == PursuerState::Walking));
        assert!(r.pursuer.timers().elapsed(TimerKey::AttackEnded) > 0.0);
    }

    #[test]
    fn test_completed_cues_are_detached() {
        let mut r = rig();
        assert!(r.run_until(10.0, |r| r.pursuer.state() == PursuerState::Screaming));
        let handles: Vec<CueHandle> = r
            .events
            .iter()
            .filter_map(|e| match e {
                SimEvent::PlayCue {
                    handle,
                    attach: Some(Entity::Pursuer),
                    ..
                } => Some(*handle),
                _ => None,
            })
            .collect();
        assert!(!handles.is_empty());
        for handle in &handles {
            assert!(r.pursuer.notify_cue_complete(*handle));
        }
        r.events.drain();
        r.step(0.0);
        let detached = r
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::DetachCue { .. }))
            .count();
        assert_eq!(detached, handles.len());
    }

    proptest! {
        #[test]
        fn prop_state_clock_counts_since_last_transition(
            steps in prop::collection::vec(0.0f32..0.05, 1..240),
        ) {
            let mut r = rig();
            r.step(0.0);
            r.events.drain();
            let mut expected = 0.0f32;
            for dt in steps {
                r.step(dt);
                let transitioned = r
                    .events
                    .iter()
                    .any(|e| matches!(e, SimEvent::PursuerState { .. }));
                expected = if transitioned { 0.0 } else { expected + dt };
                let elapsed = r.pursuer.timers().elapsed(TimerKey::StateChanged);
                prop_assert!((elapsed - expected).abs() < 1e-3);
                r.events.drain();
                if r.vehicle.is_game_over() {
                    break;
                }
            }
        }
    }
}
