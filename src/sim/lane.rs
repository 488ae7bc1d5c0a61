//! Lanes and lane-change blending
//!
//! The discrete lane is an index 0..=2. Lane 0 sits at `+lane_width` on the
//! x axis, lane 2 at `-lane_width`; [`Lane::signed`] gives -1/0/+1 and is the
//! only place the index/offset conversion is defined.
//!
//! A lane change plays a window of an authored timeline. Each window has a
//! `_start`, a mid and an `_end` label; the discrete lane flips on the mid
//! label while the lateral offset blends continuously over the window.

use serde::{Deserialize, Serialize};

use super::events::{Entity, EventQueue, SimEvent};
use super::timeline::{Playback, Timeline, Window};
use crate::consts::NUM_LANES;
use crate::error::{Error, Result};
use crate::lerp;

/// One of the three driving lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lane(u8);

impl Lane {
    pub const LEFT: Lane = Lane(0);
    pub const CENTER: Lane = Lane(1);
    pub const RIGHT: Lane = Lane(2);

    pub const ALL: [Lane; NUM_LANES as usize] = [Lane::LEFT, Lane::CENTER, Lane::RIGHT];

    pub fn new(index: u8) -> Option<Lane> {
        (index < NUM_LANES).then_some(Lane(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// -1 for the left lane, 0 for the centre, +1 for the right lane
    pub fn signed(self) -> i8 {
        self.0 as i8 - 1
    }

    /// Lateral (x) position of the lane centre
    pub fn lateral_offset(self, lane_width: f32) -> f32 {
        -(self.signed() as f32) * lane_width
    }

    /// Lane on the same side of the centreline as a lateral position
    pub fn from_lateral(x: i32) -> Lane {
        match x.signum() {
            1 => Lane::LEFT,
            -1 => Lane::RIGHT,
            _ => Lane::CENTER,
        }
    }

    /// Neighbouring lane `delta` steps away, if it exists
    pub fn step(self, delta: i8) -> Option<Lane> {
        let index = self.0 as i8 + delta;
        u8::try_from(index).ok().and_then(Lane::new)
    }

    /// Number of lanes between `self` and `other`
    pub fn distance(self, other: Lane) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl Default for Lane {
    fn default() -> Self {
        Lane::CENTER
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which lane pairs an entity can blend between in one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneReach {
    /// Only neighbouring lanes (the vehicle)
    Adjacent,
    /// Any two lanes, skipping one with a dedicated longer blend (the pursuer)
    Any,
}

impl LaneReach {
    fn pairs(self) -> Vec<(Lane, Lane)> {
        let mut pairs = vec![
            (Lane::CENTER, Lane::LEFT),
            (Lane::LEFT, Lane::CENTER),
            (Lane::CENTER, Lane::RIGHT),
            (Lane::RIGHT, Lane::CENTER),
        ];
        if self == LaneReach::Any {
            pairs.insert(1, (Lane::LEFT, Lane::RIGHT));
            pairs.insert(2, (Lane::RIGHT, Lane::LEFT));
        }
        pairs
    }
}

fn transition_name(from: Lane, to: Lane) -> String {
    format!("{from}to{to}")
}

/// Author a lane timeline laying out one window per reachable pair
///
/// Adjacent windows last `change_ms`, two-lane windows `skip_ms`.
pub fn author_lane_timeline(
    name: &'static str,
    reach: LaneReach,
    change_ms: u32,
    skip_ms: u32,
) -> Timeline {
    let mut labels = Vec::new();
    let mut cursor = 0;
    for (from, to) in reach.pairs() {
        let duration = if from.distance(to) > 1 { skip_ms } else { change_ms };
        let base = transition_name(from, to);
        labels.push((format!("{base}_start"), cursor));
        labels.push((base.clone(), cursor + duration / 2));
        labels.push((format!("{base}_end"), cursor + duration));
        cursor += duration;
    }
    Timeline::new(name, labels)
}

/// One authored lane-change window
#[derive(Debug, Clone)]
pub struct LaneTransition {
    pub from: Lane,
    pub to: Lane,
    pub start_label: String,
    pub mid_label: String,
    pub end_label: String,
    pub window: Window,
}

impl LaneTransition {
    pub fn duration_secs(&self) -> f32 {
        self.window.duration_ms() as f32 / 1000.0
    }
}

/// `(from, to) -> window` table, validated once when built
#[derive(Debug, Clone)]
pub struct LaneTransitionTable {
    transitions: Vec<LaneTransition>,
}

impl LaneTransitionTable {
    /// Resolve every pair within `reach`; a missing label is fatal
    pub fn from_timeline(timeline: &Timeline, reach: LaneReach) -> Result<Self> {
        let mut transitions = Vec::new();
        for (from, to) in reach.pairs() {
            let base = transition_name(from, to);
            let start_label = format!("{base}_start");
            let end_label = format!("{base}_end");
            let window = timeline.window(&start_label, &end_label)?;
            let mid = timeline.label(&base)?;
            if mid <= window.start || mid >= window.end {
                return Err(Error::config(
                    "lane timeline",
                    format!("midpoint `{base}` lies outside its window"),
                ));
            }
            transitions.push(LaneTransition {
                from,
                to,
                start_label,
                mid_label: base,
                end_label,
                window,
            });
        }
        Ok(Self { transitions })
    }

    pub fn get(&self, from: Lane, to: Lane) -> Option<&LaneTransition> {
        self.transitions.iter().find(|t| t.from == from && t.to == to)
    }
}

/// Authored yaw at a blend midpoint (radians)
const ADJACENT_PEAK_YAW: f32 = std::f32::consts::FRAC_PI_4 / 5.5;
const SKIP_PEAK_YAW: f32 = std::f32::consts::FRAC_PI_4 / 2.0;

/// Discrete lane plus the blend that moves an entity between lanes
#[derive(Debug, Clone)]
pub struct LaneAnimator {
    entity: Entity,
    timeline: Timeline,
    table: LaneTransitionTable,
    playback: Playback,
    lane: Lane,
    in_flight: Option<(Lane, Lane)>,
    lane_width: f32,
}

impl LaneAnimator {
    pub fn new(
        entity: Entity,
        timeline: Timeline,
        reach: LaneReach,
        lane_width: f32,
    ) -> Result<Self> {
        let table = LaneTransitionTable::from_timeline(&timeline, reach)?;
        Ok(Self {
            entity,
            timeline,
            table,
            playback: Playback::default(),
            lane: Lane::CENTER,
            in_flight: None,
            lane_width,
        })
    }

    /// Departure lane until the blend midpoint, destination afterwards
    pub fn current_lane(&self) -> Lane {
        self.lane
    }

    pub fn is_transitioning(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Destination of the in-flight blend
    pub fn target_lane(&self) -> Option<Lane> {
        self.in_flight.map(|(_, to)| to)
    }

    pub fn transition(&self, from: Lane, to: Lane) -> Option<&LaneTransition> {
        self.table.get(from, to)
    }

    /// Start a blend to `target` unless one is in flight or `target` is
    /// the current or the locked lane
    pub fn request_lane_change(
        &mut self,
        target: Lane,
        locked: Option<Lane>,
        events: &mut EventQueue,
    ) -> bool {
        if target == self.lane || self.is_transitioning() || locked == Some(target) {
            return false;
        }
        self.start(target, events)
    }

    /// Cancel any in-flight blend and head for `target`
    pub fn retarget(&mut self, target: Lane, events: &mut EventQueue) -> bool {
        if self.in_flight.take().is_some() {
            self.playback.stop();
        }
        if target == self.lane {
            return false;
        }
        self.start(target, events)
    }

    fn start(&mut self, target: Lane, events: &mut EventQueue) -> bool {
        let Some(transition) = self.table.get(self.lane, target) else {
            log::debug!("{:?}: no blend from lane {} to {}", self.entity, self.lane, target);
            return false;
        };
        self.playback.play_window(transition.window, false);
        self.in_flight = Some((self.lane, target));
        events.push(SimEvent::LaneBlend {
            entity: self.entity,
            from: self.lane,
            to: target,
            start: transition.start_label.clone(),
            end: transition.end_label.clone(),
        });
        true
    }

    /// Advance the blend; returns the new lane when the midpoint is crossed
    pub fn advance(&mut self, dt: f32, events: &mut EventQueue) -> Option<Lane> {
        let (from, to) = self.in_flight?;
        let hits = self.playback.advance(&self.timeline, dt);
        let transition = self.table.get(from, to)?;

        let mut changed = None;
        for label in &hits {
            if *label == transition.mid_label && self.lane != to {
                self.lane = to;
                changed = Some(to);
                log::debug!("{:?} on lane {}", self.entity, to);
                events.push(SimEvent::LaneChanged {
                    entity: self.entity,
                    lane: to,
                });
            } else if *label == transition.end_label {
                self.in_flight = None;
            }
        }
        changed
    }

    /// Continuous lateral position of the entity
    pub fn lateral_offset(&self) -> f32 {
        match self.in_flight {
            Some((from, to)) => lerp(
                from.lateral_offset(self.lane_width),
                to.lateral_offset(self.lane_width),
                self.playback.progress(),
            ),
            None => self.lane.lateral_offset(self.lane_width),
        }
    }

    /// Heading offset while blending, peaking at the midpoint
    pub fn yaw(&self) -> f32 {
        let Some((from, to)) = self.in_flight else {
            return 0.0;
        };
        let peak = if from.distance(to) > 1 {
            SKIP_PEAK_YAW
        } else {
            ADJACENT_PEAK_YAW
        };
        // Moving towards higher lane indices turns the nose to -x
        let direction = if to > from { -1.0 } else { 1.0 };
        let p = self.playback.progress();
        direction * peak * (1.0 - (2.0 * p - 1.0).abs())
    }
}
