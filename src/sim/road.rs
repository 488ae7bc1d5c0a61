//! Road streaming
//!
//! A fixed pool of segments is created once. Segments move between a stock
//! set (parked below the road) and an ordered active sequence in front of
//! and behind the vehicle. Nothing is allocated or freed after start-up.

use std::collections::VecDeque;

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::events::{EventQueue, SimEvent};
use super::lane::Lane;
use super::picker::SamplePicker;
use crate::error::{Error, Result};
use crate::tuning::RoadTuning;

/// Where a segment currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Membership {
    Stock,
    Active,
}

/// One scenery prop instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prop {
    /// Index into the prop template list
    pub template: usize,
    /// Offset within the segment
    pub offset: Vec3,
    /// Mirrored to face the road from the right side
    pub flipped: bool,
}

/// Static decoration of a segment, authored once at pool creation
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scenery {
    pub left: Vec<Prop>,
    pub right: Vec<Prop>,
    /// Light well on the right side
    pub light_well: Option<Vec3>,
    /// Liana hanging on the left side
    pub liana: Option<Vec3>,
}

/// The obstacle embedded in a segment
#[derive(Debug, Clone, Serialize)]
pub struct Obstacle {
    /// Lateral side: -1, 0 or +1, with the sign of `lateral`
    ///
    /// This is the opposite sign convention to [`Lane::signed`].
    pub slot: i8,
    /// Lateral position (x)
    pub lateral: f32,
    /// Longitudinal offset within the segment
    pub offset_z: f32,
    pub visible: bool,
    /// Whole seconds spent hidden since the last hit
    pub recovery: Option<u32>,
    /// Index into the obstacle template list
    pub model: usize,
}

impl Obstacle {
    /// Lane the obstacle blocks
    pub fn lane(&self) -> Lane {
        Lane::from_lateral(self.lateral as i32)
    }
}

/// A recyclable piece of road
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    /// Pool slot (stable for the session)
    pub id: usize,
    pub position: Vec3,
    pub membership: Membership,
    pub obstacle: Obstacle,
    pub scenery: Scenery,
}

impl Segment {
    /// World z of the embedded obstacle
    pub fn obstacle_z(&self) -> f32 {
        self.position.z + self.obstacle.offset_z
    }
}

/// What one call to [`RoadStreamer::advance`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStep {
    /// The first segments were laid down
    Bootstrapped(usize),
    /// The back segment went to stock and a new front was activated
    Recycled { retired: usize, activated: usize },
    Idle,
}

/// Pool of road segments and the active sequence
#[derive(Debug, Clone)]
pub struct RoadStreamer {
    segments: Vec<Segment>,
    stock: Vec<usize>,
    /// Back (nearest the start) to front
    active: VecDeque<usize>,
    chunk_length: f32,
    front_view_distance: f32,
    bootstrap_chunks: usize,
    stock_depth: f32,
}

impl RoadStreamer {
    /// Build the pool; every segment starts in stock
    pub fn new(tuning: &RoadTuning, rng: &mut Pcg32) -> Result<Self> {
        if tuning.pool_size == 0 || tuning.bootstrap_chunks > tuning.pool_size {
            return Err(Error::config(
                "road.pool_size",
                format!(
                    "pool of {} cannot hold {} bootstrap segments",
                    tuning.pool_size, tuning.bootstrap_chunks
                ),
            ));
        }
        if tuning.obstacle_templates.is_empty() {
            return Err(Error::config("road.obstacle_templates", "template list is empty"));
        }

        let mut props = SamplePicker::new((0..tuning.prop_templates.len()).collect::<Vec<_>>());
        let lateral_step = tuning.road_width / 3.2;

        let mut segments = Vec::with_capacity(tuning.pool_size);
        for id in 0..tuning.pool_size {
            let slot = (id % 3) as i8 - 1;
            let obstacle = Obstacle {
                slot,
                lateral: slot as f32 * lateral_step,
                offset_z: tuning.chunk_length / 2.0,
                visible: true,
                recovery: None,
                model: rng.random_range(0..tuning.obstacle_templates.len()),
            };
            let scenery = author_scenery(tuning, &mut props, rng);
            segments.push(Segment {
                id,
                position: Vec3::new(0.0, tuning.stock_depth, 0.0),
                membership: Membership::Stock,
                obstacle,
                scenery,
            });
        }

        log::info!(
            "Road pool ready: {} segments of {}m",
            tuning.pool_size,
            tuning.chunk_length
        );
        Ok(Self {
            segments,
            stock: (0..tuning.pool_size).collect(),
            active: VecDeque::with_capacity(tuning.pool_size),
            chunk_length: tuning.chunk_length,
            front_view_distance: tuning.front_view_distance,
            bootstrap_chunks: tuning.bootstrap_chunks,
            stock_depth: tuning.stock_depth,
        })
    }

    /// Keep road ahead of `vehicle_z`; at most one recycle per call
    pub fn advance(&mut self, vehicle_z: f32, rng: &mut Pcg32, events: &mut EventQueue) -> StreamStep {
        if self.active.is_empty() {
            let mut added = 0;
            for _ in 0..self.bootstrap_chunks {
                if self.add_front(rng, events).is_some() {
                    added += 1;
                }
            }
            log::debug!("Road bootstrapped with {added} segments");
            return StreamStep::Bootstrapped(added);
        }

        let Some(front_z) = self.front_z() else {
            return StreamStep::Idle;
        };
        if vehicle_z + self.front_view_distance > front_z + self.chunk_length * 2.0 {
            let Some(retired) = self.remove_back(events) else {
                return StreamStep::Idle;
            };
            return match self.add_front(rng, events) {
                Some(activated) => StreamStep::Recycled { retired, activated },
                None => StreamStep::Idle,
            };
        }
        StreamStep::Idle
    }

    fn add_front(&mut self, rng: &mut Pcg32, events: &mut EventQueue) -> Option<usize> {
        if self.stock.is_empty() {
            log::warn!("Road stock exhausted");
            return None;
        }
        let front_z = self
            .front_z()
            .unwrap_or(-self.chunk_length * 4.0);
        let index = rng.random_range(0..self.stock.len());
        let id = self.stock.remove(index);

        let segment = &mut self.segments[id];
        segment.position = Vec3::new(0.0, 0.0, front_z + self.chunk_length);
        segment.membership = Membership::Active;
        self.active.push_back(id);
        events.push(SimEvent::SegmentMoved {
            segment: id,
            position: segment.position,
        });
        Some(id)
    }

    fn remove_back(&mut self, events: &mut EventQueue) -> Option<usize> {
        let id = self.active.pop_front()?;
        let segment = &mut self.segments[id];
        segment.position = Vec3::new(0.0, self.stock_depth, 0.0);
        segment.membership = Membership::Stock;
        self.stock.push(id);
        events.push(SimEvent::SegmentMoved {
            segment: id,
            position: segment.position,
        });
        Some(id)
    }

    pub fn front_z(&self) -> Option<f32> {
        self.active.back().map(|&id| self.segments[id].position.z)
    }

    pub fn back_z(&self) -> Option<f32> {
        self.active.front().map(|&id| self.segments[id].position.z)
    }

    pub fn pool_size(&self) -> usize {
        self.segments.len()
    }

    pub fn stock_len(&self) -> usize {
        self.stock.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Active segment ids, back to front
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.active.iter().copied()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, id: usize) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    /// Active segment whose obstacle sits at integer position `z`
    pub fn obstacle_at(&self, z: i32) -> Option<usize> {
        self.active
            .iter()
            .copied()
            .find(|&id| self.segments[id].obstacle_z() as i32 == z)
    }

    pub fn set_obstacle_visible(&mut self, id: usize, visible: bool, events: &mut EventQueue) {
        let Some(segment) = self.segments.get_mut(id) else {
            log::debug!("No segment {id} to toggle");
            return;
        };
        if segment.obstacle.visible != visible {
            segment.obstacle.visible = visible;
            events.push(SimEvent::ObstacleVisibility {
                segment: id,
                visible,
            });
        }
    }
}

fn author_scenery(tuning: &RoadTuning, props: &mut SamplePicker<usize>, rng: &mut Pcg32) -> Scenery {
    let spacing = tuning.chunk_length / tuning.props_per_side as f32;
    let mut side = |flipped: bool, rng: &mut Pcg32| -> Vec<Prop> {
        (0..tuning.props_per_side)
            .filter_map(|i| {
                props.next(rng).map(|&template| Prop {
                    template,
                    offset: Vec3::new(0.0, 0.0, i as f32 * spacing),
                    flipped,
                })
            })
            .collect()
    };
    let left = side(false, rng);
    let right = side(true, rng);

    let light_well = tuning.light_well.then(|| {
        Vec3::new(
            rng.random_range(0..5u32) as f32,
            0.0,
            rng.random_range(0..100u32) as f32,
        )
    });
    Scenery {
        left,
        right,
        light_well,
        liana: tuning.light_well.then_some(Vec3::new(0.0, -5.0, 0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn streamer(seed: u64) -> (RoadStreamer, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let road = RoadStreamer::new(&RoadTuning::default(), &mut rng).unwrap();
        (road, rng)
    }

    #[test]
    fn test_pool_starts_in_stock() {
        let (road, _) = streamer(1);
        assert_eq!(road.stock_len(), 10);
        assert_eq!(road.active_len(), 0);
        assert!(road
            .segments()
            .iter()
            .all(|s| s.position.y == crate::consts::STOCK_DEPTH));
    }

    #[test]
    fn test_bootstrap_larger_than_pool_is_rejected() {
        let mut rng = Pcg32::seed_from_u64(1);
        let tuning = RoadTuning {
            pool_size: 4,
            ..RoadTuning::default()
        };
        assert!(RoadStreamer::new(&tuning, &mut rng).is_err());
    }

    #[test]
    fn test_obstacle_slots_cycle_across_lanes() {
        let (road, _) = streamer(1);
        let lanes: Vec<Lane> = road.segments().iter().take(3).map(|s| s.obstacle.lane()).collect();
        // Slot -1 sits at negative x, which is the right-hand lane
        assert_eq!(lanes, vec![Lane::RIGHT, Lane::CENTER, Lane::LEFT]);
        assert!(road.segments().iter().all(|s| s.obstacle.offset_z == 25.0));
    }

    #[test]
    fn test_first_advance_bootstraps_without_recycling() {
        let (mut road, mut rng) = streamer(5);
        let mut events = EventQueue::default();
        // Far enough to satisfy the recycle condition, yet only bootstrap runs
        let step = road.advance(10.0, &mut rng, &mut events);
        assert_eq!(step, StreamStep::Bootstrapped(6));
        assert_eq!(road.active_len(), 6);
        assert_eq!(road.stock_len(), 4);
        assert_eq!(road.back_z(), Some(-150.0));
        assert_eq!(road.front_z(), Some(100.0));
    }

    #[test]
    fn test_recycle_moves_back_segment_to_front() {
        let (mut road, mut rng) = streamer(5);
        let mut events = EventQueue::default();
        road.advance(0.0, &mut rng, &mut events);
        assert_eq!(road.advance(0.0, &mut rng, &mut events), StreamStep::Idle);

        let step = road.advance(1.0, &mut rng, &mut events);
        let StreamStep::Recycled { retired, activated } = step else {
            panic!("expected a recycle, got {step:?}");
        };
        assert_eq!(road.segment(retired).unwrap().membership, Membership::Stock);
        assert_eq!(road.segment(activated).unwrap().position.z, 150.0);
        assert_eq!(road.back_z(), Some(-100.0));
    }

    #[test]
    fn test_obstacle_lookup_uses_world_position() {
        let (mut road, mut rng) = streamer(9);
        let mut events = EventQueue::default();
        road.advance(0.0, &mut rng, &mut events);
        let id = road.obstacle_at(75).unwrap();
        assert_eq!(road.segment(id).unwrap().position.z, 50.0);
        assert!(road.obstacle_at(76).is_none());
    }

    #[test]
    fn test_visibility_toggle_emits_once() {
        let (mut road, _) = streamer(2);
        let mut events = EventQueue::default();
        road.set_obstacle_visible(0, false, &mut events);
        road.set_obstacle_visible(0, false, &mut events);
        assert_eq!(events.len(), 1);
        assert!(!road.segment(0).unwrap().obstacle.visible);
    }

    #[test]
    fn test_scenery_never_repeats_neighbouring_props() {
        let (road, _) = streamer(3);
        for segment in road.segments() {
            assert_eq!(segment.scenery.left.len(), 5);
            assert!(segment.scenery.right.iter().all(|p| p.flipped));
            for pair in segment.scenery.left.windows(2) {
                assert_ne!(pair[0].template, pair[1].template);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_pool_is_partitioned(
            seed in any::<u64>(),
            steps in prop::collection::vec(0.0f32..40.0, 1..200),
        ) {
            let (mut road, mut rng) = streamer(seed);
            let mut events = EventQueue::default();
            let mut z = 0.0;
            for dz in steps {
                z += dz;
                road.advance(z, &mut rng, &mut events);
                prop_assert_eq!(road.stock_len() + road.active_len(), road.pool_size());

                let active: Vec<f32> = road.active().map(|id| road.segments()[id].position.z).collect();
                for pair in active.windows(2) {
                    prop_assert_eq!(pair[1] - pair[0], 50.0);
                }
                for segment in road.segments() {
                    let in_active = road.active().any(|id| id == segment.id);
                    prop_assert_eq!(in_active, segment.membership == Membership::Active);
                }
            }
        }
    }
}
