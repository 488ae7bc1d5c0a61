//! Outbound commands for the presentation layer
//!
//! The simulation never calls renderers, mixers or animation players. It
//! queues fire-and-forget [`SimEvent`]s that the host drains after each tick.

use glam::Vec3;
use serde::Serialize;

use super::lane::Lane;
use super::pursuer::PursuerState;

/// Entities that own animations and positional sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Entity {
    Vehicle,
    Pursuer,
}

/// Identifies one playing sound so the host can report its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CueHandle(pub u32);

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameOverCause {
    /// Too many obstacle hits
    Obstacles,
    /// The pursuer caught the vehicle
    Caught,
    /// The player quit
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    /// Play the skinned clip between two labels
    PlayWindow {
        entity: Entity,
        start: String,
        end: String,
        looping: bool,
    },
    /// Stop the skinned clip
    StopAnimation { entity: Entity },
    /// Remap the clip clock (1.0 = authored speed)
    AnimationRate { entity: Entity, rate: f32 },
    /// A lane blend window started playing
    LaneBlend {
        entity: Entity,
        from: Lane,
        to: Lane,
        start: String,
        end: String,
    },
    /// Discrete lane flipped at a blend midpoint
    LaneChanged { entity: Entity, lane: Lane },
    /// Play a sound, optionally attached to an entity
    PlayCue {
        handle: CueHandle,
        sample: String,
        looping: bool,
        volume: f32,
        attach: Option<Entity>,
    },
    /// Remove a finished positional sound from its entity
    DetachCue { handle: CueHandle, entity: Entity },
    /// Show or hide an obstacle's geometry
    ObstacleVisibility { segment: usize, visible: bool },
    /// A road segment was relocated
    SegmentMoved { segment: usize, position: Vec3 },
    /// Reparent the camera to a named anchor in the scene
    MoveCameraToAnchor { anchor: &'static str },
    /// The pursuer changed behaviour
    PursuerState { from: PursuerState, to: PursuerState },
    GameOver { cause: GameOverCause },
}

/// Per-tick event buffer with cue handle allocation
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<SimEvent>,
    next_cue: u32,
}

impl EventQueue {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Queue a sound and return its handle
    pub fn play_cue(
        &mut self,
        sample: &str,
        looping: bool,
        volume: f32,
        attach: Option<Entity>,
    ) -> CueHandle {
        let handle = CueHandle(self.next_cue);
        self.next_cue = self.next_cue.wrapping_add(1);
        self.events.push(SimEvent::PlayCue {
            handle,
            sample: sample.to_string(),
            looping,
            volume,
            attach,
        });
        handle
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A positional sound attached to an entity until the host reports it done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCue {
    pub handle: CueHandle,
    pub entity: Entity,
}

/// Sounds currently attached to one entity
///
/// Completion reports are collected first and applied by the owner's
/// update, which detaches the matching cues.
#[derive(Debug, Clone, Default)]
pub struct CueAttachments {
    active: Vec<ActiveCue>,
    completed: Vec<CueHandle>,
}

impl CueAttachments {
    pub fn attach(&mut self, handle: CueHandle, entity: Entity) {
        self.active.push(ActiveCue { handle, entity });
    }

    /// Record that the host finished playing `handle`
    pub fn complete(&mut self, handle: CueHandle) -> bool {
        if self.active.iter().any(|c| c.handle == handle) {
            self.completed.push(handle);
            true
        } else {
            false
        }
    }

    /// Detach every cue whose completion was observed
    pub fn sweep(&mut self, events: &mut EventQueue) {
        if self.completed.is_empty() {
            return;
        }
        let completed = std::mem::take(&mut self.completed);
        self.active.retain(|cue| {
            if completed.contains(&cue.handle) {
                events.push(SimEvent::DetachCue {
                    handle: cue.handle,
                    entity: cue.entity,
                });
                false
            } else {
                true
            }
        });
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_detached_on_sweep_after_completion() {
        let mut events = EventQueue::default();
        let mut cues = CueAttachments::default();
        let handle = events.play_cue("sound/x.ogg", false, 1.0, Some(Entity::Pursuer));
        cues.attach(handle, Entity::Pursuer);
        events.drain();

        assert!(cues.complete(handle));
        assert_eq!(cues.len(), 1);
        cues.sweep(&mut events);
        assert!(cues.is_empty());
        assert_eq!(
            events.drain(),
            vec![SimEvent::DetachCue {
                handle,
                entity: Entity::Pursuer
            }]
        );
    }

    #[test]
    fn test_unknown_completion_ignored() {
        let mut cues = CueAttachments::default();
        assert!(!cues.complete(CueHandle(99)));
    }

    #[test]
    fn test_handles_are_unique() {
        let mut events = EventQueue::default();
        let a = events.play_cue("a", false, 1.0, None);
        let b = events.play_cue("b", false, 1.0, None);
        assert_ne!(a, b);
        assert_eq!(events.len(), 2);
    }
}
