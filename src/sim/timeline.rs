//! Labelled animation timelines
//!
//! A timeline is a set of named instants (milliseconds). A [`Playback`]
//! plays a window between two labels and reports every label it crosses,
//! which is how the simulation learns that a scream or an attack finished.

use crate::error::{Error, Result};

/// Named instants of one authored clip, sorted by time
#[derive(Debug, Clone)]
pub struct Timeline {
    name: &'static str,
    labels: Vec<(String, u32)>,
}

impl Timeline {
    pub fn new(name: &'static str, labels: impl IntoIterator<Item = (String, u32)>) -> Self {
        let mut labels: Vec<_> = labels.into_iter().collect();
        labels.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Self { name, labels }
    }

    /// Time of a label, or a configuration error if the clip lacks it
    pub fn label(&self, label: &str) -> Result<u32> {
        self.labels
            .iter()
            .find(|(name, _)| name == label)
            .map(|&(_, ms)| ms)
            .ok_or_else(|| Error::MissingLabel {
                clip: self.name,
                label: label.to_string(),
            })
    }

    /// Resolve a playback window between two labels
    pub fn window(&self, start: &str, end: &str) -> Result<Window> {
        let start_ms = self.label(start)?;
        let end_ms = self.label(end)?;
        if end_ms <= start_ms {
            return Err(Error::config(
                "clip window",
                format!("`{start}` must precede `{end}` in `{}`", self.name),
            ));
        }
        Ok(Window {
            start: start_ms,
            end: end_ms,
        })
    }

    /// Labels with `from < t <= to`, in time order
    fn hits_between(&self, from: f32, to: f32, out: &mut Vec<String>) {
        for (name, ms) in &self.labels {
            let t = *ms as f32;
            if t > from && t <= to {
                out.push(name.clone());
            }
        }
    }

    /// Labels at exactly `t`
    fn hits_at(&self, t: u32, out: &mut Vec<String>) {
        for (name, ms) in &self.labels {
            if *ms == t {
                out.push(name.clone());
            }
        }
    }
}

/// A playable span of a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u32,
    pub end: u32,
}

impl Window {
    pub fn duration_ms(&self) -> u32 {
        self.end - self.start
    }
}

/// Playhead over a [`Timeline`]
#[derive(Debug, Clone)]
pub struct Playback {
    window: Option<Window>,
    /// Current time (ms)
    position: f32,
    playing: bool,
    looping: bool,
    /// Playback rate multiplier (1.0 = authored speed)
    rate: f32,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            window: None,
            position: 0.0,
            playing: false,
            looping: false,
            rate: 1.0,
        }
    }
}

impl Playback {
    /// Select a window, seek to its start and play
    pub fn play_window(&mut self, window: Window, looping: bool) {
        self.window = Some(window);
        self.looping = looping;
        self.position = window.start as f32;
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// Fraction of the window played so far
    pub fn progress(&self) -> f32 {
        match self.window {
            Some(w) => ((self.position - w.start as f32) / w.duration_ms() as f32).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    /// Advance by `dt` seconds, returning the labels crossed in order
    ///
    /// A non-looping window stops on its end label. A looping window wraps
    /// and reports labels sitting on its start instant when it does.
    pub fn advance(&mut self, timeline: &Timeline, dt: f32) -> Vec<String> {
        let mut hits = Vec::new();
        let Some(window) = self.window else {
            return hits;
        };
        if !self.playing || dt <= 0.0 {
            return hits;
        }

        let end = window.end as f32;
        let mut remaining = dt * 1000.0 * self.rate;
        while remaining > 0.0 {
            let target = self.position + remaining;
            if target < end {
                timeline.hits_between(self.position, target, &mut hits);
                self.position = target;
                break;
            }

            timeline.hits_between(self.position, end, &mut hits);
            remaining = target - end;
            if !self.looping {
                self.position = end;
                self.playing = false;
                break;
            }
            self.position = window.start as f32;
            timeline.hits_at(window.start, &mut hits);
            if remaining <= 0.0 {
                break;
            }
        }
        hits
    }
}
