//! Viewer state shared between collaborating peers.

mod compare;
mod display;
mod reel;

pub use compare::{Background, CompareSettings, Wipe};
pub use display::{DisplaySettings, ViewSettings};
pub use reel::{ColorTransforms, Media, Reel, Shape};

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::Rejection;

/// Transport state of the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Playback {
    #[default]
    Stopped,
    Forwards,
    Backwards,
}

impl Playback {
    pub fn command_name(self) -> &'static str {
        match self {
            Playback::Stopped => "stop",
            Playback::Forwards => "playfwd",
            Playback::Backwards => "playback",
        }
    }
}

/// Rectangle in normalized image coordinates (0.0 - 1.0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// True when the rectangle lies within the unit square.
    pub fn is_normalized(&self) -> bool {
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        unit(self.x)
            && unit(self.y)
            && unit(self.w)
            && unit(self.h)
            && self.x + self.w <= 1.0
            && self.y + self.h <= 1.0
    }
}

/// Frame bounds the timeline is limited to. `None` follows the media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Everything a freshly connected peer needs to reproduce this viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub reels: Vec<Reel>,
    /// Index into `reels`. `None` only while there are no reels.
    pub current_reel: Option<usize>,
    pub frame: i64,
    pub timeline: TimelineRange,
    pub playback: Playback,
    pub display: DisplaySettings,
    pub view: ViewSettings,
    pub compare: CompareSettings,
}

impl Default for ViewerSnapshot {
    fn default() -> Self {
        Self {
            reels: Vec::new(),
            current_reel: None,
            frame: 1,
            timeline: TimelineRange::default(),
            playback: Playback::default(),
            display: DisplaySettings::default(),
            view: ViewSettings::default(),
            compare: CompareSettings::default(),
        }
    }
}

impl ViewerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reel(&self) -> Option<&Reel> {
        self.current_reel.and_then(|i| self.reels.get(i))
    }

    pub fn reel_mut(&mut self) -> Option<&mut Reel> {
        match self.current_reel {
            Some(i) => self.reels.get_mut(i),
            None => None,
        }
    }

    /// Media list of the current reel.
    pub fn images(&self) -> &[Media] {
        self.reel().map(|r| r.media.as_slice()).unwrap_or(&[])
    }

    /// The selected media of the current reel.
    pub fn current_image(&self) -> Option<&Media> {
        self.reel().and_then(Reel::current_media)
    }

    pub fn current_image_mut(&mut self) -> Option<&mut Media> {
        self.reel_mut().and_then(Reel::current_media_mut)
    }

    pub fn reel_index(&self, name: &str) -> Option<usize> {
        self.reels.iter().position(|r| r.name == name)
    }
}

/// The viewer as seen by the protocol core.
///
/// Implemented by the in-memory [`crate::Viewer`]; a GUI front end would
/// implement it over its own widgets.
pub trait ViewerState {
    /// Copy of the current shared state.
    fn snapshot(&self) -> ViewerSnapshot;

    /// Apply one state-mutating command.
    fn apply(&mut self, command: &Command) -> Result<(), Rejection>;
}
