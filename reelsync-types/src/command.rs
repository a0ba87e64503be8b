//! Command types for the sync protocol.
//!
//! Every command fully specifies its effect so that replaying it leaves the
//! viewer unchanged, with the exception of the delta-based variants listed in
//! [`Command::is_idempotent`].

use serde::{Deserialize, Serialize};

use crate::state::{Playback, Rect, Wipe};

/// How playback behaves when it reaches the end of the frame range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopMode {
    NoLoop,
    #[default]
    Loop,
    PingPong,
}

impl LoopMode {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(LoopMode::NoLoop),
            1 => Some(LoopMode::Loop),
            2 => Some(LoopMode::PingPong),
            _ => None,
        }
    }

    pub fn index(self) -> i64 {
        match self {
            LoopMode::NoLoop => 0,
            LoopMode::Loop => 1,
            LoopMode::PingPong => 2,
        }
    }
}

/// A 2D point in image space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A painted annotation stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStroke {
    /// RGBA, each channel 0.0 - 1.0
    pub color: [f32; 4],
    pub pen_size: f32,
    pub frame: i64,
    pub points: Vec<Point>,
}

/// An eraser stroke. Stored like a paint stroke so undo treats both alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraseStroke {
    pub pen_size: f32,
    pub frame: i64,
    pub points: Vec<Point>,
}

/// A text note placed at one point of the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub font: String,
    pub text: String,
    pub size: u32,
    pub color: [f32; 4],
    pub frame: i64,
    pub position: Point,
}

impl TextAnnotation {
    /// Same note, style and frame, wherever it is placed.
    pub fn same_content(&self, other: &TextAnnotation) -> bool {
        self.font == other.font
            && self.text == other.text
            && self.size == other.size
            && self.color == other.color
            && self.frame == other.frame
    }
}

/// A media item named by path and frame range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub path: String,
    pub first: i64,
    pub last: i64,
}

impl MediaRef {
    pub fn new(path: impl Into<String>, first: i64, last: i64) -> Self {
        Self {
            path: path.into(),
            first,
            last,
        }
    }
}

/// Trim adjustment for one media item, addressed by reel index and path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaShift {
    pub reel: usize,
    pub path: String,
    pub delta: i64,
}

/// A single protocol command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // Playback position and rate
    Seek(i64),
    TimelineMin(i64),
    TimelineMax(i64),
    Fps(f64),
    Looping(LoopMode),
    Playback(Playback),

    // Display transform
    Gain(f32),
    Gamma(f32),
    Channel(u16),
    UseLut(bool),
    SafeAreas(bool),
    ShowPixelRatio(bool),
    Normalize(bool),
    DisplayWindow(bool),
    DataWindow(bool),
    Mask(f32),
    Volume(f32),
    OcioView { display: String, view: String },

    // Per-media color pipeline, applied to the selected media
    Ics(String),
    Idt(String),
    Lmt { index: usize, name: String },
    Rt(String),

    // View
    Zoom(f32),
    Offset { x: f64, y: f64 },
    Rotation { x: f64, y: f64 },
    Selection(Rect),

    // Reels and media
    Edl(bool),
    CurrentReel(String),
    Image(MediaRef),
    CurrentImage(MediaRef),
    ChangeImage(usize),
    InsertImage { index: usize, path: String },
    RemoveImage { index: usize, path: String },
    ReplaceImage { index: usize, path: String },
    ExchangeImage { from: usize, to: usize },
    CloneImage(String),
    ShiftMediaStart(MediaShift),
    ShiftMediaEnd(MediaShift),
    ShiftAudio(MediaShift),

    // Foreground/background compare
    FgReel(usize),
    /// `None` clears the background reel
    BgReel(Option<usize>),
    /// `None` clears the background image
    CurrentBgImage(Option<MediaRef>),
    ShowBg(bool),
    Wipe(Wipe),

    // Annotations
    PathShape(PathStroke),
    ErasePathShape(EraseStroke),
    TextShape(TextAnnotation),
    UndoDraw,
    RedoDraw,

    /// Request for a full state replay. Never mutates state.
    SyncImage,
}

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Seek(_) => "seek",
            Command::TimelineMin(_) => "TimelineMin",
            Command::TimelineMax(_) => "TimelineMax",
            Command::Fps(_) => "FPS",
            Command::Looping(_) => "Looping",
            Command::Playback(p) => p.command_name(),
            Command::Gain(_) => "Gain",
            Command::Gamma(_) => "Gamma",
            Command::Channel(_) => "Channel",
            Command::UseLut(_) => "UseLUT",
            Command::SafeAreas(_) => "SafeAreas",
            Command::ShowPixelRatio(_) => "ShowPixelRatio",
            Command::Normalize(_) => "Normalize",
            Command::DisplayWindow(_) => "DisplayWindow",
            Command::DataWindow(_) => "DataWindow",
            Command::Mask(_) => "Mask",
            Command::Volume(_) => "Volume",
            Command::OcioView { .. } => "OCIOView",
            Command::Ics(_) => "ICS",
            Command::Idt(_) => "IDT",
            Command::Lmt { .. } => "LMT",
            Command::Rt(_) => "RT",
            Command::Zoom(_) => "Zoom",
            Command::Offset { .. } => "Offset",
            Command::Rotation { .. } => "Rotation",
            Command::Selection(_) => "Selection",
            Command::Edl(_) => "EDL",
            Command::CurrentReel(_) => "CurrentReel",
            Command::Image(_) => "Image",
            Command::CurrentImage(_) => "CurrentImage",
            Command::ChangeImage(_) => "ChangeImage",
            Command::InsertImage { .. } => "InsertImage",
            Command::RemoveImage { .. } => "RemoveImage",
            Command::ReplaceImage { .. } => "ReplaceImage",
            Command::ExchangeImage { .. } => "ExchangeImage",
            Command::CloneImage(_) => "CloneImage",
            Command::ShiftMediaStart(_) => "ShiftMediaStart",
            Command::ShiftMediaEnd(_) => "ShiftMediaEnd",
            Command::ShiftAudio(_) => "ShiftAudio",
            Command::FgReel(_) => "FGReel",
            Command::BgReel(_) => "BGReel",
            Command::CurrentBgImage(_) => "CurrentBGImage",
            Command::ShowBg(_) => "ShowBG",
            Command::Wipe(w) => w.command_name(),
            Command::PathShape(_) => "GLPathShape",
            Command::ErasePathShape(_) => "GLErasePathShape",
            Command::TextShape(_) => "GLTextShape",
            Command::UndoDraw => "UndoDraw",
            Command::RedoDraw => "RedoDraw",
            Command::SyncImage => "sync_image",
        }
    }

    /// Whether applying this command changes shared viewer state and so must
    /// be rebroadcast to the other peers.
    pub fn is_state_mutating(&self) -> bool {
        !matches!(self, Command::SyncImage)
    }

    /// Whether applying the command twice leaves the same state as applying
    /// it once.
    ///
    /// Trim and audio shifts are deltas, exchange and clone are relative to
    /// the current order, and undo/redo walk a stack, so a duplicated or
    /// reordered delivery of these changes the outcome.
    pub fn is_idempotent(&self) -> bool {
        !matches!(
            self,
            Command::ShiftMediaStart(_)
                | Command::ShiftMediaEnd(_)
                | Command::ShiftAudio(_)
                | Command::ExchangeImage { .. }
                | Command::CloneImage(_)
                | Command::UndoDraw
                | Command::RedoDraw
        )
    }
}
