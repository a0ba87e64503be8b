//! Reels and the media they contain.

use serde::{Deserialize, Serialize};

use crate::command::{Command, EraseStroke, MediaRef, PathStroke, TextAnnotation};

/// An annotation drawn over a media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Stroke(PathStroke),
    Erase(EraseStroke),
    Text(TextAnnotation),
}

impl Shape {
    /// The command that recreates this shape on a peer.
    pub fn to_command(&self) -> Command {
        match self {
            Shape::Stroke(s) => Command::PathShape(s.clone()),
            Shape::Erase(e) => Command::ErasePathShape(e.clone()),
            Shape::Text(t) => Command::TextShape(t.clone()),
        }
    }
}

/// Per-media color pipeline, by transform name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTransforms {
    /// Input color space
    pub ics: Option<String>,
    pub idt: Option<String>,
    /// Look modification transforms, applied in order
    pub lmts: Vec<String>,
    pub rt: Option<String>,
}

impl ColorTransforms {
    pub fn is_empty(&self) -> bool {
        self.ics.is_none() && self.idt.is_none() && self.lmts.is_empty() && self.rt.is_none()
    }

    /// Commands that rebuild this pipeline on the selected media.
    pub fn to_commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(ics) = &self.ics {
            commands.push(Command::Ics(ics.clone()));
        }
        if let Some(idt) = &self.idt {
            commands.push(Command::Idt(idt.clone()));
        }
        commands.extend(self.lmts.iter().enumerate().map(|(index, name)| Command::Lmt {
            index,
            name: name.clone(),
        }));
        if let Some(rt) = &self.rt {
            commands.push(Command::Rt(rt.clone()));
        }
        commands
    }
}

/// A media item: an image sequence or movie with its frame range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub path: String,
    pub first: i64,
    pub last: i64,
    pub shapes: Vec<Shape>,
    pub color: ColorTransforms,
    /// Audio track offset in frames
    pub audio_offset: i64,
}

impl Media {
    pub fn new(path: impl Into<String>, first: i64, last: i64) -> Self {
        Self {
            path: path.into(),
            first,
            last,
            shapes: Vec::new(),
            color: ColorTransforms::default(),
            audio_offset: 0,
        }
    }

    pub fn media_ref(&self) -> MediaRef {
        MediaRef::new(self.path.clone(), self.first, self.last)
    }
}

/// A named, ordered list of media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reel {
    pub name: String,
    pub media: Vec<Media>,
    /// Index of the selected media. `None` only while the reel is empty.
    pub current: Option<usize>,
    /// Play the reel as one concatenated timeline
    pub edl: bool,
}

impl Reel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media: Vec::new(),
            current: None,
            edl: false,
        }
    }

    pub fn position(&self, path: &str) -> Option<usize> {
        self.media.iter().position(|m| m.path == path)
    }

    pub fn current_media(&self) -> Option<&Media> {
        self.current.and_then(|i| self.media.get(i))
    }

    pub fn current_media_mut(&mut self) -> Option<&mut Media> {
        match self.current {
            Some(i) => self.media.get_mut(i),
            None => None,
        }
    }
}
