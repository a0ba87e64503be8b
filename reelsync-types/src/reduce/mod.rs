//! Pure state-mutation reducers for the viewer.
//!
//! These functions are the single source of truth for command → state
//! mutations. The in-memory [`crate::Viewer`] calls into this module, and so
//! does anything replaying a sync script.
//!
//! Reducers validate before they mutate: a rejected command leaves the state
//! untouched.

mod annotation;
mod color;
mod compare;
mod display;
mod reel;

use std::collections::HashMap;

use crate::{Command, Rejection, Shape, ViewerSnapshot};

/// Shapes popped by `UndoDraw`, keyed by media path.
pub type RedoStacks = HashMap<String, Vec<Shape>>;

/// Apply a command's state mutations to the given state.
pub fn reduce(
    command: &Command,
    state: &mut ViewerSnapshot,
    redo: &mut RedoStacks,
) -> Result<(), Rejection> {
    match command {
        Command::Seek(frame) => {
            state.frame = *frame;
            Ok(())
        }
        Command::Playback(p) => {
            state.playback = *p;
            Ok(())
        }
        // Bounds are independent, so a peer may send them in either order
        Command::TimelineMin(frame) => {
            state.timeline.min = Some(*frame);
            Ok(())
        }
        Command::TimelineMax(frame) => {
            state.timeline.max = Some(*frame);
            Ok(())
        }

        Command::Fps(_)
        | Command::Looping(_)
        | Command::Gain(_)
        | Command::Gamma(_)
        | Command::Channel(_)
        | Command::UseLut(_)
        | Command::SafeAreas(_)
        | Command::ShowPixelRatio(_)
        | Command::Normalize(_)
        | Command::DisplayWindow(_)
        | Command::DataWindow(_)
        | Command::Mask(_)
        | Command::Volume(_)
        | Command::OcioView { .. } => display::reduce_display(command, &mut state.display),

        Command::Ics(_) | Command::Idt(_) | Command::Lmt { .. } | Command::Rt(_) => {
            color::reduce(command, state)
        }

        Command::FgReel(_)
        | Command::BgReel(_)
        | Command::CurrentBgImage(_)
        | Command::ShowBg(_)
        | Command::Wipe(_) => compare::reduce(command, state),

        Command::Zoom(_)
        | Command::Offset { .. }
        | Command::Rotation { .. }
        | Command::Selection(_) => display::reduce_view(command, &mut state.view),

        Command::Edl(_)
        | Command::CurrentReel(_)
        | Command::Image(_)
        | Command::CurrentImage(_)
        | Command::ChangeImage(_)
        | Command::InsertImage { .. }
        | Command::RemoveImage { .. }
        | Command::ReplaceImage { .. }
        | Command::ExchangeImage { .. }
        | Command::CloneImage(_)
        | Command::ShiftMediaStart(_)
        | Command::ShiftMediaEnd(_)
        | Command::ShiftAudio(_) => reel::reduce(command, state, redo),

        Command::PathShape(_)
        | Command::ErasePathShape(_)
        | Command::TextShape(_)
        | Command::UndoDraw
        | Command::RedoDraw => annotation::reduce(command, state, redo),

        // Answered by the dispatcher; nothing to change here.
        Command::SyncImage => Ok(()),
    }
}
