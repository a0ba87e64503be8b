//! Full-state replay for `sync_image` requests.
//!
//! The script is ordered so a peer replaying it never refers to something it
//! has not seen yet: reels, then their media, then color transforms and
//! annotations and per-reel selection, then the compare background and the
//! global position, then display and view parameters.
//! Playback state goes last so the peer starts playing only once it is fully
//! configured.

use crate::{Command, MediaShift, ViewerSnapshot};

/// Commands that rebuild `snapshot` on an empty viewer.
pub fn sync_script(snapshot: &ViewerSnapshot) -> Vec<Command> {
    let mut script = Vec::new();

    for (reel_index, reel) in snapshot.reels.iter().enumerate() {
        script.push(Command::CurrentReel(reel.name.clone()));
        for media in &reel.media {
            script.push(Command::Image(media.media_ref()));
        }
        for media in reel
            .media
            .iter()
            .filter(|m| !m.shapes.is_empty() || !m.color.is_empty())
        {
            script.push(Command::CurrentImage(media.media_ref()));
            script.extend(media.color.to_commands());
            script.extend(media.shapes.iter().map(|s| s.to_command()));
        }
        for media in reel.media.iter().filter(|m| m.audio_offset != 0) {
            script.push(Command::ShiftAudio(MediaShift {
                reel: reel_index,
                path: media.path.clone(),
                delta: media.audio_offset,
            }));
        }
        script.push(Command::Edl(reel.edl));
        if let Some(index) = reel.current {
            script.push(Command::ChangeImage(index));
        }
    }

    let compare = &snapshot.compare;
    if let Some(index) = compare.bg_reel {
        script.push(Command::BgReel(Some(index)));
    }
    if let Some(bg) = &compare.background {
        let media = snapshot
            .reels
            .get(bg.reel)
            .and_then(|reel| reel.position(&bg.path).map(|at| (reel, at)));
        if let Some((reel, at)) = media {
            script.push(Command::CurrentReel(reel.name.clone()));
            script.push(Command::CurrentBgImage(Some(reel.media[at].media_ref())));
        }
    }

    if let Some(reel) = snapshot.reel() {
        script.push(Command::CurrentReel(reel.name.clone()));
    }
    if let Some(min) = snapshot.timeline.min {
        script.push(Command::TimelineMin(min));
    }
    if let Some(max) = snapshot.timeline.max {
        script.push(Command::TimelineMax(max));
    }
    script.push(Command::Seek(snapshot.frame));

    let d = &snapshot.display;
    script.extend([Command::Fps(d.fps), Command::Looping(d.loop_mode)]);
    // OCIOView resets gamma and the LUT switch, so it goes before both
    if !d.ocio_display.is_empty() || !d.ocio_view.is_empty() {
        script.push(Command::OcioView {
            display: d.ocio_display.clone(),
            view: d.ocio_view.clone(),
        });
    }
    script.extend([
        Command::Gain(d.gain),
        Command::Gamma(d.gamma),
        Command::Channel(d.channel),
        Command::UseLut(d.lut_enabled),
        Command::SafeAreas(d.safe_areas),
        Command::ShowPixelRatio(d.pixel_ratio),
        Command::Normalize(d.normalize),
        Command::Mask(d.mask),
        Command::Volume(d.volume),
        Command::DisplayWindow(d.display_window),
        Command::DataWindow(d.data_window),
        Command::ShowBg(compare.show_bg),
        Command::Wipe(compare.wipe),
    ]);

    let v = &snapshot.view;
    script.extend([
        Command::Zoom(v.zoom),
        Command::Offset {
            x: v.offset.0,
            y: v.offset.1,
        },
        Command::Rotation {
            x: v.rotation.0,
            y: v.rotation.1,
        },
        Command::Selection(v.selection),
    ]);

    script.push(Command::Playback(snapshot.playback));
    script
}
