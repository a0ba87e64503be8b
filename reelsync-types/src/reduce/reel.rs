use super::RedoStacks;
use crate::{Command, Media, MediaRef, MediaShift, Reel, Rejection, ViewerSnapshot};

pub(super) fn reduce(
    command: &Command,
    state: &mut ViewerSnapshot,
    redo: &mut RedoStacks,
) -> Result<(), Rejection> {
    match command {
        Command::Edl(on) => {
            current_reel(state)?.edl = *on;
            Ok(())
        }
        Command::CurrentReel(name) => select_reel(state, name),
        Command::Image(media) => load_image(state, media),
        Command::CurrentImage(media) => select_image(state, media),
        Command::ChangeImage(index) => {
            let reel = current_reel(state)?;
            check_index(*index, reel.media.len())?;
            reel.current = Some(*index);
            Ok(())
        }
        Command::InsertImage { index, path } => move_image(state, *index, path),
        Command::RemoveImage { index, path } => remove_image(state, redo, *index, path),
        Command::ReplaceImage { index, path } => replace_image(state, redo, *index, path),
        Command::ExchangeImage { from, to } => {
            let reel = current_reel(state)?;
            check_index(*from, reel.media.len())?;
            check_index(*to, reel.media.len())?;
            reel.media.swap(*from, *to);
            reel.current = reel.current.map(|cur| match cur {
                c if c == *from => *to,
                c if c == *to => *from,
                c => c,
            });
            Ok(())
        }
        Command::CloneImage(path) => clone_image(state, path),
        Command::ShiftMediaStart(shift) => shift_media(state, shift, Edge::Start),
        Command::ShiftMediaEnd(shift) => shift_media(state, shift, Edge::End),
        Command::ShiftAudio(shift) => {
            let media = shifted_media(state, shift)?;
            media.audio_offset = media
                .audio_offset
                .checked_add(shift.delta)
                .ok_or_else(|| Rejection::out_of_range("delta", shift.delta))?;
            Ok(())
        }
        _ => unreachable!("not a reel command: {}", command.name()),
    }
}

fn current_reel(state: &mut ViewerSnapshot) -> Result<&mut Reel, Rejection> {
    state.reel_mut().ok_or(Rejection::NoCurrentReel)
}

fn check_index(index: usize, len: usize) -> Result<(), Rejection> {
    if index < len {
        Ok(())
    } else {
        Err(Rejection::IndexOutOfRange { index, len })
    }
}

fn check_range(media: &MediaRef) -> Result<(), Rejection> {
    if media.first <= media.last {
        Ok(())
    } else {
        Err(Rejection::InvalidRange {
            first: media.first,
            last: media.last,
        })
    }
}

/// Select the reel called `name`, creating it at the end if needed.
fn select_reel(state: &mut ViewerSnapshot, name: &str) -> Result<(), Rejection> {
    if name.is_empty() {
        return Err(Rejection::EmptyReelName);
    }
    let index = match state.reel_index(name) {
        Some(i) => i,
        None => {
            state.reels.push(Reel::new(name));
            state.reels.len() - 1
        }
    };
    state.current_reel = Some(index);
    Ok(())
}

/// Path identifies media within a reel, so loading a known path updates its
/// frame range instead of adding a duplicate.
fn load_image(state: &mut ViewerSnapshot, media: &MediaRef) -> Result<(), Rejection> {
    check_range(media)?;
    let reel = current_reel(state)?;
    let index = match reel.position(&media.path) {
        Some(i) => {
            let existing = &mut reel.media[i];
            existing.first = media.first;
            existing.last = media.last;
            i
        }
        None => {
            reel.media.push(Media::new(media.path.clone(), media.first, media.last));
            reel.media.len() - 1
        }
    };
    reel.current = Some(index);
    Ok(())
}

/// Select by path; a path the reel has never seen is loaded first.
fn select_image(state: &mut ViewerSnapshot, media: &MediaRef) -> Result<(), Rejection> {
    check_range(media)?;
    let reel = current_reel(state)?;
    match reel.position(&media.path) {
        Some(i) => {
            reel.current = Some(i);
            Ok(())
        }
        None => load_image(state, media),
    }
}

/// Move an existing media item to `index` and select it there.
fn move_image(state: &mut ViewerSnapshot, index: usize, path: &str) -> Result<(), Rejection> {
    let reel = current_reel(state)?;
    let from = reel
        .position(path)
        .ok_or_else(|| Rejection::UnknownMedia(path.to_string()))?;
    check_index(index, reel.media.len())?;
    let item = reel.media.remove(from);
    reel.media.insert(index, item);
    reel.current = Some(index);
    Ok(())
}

/// Remove by path. The index is only a hint, so a stale index from a
/// concurrent edit still removes the right item.
fn remove_image(
    state: &mut ViewerSnapshot,
    redo: &mut RedoStacks,
    index: usize,
    path: &str,
) -> Result<(), Rejection> {
    let reel_index = state.current_reel.ok_or(Rejection::NoCurrentReel)?;
    let reel = current_reel(state)?;
    let at = match reel.media.get(index) {
        Some(m) if m.path == path => index,
        _ => reel
            .position(path)
            .ok_or_else(|| Rejection::UnknownMedia(path.to_string()))?,
    };
    reel.media.remove(at);
    reel.current = match reel.current {
        _ if reel.media.is_empty() => None,
        Some(cur) if cur > at => Some(cur - 1),
        Some(cur) => Some(cur.min(reel.media.len() - 1)),
        None => Some(0),
    };
    redo.remove(path);
    state.compare.forget_media(reel_index, path);
    Ok(())
}

/// Swap in a new path at `index`, keeping the frame range. Annotations,
/// color transforms and any background use belong to the old path.
fn replace_image(
    state: &mut ViewerSnapshot,
    redo: &mut RedoStacks,
    index: usize,
    path: &str,
) -> Result<(), Rejection> {
    let reel_index = state.current_reel.ok_or(Rejection::NoCurrentReel)?;
    let reel = current_reel(state)?;
    check_index(index, reel.media.len())?;
    match reel.position(path) {
        Some(at) if at == index => return Ok(()),
        Some(_) => return Err(Rejection::DuplicateMedia(path.to_string())),
        None => {}
    }
    let (first, last) = (reel.media[index].first, reel.media[index].last);
    let old = std::mem::replace(&mut reel.media[index], Media::new(path, first, last));
    redo.remove(&old.path);
    state.compare.forget_media(reel_index, &old.path);
    Ok(())
}

/// Insert a copy after the original under the first free `(clone N)` name.
/// The copy keeps range, color and audio offset but starts without
/// annotations. The original stays selected.
fn clone_image(state: &mut ViewerSnapshot, path: &str) -> Result<(), Rejection> {
    let reel = current_reel(state)?;
    let at = reel
        .position(path)
        .ok_or_else(|| Rejection::UnknownMedia(path.to_string()))?;
    let clone_path = (1..)
        .map(|n| format!("{} (clone {})", path, n))
        .find(|candidate| reel.position(candidate).is_none())
        .ok_or_else(|| Rejection::DuplicateMedia(path.to_string()))?;

    let original = &reel.media[at];
    let copy = Media {
        path: clone_path,
        shapes: Vec::new(),
        ..original.clone()
    };
    reel.media.insert(at + 1, copy);
    reel.current = Some(at);
    Ok(())
}

#[derive(Clone, Copy)]
enum Edge {
    Start,
    End,
}

/// Shifts address media by reel index and path, not the selection.
fn shifted_media<'a>(
    state: &'a mut ViewerSnapshot,
    shift: &MediaShift,
) -> Result<&'a mut Media, Rejection> {
    let reel = state
        .reels
        .get_mut(shift.reel)
        .ok_or(Rejection::UnknownReel(shift.reel))?;
    let index = reel
        .position(&shift.path)
        .ok_or_else(|| Rejection::UnknownMedia(shift.path.clone()))?;
    Ok(&mut reel.media[index])
}

fn shift_media(state: &mut ViewerSnapshot, shift: &MediaShift, edge: Edge) -> Result<(), Rejection> {
    let media = shifted_media(state, shift)?;

    let (first, last) = match edge {
        Edge::Start => (media.first.checked_add(shift.delta), Some(media.last)),
        Edge::End => (Some(media.first), media.last.checked_add(shift.delta)),
    };
    let (Some(first), Some(last)) = (first, last) else {
        return Err(Rejection::out_of_range("delta", shift.delta));
    };
    if first > last {
        return Err(Rejection::InvalidRange { first, last });
    }
    media.first = first;
    media.last = last;
    Ok(())
}
