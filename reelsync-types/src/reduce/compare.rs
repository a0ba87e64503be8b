use crate::{Background, Command, MediaRef, Rejection, ViewerSnapshot};

pub(super) fn reduce(command: &Command, state: &mut ViewerSnapshot) -> Result<(), Rejection> {
    match command {
        Command::FgReel(index) => {
            check_reel(state, *index)?;
            state.current_reel = Some(*index);
        }
        Command::BgReel(index) => {
            if let Some(i) = index {
                check_reel(state, *i)?;
            }
            state.compare.bg_reel = *index;
        }
        Command::CurrentBgImage(media) => set_background(state, media.as_ref())?,
        Command::ShowBg(on) => state.compare.show_bg = *on,
        Command::Wipe(wipe) => {
            if let Some(amount) = wipe.amount() {
                if !(0.0..=1.0).contains(&amount) {
                    return Err(Rejection::out_of_range("wipe", amount));
                }
            }
            state.compare.wipe = *wipe;
        }
        _ => unreachable!("not a compare command: {}", command.name()),
    }
    Ok(())
}

fn check_reel(state: &ViewerSnapshot, index: usize) -> Result<(), Rejection> {
    if index < state.reels.len() {
        Ok(())
    } else {
        Err(Rejection::UnknownReel(index))
    }
}

/// The background is picked from the current reel and keeps its range in
/// step with the request.
fn set_background(state: &mut ViewerSnapshot, media: Option<&MediaRef>) -> Result<(), Rejection> {
    let Some(media) = media else {
        state.compare.background = None;
        return Ok(());
    };
    if media.first > media.last {
        return Err(Rejection::InvalidRange {
            first: media.first,
            last: media.last,
        });
    }
    let reel_index = state.current_reel.ok_or(Rejection::NoCurrentReel)?;
    let reel = state
        .reels
        .get_mut(reel_index)
        .ok_or(Rejection::NoCurrentReel)?;
    let at = reel
        .position(&media.path)
        .ok_or_else(|| Rejection::UnknownMedia(media.path.clone()))?;
    reel.media[at].first = media.first;
    reel.media[at].last = media.last;
    state.compare.background = Some(Background {
        reel: reel_index,
        path: media.path.clone(),
    });
    Ok(())
}
