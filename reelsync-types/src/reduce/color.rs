use crate::{Command, Rejection, ViewerSnapshot};

/// Color transforms follow the selected media. An empty name clears a slot.
pub(super) fn reduce(command: &Command, state: &mut ViewerSnapshot) -> Result<(), Rejection> {
    let color = &mut state
        .current_image_mut()
        .ok_or(Rejection::NoCurrentImage)?
        .color;

    match command {
        Command::Ics(name) => color.ics = non_empty(name),
        Command::Idt(name) => color.idt = non_empty(name),
        Command::Rt(name) => color.rt = non_empty(name),
        Command::Lmt { index, name } => {
            let index = *index;
            if index > color.lmts.len() {
                return Err(Rejection::IndexOutOfRange {
                    index,
                    len: color.lmts.len(),
                });
            }
            // Slot 0 starts a new chain
            if index == 0 {
                color.lmts.clear();
            }
            if name.is_empty() {
                color.lmts.truncate(index);
            } else if index < color.lmts.len() {
                color.lmts[index] = name.clone();
            } else {
                color.lmts.push(name.clone());
            }
        }
        _ => unreachable!("not a color command: {}", command.name()),
    }
    Ok(())
}

fn non_empty(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_string())
}
