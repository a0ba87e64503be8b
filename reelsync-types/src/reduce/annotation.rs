use super::RedoStacks;
use crate::{Command, Point, Rejection, Shape, ViewerSnapshot};

pub(super) fn reduce(
    command: &Command,
    state: &mut ViewerSnapshot,
    redo: &mut RedoStacks,
) -> Result<(), Rejection> {
    let media = state.current_image_mut().ok_or(Rejection::NoCurrentImage)?;

    match command {
        Command::PathShape(stroke) => {
            if !stroke.color.iter().all(|c| c.is_finite()) {
                return Err(Rejection::out_of_range("color", format!("{:?}", stroke.color)));
            }
            check_pen(stroke.pen_size)?;
            check_points(&stroke.points)?;
            add_shape(&mut media.shapes, redo, &media.path, Shape::Stroke(stroke.clone()));
        }
        Command::ErasePathShape(erase) => {
            check_pen(erase.pen_size)?;
            check_points(&erase.points)?;
            add_shape(&mut media.shapes, redo, &media.path, Shape::Erase(erase.clone()));
        }
        Command::TextShape(note) => {
            if note.size == 0 {
                return Err(Rejection::out_of_range("font size", note.size));
            }
            if !note.color.iter().all(|c| c.is_finite()) {
                return Err(Rejection::out_of_range("color", format!("{:?}", note.color)));
            }
            check_points(std::slice::from_ref(&note.position))?;
            // Dragging a note resends it with a new position
            match media.shapes.last_mut() {
                Some(Shape::Text(last)) if last.same_content(note) => {
                    last.position = note.position;
                }
                _ => add_shape(&mut media.shapes, redo, &media.path, Shape::Text(note.clone())),
            }
        }
        Command::UndoDraw => {
            let shape = media.shapes.pop().ok_or(Rejection::NothingToUndo)?;
            redo.entry(media.path.clone()).or_default().push(shape);
        }
        Command::RedoDraw => {
            let shape = redo
                .get_mut(&media.path)
                .and_then(Vec::pop)
                .ok_or(Rejection::NothingToRedo)?;
            media.shapes.push(shape);
        }
        _ => unreachable!("not an annotation command: {}", command.name()),
    }
    Ok(())
}

/// A shape the media already carries is a duplicate delivery and is
/// dropped. Drawing anything new invalidates the redo stack.
fn add_shape(shapes: &mut Vec<Shape>, redo: &mut RedoStacks, path: &str, shape: Shape) {
    if shapes.contains(&shape) {
        return;
    }
    shapes.push(shape);
    redo.remove(path);
}

fn check_pen(pen_size: f32) -> Result<(), Rejection> {
    if pen_size.is_finite() && pen_size > 0.0 {
        Ok(())
    } else {
        Err(Rejection::out_of_range("pen size", pen_size))
    }
}

fn check_points(points: &[Point]) -> Result<(), Rejection> {
    match points.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
        Some(p) => Err(Rejection::out_of_range("point", format!("{} {}", p.x, p.y))),
        None => Ok(()),
    }
}
