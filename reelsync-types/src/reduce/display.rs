use crate::{Command, DisplaySettings, Rejection, ViewSettings};

fn finite_f32(field: &'static str, v: f32) -> Result<f32, Rejection> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(Rejection::out_of_range(field, v))
    }
}

fn positive_f32(field: &'static str, v: f32) -> Result<f32, Rejection> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(Rejection::out_of_range(field, v))
    }
}

fn finite_f64(field: &'static str, v: f64) -> Result<f64, Rejection> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(Rejection::out_of_range(field, v))
    }
}

pub(super) fn reduce_display(
    command: &Command,
    display: &mut DisplaySettings,
) -> Result<(), Rejection> {
    match *command {
        Command::Fps(fps) => {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(Rejection::out_of_range("fps", fps));
            }
            display.fps = fps;
        }
        Command::Looping(mode) => display.loop_mode = mode,
        Command::Gain(v) => display.gain = finite_f32("gain", v)?,
        Command::Gamma(v) => display.gamma = positive_f32("gamma", v)?,
        Command::Channel(ch) => display.channel = ch,
        Command::UseLut(on) => display.lut_enabled = on,
        Command::SafeAreas(on) => display.safe_areas = on,
        Command::ShowPixelRatio(on) => display.pixel_ratio = on,
        Command::Normalize(on) => display.normalize = on,
        Command::DisplayWindow(on) => display.display_window = on,
        Command::DataWindow(on) => display.data_window = on,
        Command::Mask(v) => {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Rejection::out_of_range("mask", v));
            }
            display.mask = v;
        }
        Command::Volume(v) => {
            if !(0.0..=1.0).contains(&v) {
                return Err(Rejection::out_of_range("volume", v));
            }
            display.volume = v;
        }
        // An empty name keeps the current choice. Picking a view resets the
        // gamma and turns the LUT on, as the color pipeline expects.
        Command::OcioView {
            display: ref name,
            ref view,
        } => {
            if !name.is_empty() {
                display.ocio_display = name.clone();
            }
            if !view.is_empty() {
                display.ocio_view = view.clone();
            }
            display.gamma = 1.0;
            display.lut_enabled = true;
        }
        _ => unreachable!("not a display command: {}", command.name()),
    }
    Ok(())
}

pub(super) fn reduce_view(command: &Command, view: &mut ViewSettings) -> Result<(), Rejection> {
    match *command {
        Command::Zoom(z) => view.zoom = positive_f32("zoom", z)?,
        Command::Offset { x, y } => {
            view.offset = (finite_f64("offset", x)?, finite_f64("offset", y)?);
        }
        Command::Rotation { x, y } => {
            view.rotation = (finite_f64("rotation", x)?, finite_f64("rotation", y)?);
        }
        Command::Selection(rect) => {
            if !rect.is_normalized() {
                return Err(Rejection::out_of_range(
                    "selection",
                    format!("{} {} {} {}", rect.x, rect.y, rect.w, rect.h),
                ));
            }
            view.selection = rect;
        }
        _ => unreachable!("not a view command: {}", command.name()),
    }
    Ok(())
}
