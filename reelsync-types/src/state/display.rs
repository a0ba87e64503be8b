//! Display transform and view settings.

use serde::{Deserialize, Serialize};

use super::Rect;
use crate::command::LoopMode;

/// Color and presentation parameters applied to the displayed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub gain: f32,
    pub gamma: f32,
    /// Index of the displayed layer/channel
    pub channel: u16,
    pub lut_enabled: bool,
    pub safe_areas: bool,
    pub pixel_ratio: bool,
    pub normalize: bool,
    /// Aspect-ratio mask; 0.0 means no mask
    pub mask: f32,
    pub fps: f64,
    pub loop_mode: LoopMode,
    pub volume: f32,
    pub display_window: bool,
    pub data_window: bool,
    /// OCIO display and view names; empty until a peer picks one
    pub ocio_display: String,
    pub ocio_view: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            gain: 1.0,
            gamma: 1.0,
            channel: 0,
            lut_enabled: false,
            safe_areas: false,
            pixel_ratio: false,
            normalize: false,
            mask: 0.0,
            fps: 24.0,
            loop_mode: LoopMode::default(),
            volume: 1.0,
            display_window: false,
            data_window: false,
            ocio_display: String::new(),
            ocio_view: String::new(),
        }
    }
}

/// Pan, zoom and selection of the viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub zoom: f32,
    pub offset: (f64, f64),
    pub rotation: (f64, f64),
    pub selection: Rect,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: (0.0, 0.0),
            rotation: (0.0, 0.0),
            selection: Rect::default(),
        }
    }
}
