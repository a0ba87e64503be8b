//! Foreground/background comparison.

use serde::{Deserialize, Serialize};

/// Split-screen wipe between foreground and background.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Wipe {
    #[default]
    Off,
    /// Split position across the width, 0.0 - 1.0
    Vertical(f32),
    /// Split position across the height, 0.0 - 1.0
    Horizontal(f32),
}

impl Wipe {
    pub fn command_name(self) -> &'static str {
        match self {
            Wipe::Off => "NoWipe",
            Wipe::Vertical(_) => "WipeVertical",
            Wipe::Horizontal(_) => "WipeHorizontal",
        }
    }

    pub fn amount(self) -> Option<f32> {
        match self {
            Wipe::Off => None,
            Wipe::Vertical(a) | Wipe::Horizontal(a) => Some(a),
        }
    }
}

/// Media shown behind the foreground, addressed by reel index and path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub reel: usize,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareSettings {
    pub bg_reel: Option<usize>,
    pub background: Option<Background>,
    pub show_bg: bool,
    pub wipe: Wipe,
}

impl CompareSettings {
    /// Drop the background if it is `path` in `reel`.
    pub fn forget_media(&mut self, reel: usize, path: &str) {
        if self
            .background
            .as_ref()
            .is_some_and(|bg| bg.reel == reel && bg.path == path)
        {
            self.background = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wipe_wire_names() {
        assert_eq!(Wipe::Off.command_name(), "NoWipe");
        assert_eq!(Wipe::Vertical(0.5).command_name(), "WipeVertical");
        assert_eq!(Wipe::Horizontal(0.25).amount(), Some(0.25));
        assert_eq!(Wipe::Off.amount(), None);
    }

    #[test]
    fn forgetting_other_media_keeps_background() {
        let mut compare = CompareSettings {
            background: Some(Background {
                reel: 1,
                path: "/a.exr".into(),
            }),
            ..CompareSettings::default()
        };
        compare.forget_media(0, "/a.exr");
        assert!(compare.background.is_some());
        compare.forget_media(1, "/a.exr");
        assert!(compare.background.is_none());
    }
}
