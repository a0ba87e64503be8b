use thiserror::Error;

/// Why a well-formed command could not be applied to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no reel is selected")]
    NoCurrentReel,
    #[error("no image is selected")]
    NoCurrentImage,
    #[error("reel {0} does not exist")]
    UnknownReel(usize),
    #[error("media {0:?} is not in the reel")]
    UnknownMedia(String),
    #[error("media {0:?} is already in the reel")]
    DuplicateMedia(String),
    #[error("index {index} is out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("{field} value {value} is out of range")]
    OutOfRange { field: &'static str, value: String },
    #[error("frame range {first}..{last} is empty")]
    InvalidRange { first: i64, last: i64 },
    #[error("reel name is empty")]
    EmptyReelName,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
}

impl Rejection {
    pub(crate) fn out_of_range(field: &'static str, value: impl ToString) -> Self {
        Rejection::OutOfRange {
            field,
            value: value.to_string(),
        }
    }
}
