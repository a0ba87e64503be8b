use crate::reduce::{self, RedoStacks};
use crate::{Command, Rejection, ViewerSnapshot, ViewerState};

/// In-memory viewer: the shared state plus per-media redo history.
///
/// Redo history is local to each peer and never part of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    state: ViewerSnapshot,
    redo: RedoStacks,
}

impl Viewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewerSnapshot {
        &self.state
    }
}

impl ViewerState for Viewer {
    fn snapshot(&self) -> ViewerSnapshot {
        self.state.clone()
    }

    fn apply(&mut self, command: &Command) -> Result<(), Rejection> {
        reduce::reduce(command, &mut self.state, &mut self.redo)
    }
}
