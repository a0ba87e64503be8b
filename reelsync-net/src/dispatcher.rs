//! Interprets decoded lines against the shared viewer state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use reelsync_types::{sync_script, Command, ViewerSnapshot, ViewerState};

use crate::protocol::{parse_line, Message};

/// Result of dispatching one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The command changed shared state and should go to the other peers.
    Applied(Command),
    /// The line could not be parsed or applied. Sender gets `Not OK`.
    Rejected(String),
    /// `OK`, `Not OK` or an empty line. Nothing to do.
    Acknowledged,
    /// Commands to send back to the requester only.
    Reply(Vec<Command>),
}

/// Seam between connections and the viewer they drive.
pub trait Dispatch: Send + Sync {
    /// Interpret `line` and hand the outcome to `route` before the next
    /// line from any connection is interpreted. Whatever `route` queues
    /// (replies, relays) is therefore ordered the same way as the state
    /// changes themselves.
    fn dispatch(&self, line: &str, route: &mut dyn FnMut(Outcome));
}

/// Serializes every dispatch behind one lock around the viewer.
pub struct Dispatcher<V> {
    viewer: Mutex<V>,
}

impl<V: ViewerState> Dispatcher<V> {
    pub fn new(viewer: V) -> Self {
        Self {
            viewer: Mutex::new(viewer),
        }
    }

    fn lock(&self) -> MutexGuard<'_, V> {
        self.viewer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        self.lock().snapshot()
    }

    /// Run `f` with exclusive access to the viewer.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut self.lock())
    }
}

impl<V: ViewerState + Send> Dispatch for Dispatcher<V> {
    fn dispatch(&self, line: &str, route: &mut dyn FnMut(Outcome)) {
        let mut viewer = self.lock();
        let outcome = interpret(&mut *viewer, line);
        route(outcome);
    }
}

fn interpret<V: ViewerState>(viewer: &mut V, line: &str) -> Outcome {
    let message = match parse_line(line) {
        Ok(message) => message,
        Err(e) => return Outcome::Rejected(e.to_string()),
    };

    match message {
        Message::Ack => Outcome::Acknowledged,
        Message::Nack(peer) => {
            warn!("peer refused a command: Not OK {}", peer.unwrap_or_default());
            Outcome::Acknowledged
        }
        Message::Command(Command::SyncImage) => {
            let script = sync_script(&viewer.snapshot());
            debug!("answering sync_image with {} commands", script.len());
            Outcome::Reply(script)
        }
        Message::Command(command) => match viewer.apply(&command) {
            Ok(()) => Outcome::Applied(command),
            Err(e) => Outcome::Rejected(format!("{}: {}", command.name(), e)),
        },
    }
}
