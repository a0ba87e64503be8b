//! Network layer for reelsync collaborative review.
//!
//! Viewers exchange newline-delimited text commands over plain TCP. Every
//! state change a peer applies is relayed to all of its other peers, and a
//! newly connected client asks for the full state with `sync_image`.

pub mod client;
pub mod config;
pub mod connection;
pub mod deadline;
pub mod dispatcher;
pub mod framing;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use client::{ConnectError, Connector};
pub use config::{NetConfig, DEFAULT_PORT};
pub use connection::{Connection, ConnectionInfo, ConnectionState, Role};
pub use deadline::DeadlineTimer;
pub use dispatcher::{Dispatch, Dispatcher, Outcome};
pub use protocol::{encode_command, parse_command_line, parse_line, ConnectionId, Message};
pub use registry::{Peer, SessionRegistry};
pub use server::{NetServer, ServerHandle};
pub use session::{PublishError, Session};
