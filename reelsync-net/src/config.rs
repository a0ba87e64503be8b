use std::time::Duration;

/// Port a session listens on when none is configured.
pub const DEFAULT_PORT: u16 = 55150;

/// Tunables for listeners, connectors and connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    /// Bound on each endpoint attempt while connecting.
    pub connect_timeout: Duration,
    /// Close a connection that neither reads nor writes for this long.
    /// `None` keeps idle connections open indefinitely.
    pub idle_timeout: Option<Duration>,
    /// Ask the server for its full state right after connecting.
    pub sync_on_connect: bool,
    /// Sleep between accept sweeps of a spawned listener.
    pub accept_poll: Duration,
    /// Size of each socket read.
    pub read_buffer: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            idle_timeout: None,
            sync_on_connect: true,
            accept_poll: Duration::from_millis(20),
            read_buffer: 4096,
        }
    }
}
