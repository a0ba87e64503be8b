//! One TCP peer link.
//!
//! Each open connection runs a reader thread and a writer thread. The reader
//! decodes lines and dispatches them in arrival order; the writer is the only
//! consumer of the output queue. Either side failing stops the connection.

use std::fmt;
use std::io::{self, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};

use reelsync_types::Command;

use crate::config::NetConfig;
use crate::deadline::DeadlineTimer;
use crate::dispatcher::{Dispatch, Outcome};
use crate::framing::LineDecoder;
use crate::protocol::{self, encode_command, ConnectionId};
use crate::registry::{Peer, SessionRegistry};

/// Which side of the link this process is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepted by a listener.
    Server,
    /// Established by a connector.
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Observer view of a connection, for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    pub role: Role,
    pub state: ConnectionState,
}

enum Outbound {
    Line(Vec<u8>),
    Close,
}

pub struct Connection {
    id: ConnectionId,
    role: Role,
    peer: SocketAddr,
    stream: TcpStream,
    state: Mutex<ConnectionState>,
    queue: Sender<Outbound>,
    outbox: Mutex<Option<Receiver<Outbound>>>,
    registry: Weak<SessionRegistry>,
    dispatcher: Arc<dyn Dispatch>,
    idle: Option<DeadlineTimer>,
    config: NetConfig,
}

impl Connection {
    /// Wrap an established socket. Server connections begin `Open`; client
    /// connections stay `Connecting` until [`Connection::start`].
    pub fn new(
        role: Role,
        stream: TcpStream,
        registry: &Arc<SessionRegistry>,
        dispatcher: Arc<dyn Dispatch>,
        config: &NetConfig,
    ) -> io::Result<Arc<Self>> {
        let peer = stream.peer_addr()?;
        let (queue, outbox) = crossbeam_channel::unbounded();
        let state = match role {
            Role::Server => ConnectionState::Open,
            Role::Client => ConnectionState::Connecting,
        };

        Ok(Arc::new(Self {
            id: ConnectionId::next(),
            role,
            peer,
            stream,
            state: Mutex::new(state),
            queue,
            outbox: Mutex::new(Some(outbox)),
            registry: Arc::downgrade(registry),
            dispatcher,
            idle: config.idle_timeout.map(|_| DeadlineTimer::new()),
            config: config.clone(),
        }))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Remote endpoint, also used as this peer's id in `Not OK` replies.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConnectionState {
        *self.lock_state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Spawn the reader and writer, register with the session, and for a
    /// client ask the server for its full state.
    pub fn start(self: &Arc<Self>) -> io::Result<()> {
        let outbox = self
            .outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "connection already started"))?;

        if let Err(e) = self.spawn_workers(outbox) {
            error!("{}: failed to start: {}", self, e);
            self.stop();
            return Err(e);
        }

        self.join_registry()?;
        info!("{} open", self);

        if self.role == Role::Client && self.config.sync_on_connect {
            self.send(&Command::SyncImage);
        }
        Ok(())
    }

    fn spawn_workers(self: &Arc<Self>, outbox: Receiver<Outbound>) -> io::Result<()> {
        let read_stream = self.stream.try_clone()?;
        let write_stream = self.stream.try_clone()?;

        {
            let mut state = self.lock_state();
            match *state {
                ConnectionState::Connecting | ConnectionState::Open => {
                    *state = ConnectionState::Open
                }
                _ => return Err(io::Error::new(io::ErrorKind::NotConnected, "connection stopped")),
            }
        }

        if let (Some(timer), Some(timeout)) = (&self.idle, self.config.idle_timeout) {
            let weak = Arc::downgrade(self);
            timer.on_expiry(move || {
                if let Some(conn) = weak.upgrade() {
                    warn!("{}: idle for {:?}, closing", conn, timeout);
                    conn.stop();
                }
            })?;
            timer.arm(timeout);
        }

        let writer = Arc::clone(self);
        thread::Builder::new()
            .name(format!("conn-{}-write", self.id.0))
            .spawn(move || writer.write_loop(write_stream, outbox))?;

        let reader = Arc::clone(self);
        thread::Builder::new()
            .name(format!("conn-{}-read", self.id.0))
            .spawn(move || reader.read_loop(read_stream))?;

        Ok(())
    }

    /// Register only while still open, checked under the state lock. A peer
    /// that hung up as soon as the workers started has already run `stop`,
    /// and registering it now would leave it in the registry for good.
    fn join_registry(self: &Arc<Self>) -> io::Result<()> {
        let state = self.lock_state();
        if *state != ConnectionState::Open {
            debug!("{}: closed before it could join the session", self);
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "peer closed during start",
            ));
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.register(Arc::clone(self) as Arc<dyn Peer>);
        }
        Ok(())
    }

    /// Queue raw bytes for the writer. Dropped unless the connection is open.
    pub fn deliver(&self, message: &[u8]) {
        if !self.is_open() {
            return;
        }
        let _ = self.queue.send(Outbound::Line(message.to_vec()));
    }

    /// Encode and queue one command.
    pub fn send(&self, command: &Command) {
        match encode_command(command) {
            Ok(bytes) => self.deliver(&bytes),
            Err(e) => warn!("{}: cannot encode {}: {}", self, command.name(), e),
        }
    }

    /// Close the socket, wake the writer and leave the registry. Safe to call
    /// any number of times from any thread, including the worker threads.
    pub fn stop(&self) {
        {
            let mut state = self.lock_state();
            match *state {
                ConnectionState::Closing | ConnectionState::Closed => return,
                _ => *state = ConnectionState::Closing,
            }
        }

        if let Some(timer) = &self.idle {
            timer.cancel();
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        let _ = self.queue.send(Outbound::Close);
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }

        *self.lock_state() = ConnectionState::Closed;
        info!("{} closed", self);
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            peer: self.peer,
            role: self.role,
            state: self.state(),
        }
    }

    fn touch(&self) {
        if let (Some(timer), Some(timeout)) = (&self.idle, self.config.idle_timeout) {
            timer.arm(timeout);
        }
    }

    fn read_loop(self: Arc<Self>, mut stream: TcpStream) {
        let mut decoder = LineDecoder::new();
        let mut buf = vec![0u8; self.config.read_buffer.max(1)];

        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    debug!("{}: peer closed the connection", self);
                    break;
                }
                Ok(n) => {
                    self.touch();
                    for line in decoder.feed(&buf[..n]) {
                        if !self.is_open() {
                            break;
                        }
                        self.handle_line(&line);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if self.is_open() {
                        warn!("{}: read error: {}", self, e);
                    }
                    break;
                }
            }
        }

        self.stop();
    }

    fn handle_line(&self, line: &str) {
        debug!("{} <- {}", self, line);
        self.dispatcher
            .dispatch(line, &mut |outcome| self.route(line, outcome));
    }

    /// Runs under the dispatch lock, so replies and relays leave in the
    /// same order the viewer applied the commands.
    fn route(&self, line: &str, outcome: Outcome) {
        match outcome {
            Outcome::Applied(command) => {
                self.deliver(protocol::OK);
                match encode_command(&command) {
                    Ok(bytes) => {
                        if let Some(registry) = self.registry.upgrade() {
                            let n = registry.broadcast(&bytes, Some(self.id));
                            debug!("{}: relayed {} to {} peers", self, command.name(), n);
                        }
                    }
                    Err(e) => warn!("{}: cannot relay {}: {}", self, command.name(), e),
                }
            }
            Outcome::Rejected(reason) => {
                warn!("{}: rejected {:?}: {}", self, line, reason);
                self.deliver(&protocol::not_ok(self.peer));
            }
            Outcome::Acknowledged => {}
            Outcome::Reply(commands) => {
                for command in &commands {
                    self.send(command);
                }
            }
        }
    }

    fn write_loop(self: Arc<Self>, stream: TcpStream, outbox: Receiver<Outbound>) {
        let mut writer = BufWriter::new(stream);

        for item in outbox.iter() {
            let bytes = match item {
                Outbound::Line(bytes) => bytes,
                Outbound::Close => break,
            };
            let result = writer.write_all(&bytes).and_then(|()| {
                if outbox.is_empty() {
                    writer.flush()
                } else {
                    Ok(())
                }
            });
            if let Err(e) = result {
                if self.is_open() {
                    warn!("{}: write error: {}", self, e);
                }
                break;
            }
            self.touch();
        }

        self.stop();
    }
}

impl Peer for Connection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn deliver(&self, message: &[u8]) {
        Connection::deliver(self, message)
    }

    fn stop(&self) {
        Connection::stop(self)
    }

    fn info(&self) -> ConnectionInfo {
        Connection::info(self)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            Role::Server => "session",
            Role::Client => "client",
        };
        write!(f, "{} {} ({})", role, self.id, self.peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use reelsync_types::Viewer;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (server, client)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(3) {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn session_side(config: &NetConfig) -> (Arc<SessionRegistry>, Arc<Connection>, TcpStream) {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher: Arc<dyn Dispatch> = Arc::new(Dispatcher::new(Viewer::new()));
        let (server, client) = socket_pair();
        let conn = Connection::new(Role::Server, server, &registry, dispatcher, config).unwrap();
        (registry, conn, client)
    }

    #[test]
    fn stop_is_idempotent_and_unregisters_once() {
        let (registry, conn, _client) = session_side(&NetConfig::default());
        conn.start().unwrap();
        assert!(registry.contains(conn.id()));

        conn.stop();
        conn.stop();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(registry.is_empty());

        conn.deliver(b"seek 1\n");
        assert!(conn.start().is_err());
    }

    #[test]
    fn peers_that_hang_up_during_start_never_stay_registered() {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher: Arc<dyn Dispatch> = Arc::new(Dispatcher::new(Viewer::new()));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut conns = Vec::new();
        for _ in 0..200 {
            let client = TcpStream::connect(addr).unwrap();
            let (server, _) = listener.accept().unwrap();
            drop(client);
            let conn = match Connection::new(
                Role::Server,
                server,
                &registry,
                Arc::clone(&dispatcher),
                &NetConfig::default(),
            ) {
                Ok(conn) => conn,
                // peer_addr can already fail on a reset socket
                Err(_) => continue,
            };
            let _ = conn.start();
            conns.push(conn);
        }

        assert!(wait_for(|| conns
            .iter()
            .all(|c| c.state() == ConnectionState::Closed)));
        assert!(registry.is_empty(), "{} closed peers left registered", registry.len());
    }

    #[test]
    fn replies_ok_and_keeps_reading() {
        let (_registry, conn, client) = session_side(&NetConfig::default());
        conn.start().unwrap();

        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut writer = client.try_clone().unwrap();
        let mut reader = BufReader::new(client);

        writer.write_all(b"Gain 2\nBogus\n").unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "OK\n");
        line.clear();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, format!("Not OK {}\n", conn.peer()));
        assert!(conn.is_open());
    }

    #[test]
    fn peer_hangup_stops_connection() {
        let (registry, conn, client) = session_side(&NetConfig::default());
        conn.start().unwrap();
        drop(client);
        assert!(wait_for(|| conn.state() == ConnectionState::Closed));
        assert!(registry.is_empty());
    }

    #[test]
    fn idle_timeout_closes_silent_peer() {
        let config = NetConfig {
            idle_timeout: Some(Duration::from_millis(100)),
            ..NetConfig::default()
        };
        let (registry, conn, _client) = session_side(&config);
        conn.start().unwrap();
        assert!(wait_for(|| conn.state() == ConnectionState::Closed));
        assert!(registry.is_empty());
    }
}
