//! Listener for inbound peers.
//!
//! Accepts TCP connections and turns each into a server-side [`Connection`]
//! registered with the session.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use crate::config::NetConfig;
use crate::connection::{Connection, Role};
use crate::dispatcher::Dispatch;
use crate::registry::SessionRegistry;

pub struct NetServer {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    dispatcher: Arc<dyn Dispatch>,
    config: NetConfig,
}

impl NetServer {
    /// Bind the listener. Nothing is registered until connections arrive,
    /// so a failed bind leaves no state behind.
    pub fn bind(
        addr: impl ToSocketAddrs,
        registry: Arc<SessionRegistry>,
        dispatcher: Arc<dyn Dispatch>,
        config: NetConfig,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        info!("NetServer listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            registry,
            dispatcher,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept every pending connection. Returns how many were started.
    pub fn accept_connections(&self) -> usize {
        let mut started = 0;
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    info!("Peer connecting from {}", addr);
                    match self.start_session(stream) {
                        Ok(()) => started += 1,
                        Err(e) => warn!("Failed to start session for {}: {}", addr, e),
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Accept error: {}", e);
                    break;
                }
            }
        }
        started
    }

    fn start_session(&self, stream: std::net::TcpStream) -> io::Result<()> {
        // Some platforms hand out accepted sockets that inherit non-blocking mode
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        let conn = Connection::new(
            Role::Server,
            stream,
            &self.registry,
            Arc::clone(&self.dispatcher),
            &self.config,
        )?;
        conn.start()
    }

    /// Run the accept loop on its own thread.
    pub fn spawn(self) -> io::Result<ServerHandle> {
        let local_addr = self.local_addr()?;
        let stopping = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopping);

        let thread = thread::Builder::new()
            .name("accept".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    self.accept_connections();
                    thread::sleep(self.config.accept_poll);
                }
                info!("NetServer on {} stopped accepting", local_addr);
            })?;

        Ok(ServerHandle {
            local_addr,
            stopping,
            thread: Some(thread),
        })
    }
}

/// A running accept loop. Dropping the handle stops it.
pub struct ServerHandle {
    local_addr: SocketAddr,
    stopping: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and close the listening socket. Connections already
    /// accepted stay open.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.stopping.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("accept thread for {} panicked", self.local_addr);
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use reelsync_types::Viewer;
    use std::net::TcpStream;
    use std::time::{Duration, Instant};

    fn server() -> (NetServer, Arc<SessionRegistry>) {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher: Arc<dyn Dispatch> = Arc::new(Dispatcher::new(Viewer::new()));
        let server =
            NetServer::bind("127.0.0.1:0", Arc::clone(&registry), dispatcher, NetConfig::default())
                .unwrap();
        (server, registry)
    }

    #[test]
    fn accept_registers_sessions() {
        let (server, registry) = server();
        let addr = server.local_addr().unwrap();
        let _a = TcpStream::connect(addr).unwrap();
        let _b = TcpStream::connect(addr).unwrap();

        let start = Instant::now();
        let mut accepted = 0;
        while accepted < 2 && start.elapsed() < Duration::from_secs(3) {
            accepted += server.accept_connections();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(accepted, 2);
        assert_eq!(registry.len(), 2);
        registry.stop_all();
    }

    #[test]
    fn bind_failure_is_reported() {
        let (taken, registry) = server();
        let addr = taken.local_addr().unwrap();
        let dispatcher: Arc<dyn Dispatch> = Arc::new(Dispatcher::new(Viewer::new()));
        let result = NetServer::bind(addr, Arc::clone(&registry), dispatcher, NetConfig::default());
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn shutdown_closes_listener() {
        let (server, _registry) = server();
        let handle = server.spawn().unwrap();
        let addr = handle.local_addr();
        handle.shutdown();
        assert!(TcpStream::connect_timeout(&addr, Duration::from_secs(1)).is_err());
    }
}
