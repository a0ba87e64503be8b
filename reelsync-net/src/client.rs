//! Connector for outbound links.
//!
//! Resolves a host, then tries each resolved endpoint in order with a
//! per-attempt timeout. The first endpoint that accepts becomes a client-side
//! [`Connection`]; later endpoints are never tried.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::config::NetConfig;
use crate::connection::{Connection, ConnectionState, Role};
use crate::dispatcher::Dispatch;
use crate::registry::SessionRegistry;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("cannot resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("no endpoint accepted the connection ({} tried)", .attempts.len())]
    Exhausted { attempts: Vec<(SocketAddr, io::Error)> },
    #[error("connection could not start: {0}")]
    Start(#[from] io::Error),
}

pub struct Connector {
    registry: Arc<SessionRegistry>,
    dispatcher: Arc<dyn Dispatch>,
    config: NetConfig,
    attempts: Vec<SocketAddr>,
    state: ConnectionState,
}

impl Connector {
    pub fn new(
        registry: Arc<SessionRegistry>,
        dispatcher: Arc<dyn Dispatch>,
        config: NetConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            config,
            attempts: Vec::new(),
            state: ConnectionState::Closed,
        }
    }

    /// Resolve `host:port` to its endpoints, in resolver order.
    pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, ConnectError> {
        let resolve_error = |source| ConnectError::Resolve {
            host: host.to_string(),
            port,
            source,
        };
        let endpoints: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(resolve_error)?
            .collect();
        if endpoints.is_empty() {
            return Err(resolve_error(io::Error::new(
                io::ErrorKind::NotFound,
                "no addresses",
            )));
        }
        Ok(endpoints)
    }

    pub fn connect(&mut self, host: &str, port: u16) -> Result<Arc<Connection>, ConnectError> {
        info!("Connecting to {}:{}", host, port);
        let endpoints = Self::resolve(host, port)?;
        self.connect_endpoints(&endpoints)
    }

    /// Try `endpoints` in order and start a client connection on the first
    /// one that accepts.
    pub fn connect_endpoints(
        &mut self,
        endpoints: &[SocketAddr],
    ) -> Result<Arc<Connection>, ConnectError> {
        self.attempts.clear();
        self.state = ConnectionState::Connecting;
        let mut failures = Vec::new();

        for &addr in endpoints {
            self.attempts.push(addr);
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
                Ok(stream) => return self.open(stream),
                Err(e) => {
                    warn!("Connect to {} failed: {}", addr, e);
                    failures.push((addr, e));
                }
            }
        }

        self.state = ConnectionState::Closed;
        Err(ConnectError::Exhausted { attempts: failures })
    }

    fn open(&mut self, stream: TcpStream) -> Result<Arc<Connection>, ConnectError> {
        let started = stream.set_nodelay(true).and_then(|()| {
            let conn = Connection::new(
                Role::Client,
                stream,
                &self.registry,
                Arc::clone(&self.dispatcher),
                &self.config,
            )?;
            conn.start()?;
            Ok(conn)
        });
        match started {
            Ok(conn) => {
                self.state = ConnectionState::Open;
                Ok(conn)
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                Err(ConnectError::Start(e))
            }
        }
    }

    /// Endpoints tried by the last connect, in order.
    pub fn attempts(&self) -> &[SocketAddr] {
        &self.attempts
    }

    /// Where the last connect got to.
    pub fn state(&self) -> ConnectionState {
        self.state
    }
}
