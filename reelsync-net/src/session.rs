use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex, PoisonError};

use log::info;
use thiserror::Error;

use reelsync_types::{Command, Rejection, ViewerSnapshot, ViewerState};

use crate::client::{ConnectError, Connector};
use crate::config::NetConfig;
use crate::connection::{Connection, ConnectionInfo};
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::framing::CodecError;
use crate::protocol::encode_command;
use crate::registry::SessionRegistry;
use crate::server::{NetServer, ServerHandle};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Encode(#[from] CodecError),
}

/// One viewer taking part in a collaborative session: its state, the
/// connections it holds, and any listeners it runs.
pub struct Session<V> {
    registry: Arc<SessionRegistry>,
    dispatcher: Arc<Dispatcher<V>>,
    config: NetConfig,
    listeners: Mutex<Vec<ServerHandle>>,
}

impl<V: ViewerState + Send + 'static> Session<V> {
    pub fn new(viewer: V, config: NetConfig) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            dispatcher: Arc::new(Dispatcher::new(viewer)),
            config,
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn dispatch_handle(&self) -> Arc<dyn Dispatch> {
        Arc::clone(&self.dispatcher) as Arc<dyn Dispatch>
    }

    /// Accept peers on `addr`. Returns the bound address.
    pub fn listen(&self, addr: impl ToSocketAddrs) -> io::Result<SocketAddr> {
        let server = NetServer::bind(
            addr,
            Arc::clone(&self.registry),
            self.dispatch_handle(),
            self.config.clone(),
        )?;
        let handle = server.spawn()?;
        let local = handle.local_addr();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(local)
    }

    pub fn connector(&self) -> Connector {
        Connector::new(
            Arc::clone(&self.registry),
            self.dispatch_handle(),
            self.config.clone(),
        )
    }

    /// Join the session served at `host:port`.
    pub fn connect(&self, host: &str, port: u16) -> Result<Arc<Connection>, ConnectError> {
        self.connector().connect(host, port)
    }

    /// Apply a local edit and send it to every peer.
    ///
    /// `sync_image` is not applied; it asks the peers for their state.
    /// The broadcast is queued before the viewer lock is released, so it
    /// cannot be overtaken by a sync reply or relay built afterwards.
    pub fn publish(&self, command: &Command) -> Result<usize, PublishError> {
        let bytes = encode_command(command)?;
        self.dispatcher.with_state(|viewer| -> Result<usize, PublishError> {
            if command.is_state_mutating() {
                viewer.apply(command)?;
            }
            Ok(self.registry.broadcast(&bytes, None))
        })
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        self.dispatcher.snapshot()
    }

    pub fn dispatcher(&self) -> &Dispatcher<V> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.registry.connections()
    }

    /// Stop listening and close every connection.
    pub fn shutdown(&self) {
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in listeners {
            handle.shutdown();
        }
        self.registry.stop_all();
        info!("session shut down");
    }
}

impl<V> Drop for Session<V> {
    fn drop(&mut self) {
        self.registry.stop_all();
    }
}
