use crate::{Error, Result};

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use keel_modules::{BoxError, Module};
use keel_supervisor::ShutdownHandle;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One line of JSON sent to every client.
#[derive(Clone, Debug, Serialize)]
pub struct NodeStatus {
    /// Node software version.
    pub version: String,

    /// Network identifier.
    pub network: String,

    /// Configured listening port.
    pub port: u16,
}

/// Answers every TCP connection with the node's status and closes it.
#[derive(Debug)]
pub struct StatusListener {
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    status: NodeStatus,
    stop: CancellationToken,
}

impl StatusListener {
    /// Name the module is registered under.
    pub const NAME: &'static str = "status listener";

    /// Bind `addr` without accepting yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Listen`] if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, status: NodeStatus) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Listen { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| Error::Listen { addr, source })?;

        Ok(Self {
            listener: Mutex::new(Some(listener)),
            local_addr,
            status,
            stop: CancellationToken::new(),
        })
    }

    /// The bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start accepting on a guarded task.
    ///
    /// Stops when the node shuts down or the module is cleaned up. Calling it
    /// a second time does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be serialized.
    pub fn serve(&self, shutdown: &ShutdownHandle) -> Result<()> {
        let Some(listener) = self.listener.lock().take() else {
            return Ok(());
        };

        let mut line = serde_json::to_vec(&self.status)?;
        line.push(b'\n');

        shutdown.spawn_guarded(
            Self::NAME,
            accept_loop(listener, line.into(), shutdown.token(), self.stop.clone()),
        );

        info!("status listener on {}", self.local_addr);

        Ok(())
    }
}

/// Source of incoming connections.
#[async_trait]
trait Accept: Send + 'static {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Accept for TcpListener {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Answer connections until either token is cancelled. Accept errors are
/// logged and the loop keeps going.
async fn accept_loop<A: Accept>(
    mut listener: A,
    line: Arc<[u8]>,
    shutdown: CancellationToken,
    stop: CancellationToken,
) -> Result<(), Infallible> {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = stop.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(answer(stream, peer, line.clone()));
                }
                Err(e) => warn!("failed to accept status connection: {e}"),
            },
        }
    }

    debug!("status listener stopped");

    Ok(())
}

async fn answer(mut stream: TcpStream, peer: SocketAddr, line: Arc<[u8]>) {
    if let Err(e) = stream.write_all(&line).await {
        debug!(%peer, "failed to send status: {e}");
    }
}

#[async_trait]
impl Module for StatusListener {
    fn module_name(&self) -> &str {
        Self::NAME
    }

    async fn cleanup(&self) -> Result<(), BoxError> {
        self.stop.cancel();
        self.listener.lock().take();

        Ok(())
    }
}
