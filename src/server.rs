//! TCP Server
//!
//! Owns the listening socket, the storage engine and admission control.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──bind()──> Listening ──stop()──> Draining ──(handlers done)──> Stopped
//! ```
//!
//! `run()` is the accept loop. Every accepted socket either takes an
//! admission slot and gets its own handler task, or is closed at once
//! without a single byte written. `stop()` closes the listener right away
//! and then waits for every handler task to finish (graceful drain).

use crate::commands::CommandHandler;
use crate::config::{ConnectionLimits, ServerConfig};
use crate::connection::{Admission, ConnectionHandler, ConnectionStats};
use crate::storage::StorageEngine;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

/// Delay before retrying after a failed accept
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Lifecycle state of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed, no socket yet
    Created,
    /// Bound and accepting connections
    Listening,
    /// Listener closed, waiting for handlers to finish
    Draining,
    /// Listener closed and every handler finished
    Stopped,
}

/// Errors returned by [`Server`] operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server is not listening")]
    NotListening,
}

/// The linekv TCP server.
///
/// Share it behind an `Arc` to call `stop()` while `run()` is in progress.
///
/// # Example
///
/// ```no_run
/// use linekv::config::ServerConfig;
/// use linekv::server::Server;
/// use linekv::storage::StorageEngine;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), linekv::server::ServerError> {
/// let server = Arc::new(Server::new(ServerConfig::default(), Arc::new(StorageEngine::new())));
/// server.bind().await?;
///
/// let runner = Arc::clone(&server);
/// tokio::spawn(async move { runner.run().await });
///
/// // ... later
/// server.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    config: ServerConfig,
    commands: CommandHandler,
    admission: Arc<Admission>,
    stats: Arc<ConnectionStats>,

    /// Held by the accept loop for as long as it runs
    listener: Mutex<Option<TcpListener>>,
    local_addr: std::sync::Mutex<Option<SocketAddr>>,

    /// Current lifecycle state; the accept loop watches it for stop requests
    state: watch::Sender<ServerState>,

    /// Tracks every spawned connection handler
    tracker: TaskTracker,
}

impl Server {
    /// Creates a server in the `Created` state.
    pub fn new(config: ServerConfig, storage: Arc<StorageEngine>) -> Self {
        let admission = Arc::new(Admission::new(config.max_connections));
        let (state, _) = watch::channel(ServerState::Created);

        Self {
            config,
            commands: CommandHandler::new(storage),
            admission,
            stats: Arc::new(ConnectionStats::new()),
            listener: Mutex::new(None),
            local_addr: std::sync::Mutex::new(None),
            state,
            tracker: TaskTracker::new(),
        }
    }

    /// Binds the listening socket and moves to `Listening`.
    ///
    /// Returns the bound address (useful when binding to port 0).
    pub async fn bind(&self) -> Result<SocketAddr, ServerError> {
        if self.state() != ServerState::Created {
            return Err(ServerError::NotListening);
        }
        let mut slot = self.listener.lock().await;
        if slot.is_some() || self.state() != ServerState::Created {
            return Err(ServerError::NotListening);
        }

        let bind_error = |source| ServerError::Bind {
            addr: self.config.address.clone(),
            source,
        };
        let listener = TcpListener::bind(self.config.address.as_str())
            .await
            .map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?;

        *slot = Some(listener);
        *self.lock_local_addr() = Some(addr);
        self.state.send_replace(ServerState::Listening);

        info!(
            address = %addr,
            max_connections = self.config.max_connections,
            "Listening for connections"
        );
        Ok(addr)
    }

    /// Runs the accept loop until `stop()` is called.
    ///
    /// Fails with `NotListening` if the server was never bound or has
    /// already been stopped.
    pub async fn run(&self) -> Result<(), ServerError> {
        let mut slot = self.listener.lock().await;
        let listener = slot.as_ref().ok_or(ServerError::NotListening)?;
        let mut state = self.state.subscribe();

        loop {
            debug!(
                clients = self.admission.active(),
                max_connections = self.config.max_connections,
                "Waiting for client"
            );

            tokio::select! {
                biased;
                // The watch::Ref must not outlive this arm
                _ = state.wait_for(|s| *s != ServerState::Listening).map(|_| ()) => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr),
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
            }
        }

        // Close the listening socket
        slot.take();
        info!("Listener closed");
        Ok(())
    }

    /// Admits the connection and spawns its handler, or closes it.
    fn admit(&self, stream: TcpStream, addr: SocketAddr) {
        let Some(permit) = self.admission.try_admit() else {
            info!(client = %addr, "Too many connections, discarding client");
            drop(stream);
            return;
        };

        let handler = ConnectionHandler::new(
            stream,
            addr,
            self.commands.clone(),
            Arc::clone(&self.stats),
            self.config.limits,
            permit,
        );

        self.spawn_handler(addr, handler.run());
    }

    /// Spawns a tracked handler task. A panic stays inside the task and is
    /// logged; the permit it owns is released during unwinding.
    fn spawn_handler<F>(&self, addr: SocketAddr, handler: F)
    where
        F: Future + Send + 'static,
    {
        self.tracker.spawn(async move {
            if let Err(panic) = AssertUnwindSafe(handler).catch_unwind().await {
                error!(
                    client = %addr,
                    panic = panic_message(panic.as_ref()),
                    "Connection handler panicked"
                );
            }
        });
    }

    /// Stops accepting connections and waits for open connections to finish.
    ///
    /// The listener is closed before the drain starts. Calling `stop()` again
    /// (or concurrently) is harmless.
    pub async fn stop(&self) {
        let stopping = self.state.send_if_modified(|state| match state {
            ServerState::Created | ServerState::Listening => {
                *state = ServerState::Draining;
                true
            }
            ServerState::Draining | ServerState::Stopped => false,
        });
        if stopping {
            info!(
                active = self.admission.active(),
                "Stopping server, draining connections"
            );
        }

        // Acquired once the accept loop has released the listener
        if self.listener.lock().await.take().is_some() {
            debug!("Listener closed before accept loop started");
        }

        self.tracker.close();
        self.tracker.wait().await;

        if self.state.send_replace(ServerState::Stopped) != ServerState::Stopped {
            info!(
                handled = self.admission.handled(),
                discarded = self.admission.discarded(),
                "Server stopped"
            );
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.lock_local_addr().ok_or(ServerError::NotListening)
    }

    /// Number of connections admitted so far.
    pub fn clients_handled(&self) -> u64 {
        self.admission.handled()
    }

    /// Number of connections rejected by admission control.
    pub fn clients_discarded(&self) -> u64 {
        self.admission.discarded()
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.admission.active()
    }

    /// Statistics shared by all connection handlers.
    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        self.commands.storage()
    }

    pub fn limits(&self) -> ConnectionLimits {
        self.config.limits
    }

    fn lock_local_addr(&self) -> std::sync::MutexGuard<'_, Option<SocketAddr>> {
        self.local_addr
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
