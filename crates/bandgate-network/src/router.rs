//! The single serialization point between the card reader, the HTTP bridge
//! and the handler chain.

use crate::bridge::http_router;
use crate::error::{RouteError, ServerError};
use crate::mailbox::{BridgeOutcome, Mailbox};
use bandgate_core::Event;
use bandgate_dispatch::HandlerRegistry;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Where a routed scan went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Handed to the waiting bridge caller; the chain did not run.
    Bridge,

    /// Ran through the chain. Carries the event with its final classification.
    Chain(Event),
}

struct Inner {
    registry: Arc<HandlerRegistry>,
    mailbox: Mailbox,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

/// Hands each scan either to an armed bridge caller or to the handler chain.
///
/// Cloning is cheap; every clone routes through the same mailbox.
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

impl Router {
    /// Freeze `registry` and build a router around it.
    pub fn new(registry: HandlerRegistry) -> Self {
        let shutdown = CancellationToken::new();
        Self {
            inner: Arc::new(Inner {
                registry: Arc::new(registry),
                mailbox: Mailbox::new(shutdown.clone()),
                closed: AtomicBool::new(false),
                shutdown,
            }),
        }
    }

    /// Route one scan.
    ///
    /// An armed bridge caller takes the event exclusively. Otherwise the
    /// chain runs on the blocking pool and the classified event is returned.
    ///
    /// # Errors
    ///
    /// - [`RouteError::Closed`] after [`close`](Self::close)
    /// - [`RouteError::Dispatch`] when a handler aborted the pass
    /// - [`RouteError::Pass`] when the pass thread panicked
    pub async fn route(&self, event: Event) -> Result<Routed, RouteError> {
        if self.is_closed() {
            return Err(RouteError::Closed);
        }

        let uid = event.uid().clone();
        let event = match self.inner.mailbox.deliver(event) {
            Ok(()) => {
                info!(uid = %uid, "Scan handed to bridge caller");
                return Ok(Routed::Bridge);
            }
            Err(event) => event,
        };

        debug!(id = %event.id(), uid = %uid, "Running handler chain");
        let registry = Arc::clone(&self.inner.registry);
        let (event, result) = tokio::task::spawn_blocking(move || {
            let mut event = event;
            let result = registry.dispatch(&mut event);
            (event, result)
        })
        .await
        .map_err(|e| RouteError::Pass(e.to_string()))?;

        result?;
        Ok(Routed::Chain(event))
    }

    /// Wait up to `timeout` for the next scan, as a bridge caller does.
    pub async fn wait_for_event(&self, timeout: Duration) -> BridgeOutcome {
        self.inner.mailbox.wait_for_event(timeout).await
    }

    /// Whether a bridge caller is currently armed.
    pub fn has_waiting_caller(&self) -> bool {
        self.inner.mailbox.is_armed()
    }

    /// Stop routing, release bridge callers and shut the listener down.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("Closing router");
        self.inner.mailbox.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// The bridge's HTTP routes, bound to this router.
    pub fn http_app(&self) -> axum::Router {
        http_router(self.clone())
    }

    /// Bind `address` and serve the bridge until [`close`](Self::close).
    ///
    /// Returns the bound address and the server task.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn serve(&self, address: &str) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.to_string(),
                source,
            })?;
        let local = listener.local_addr()?;
        info!(address = %local, "Bridge listening");

        let app = self.http_app();
        let shutdown = self.inner.shutdown.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                error!(error = %e, "Bridge server failed");
            }
            debug!("Bridge server stopped");
        });

        Ok((local, task))
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("registry", &self.inner.registry)
            .field("closed", &self.is_closed())
            .field("waiting_caller", &self.has_waiting_caller())
            .finish()
    }
}
