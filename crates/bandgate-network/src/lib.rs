//! Network side of the bandgate kiosk.
//!
//! - [`Router`] decides, per scan, between an HTTP caller blocked on
//!   `GET /get_uid` and the handler chain. The bridge and the router share a
//!   single-slot mailbox so that each scan goes to exactly one of them.
//! - [`ServiceClient`] talks to the rfid-security service: authorization
//!   checks for the chain and the sound catalog for [`sync_sounds`].
//!
//! # Example
//!
//! ```no_run
//! use bandgate_dispatch::HandlerRegistry;
//! use bandgate_network::Router;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new(HandlerRegistry::new());
//! let (address, server) = router.serve("localhost:8080").await?;
//! println!("bridge on http://{address}/get_uid");
//!
//! router.close();
//! server.await?;
//! # Ok(())
//! # }
//! ```

mod bridge;
pub mod catalog;
pub mod error;
mod mailbox;
mod router;
pub mod service;
pub mod types;

pub use bridge::{http_router, parse_timeout};
pub use catalog::{SyncReport, sync_sounds};
pub use error::{RouteError, ServerError, ServiceError, TimeoutParseError};
pub use mailbox::BridgeOutcome;
pub use router::{Routed, Router};
pub use service::{Authorization, Authorizer, ServiceClient, ServiceConfig, SoundSource, SslVerify};
pub use types::{Guest, Media, MediaColor, MediaConfig, Permission, RemoteSound};
