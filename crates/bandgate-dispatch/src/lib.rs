//! Handler chain for the bandgate kiosk.
//!
//! A scan is processed by one *pass* over a [`HandlerRegistry`]: every
//! registered [`Handler`] runs once, in ascending priority order, on the
//! same thread. Handlers coordinate through the pass's [`Session`], which
//! lets one handler start background work or a stop signal that a later
//! handler joins or closes.

pub mod error;
pub mod handler;
pub mod registry;
pub mod session;

pub use bandgate_hardware::StopSignal;
pub use error::{DispatchError, EntryKind, HandlerError, HandlerResult, RegistryError, SessionError};
pub use handler::{FnHandler, Handler, handler_fn};
pub use registry::HandlerRegistry;
pub use session::{Session, SlotKey};
