//! Core types shared by every bandgate crate.
//!
//! A scan produces a [`Uid`]; the kiosk wraps it in an [`Event`] that is
//! threaded through one pass of the handler chain, where the authorization
//! step writes its [`Classification`] exactly once.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
