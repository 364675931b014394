//! Error types for routing, the HTTP bridge and the remote service.

use bandgate_dispatch::DispatchError;
use thiserror::Error;

/// Errors returned by [`Router::route`](crate::Router::route).
#[derive(Debug, Error)]
pub enum RouteError {
    /// The router has been closed; the event was not processed.
    #[error("Router is closed")]
    Closed,

    /// The handler chain aborted.
    #[error("Handler chain failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The thread running the pass panicked or was cancelled.
    #[error("Handler chain did not complete: {0}")]
    Pass(String),
}

/// Errors that can occur while running the HTTP listener.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected `timeout` query parameter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid timeout {text:?}: {reason}")]
pub struct TimeoutParseError {
    pub text: String,
    pub reason: String,
}

/// Errors talking to the rfid-security service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// `api_ssl_verify` was `true`; it must be `false` or a CA file path.
    #[error("api_ssl_verify can not be set to true, use false or a CA certificate file")]
    VerifyTrue,

    #[error("Invalid service URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("Failed to read CA certificate {path}: {source}")]
    CaFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Bad response from '{url}', expected {expected} but received {actual}")]
    UnexpectedStatus {
        url: String,
        expected: u16,
        actual: u16,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid sound content for {name}: {reason}")]
    Content { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
