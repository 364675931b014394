//! Error types for registration, session bookkeeping and dispatch.

use bandgate_hardware::HardwareError;
use std::fmt;
use thiserror::Error;

/// Result type alias for handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Kind of a live session entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Task,
    Payload,
    Signal,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EntryKind::Task => "task",
            EntryKind::Payload => "payload",
            EntryKind::Signal => "signal",
        };
        f.write_str(text)
    }
}

/// Registration errors. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Priority {priority} is already taken by handler {existing}")]
    Conflict { priority: i32, existing: String },
}

/// Misuse of the per-pass session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session entry '{name}' is already live")]
    NameCollision { name: String },

    #[error("No live session entry named '{name}'")]
    NotLive { name: String },

    #[error("Session entry '{name}' is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: EntryKind,
        found: EntryKind,
    },

    #[error("Task '{name}' panicked")]
    TaskPanicked { name: String },

    #[error("Failed to spawn task '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Session entries left at the end of the pass: {}", .0.join(", "))]
    LeakedEntries(Vec<String>),
}

/// Failure of a single handler. Aborts the rest of the pass.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Event(#[from] bandgate_core::Error),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Create a free-form handler failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Outcome of a pass that did not complete cleanly.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Handler {handler} (priority {priority}) failed: {source}")]
    Handler {
        priority: i32,
        handler: String,
        #[source]
        source: HandlerError,
    },

    #[error("Session entries left at the end of the pass: {}", .0.join(", "))]
    LeakedEntries(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_names_existing_handler() {
        let error = RegistryError::Conflict {
            priority: 12,
            existing: "authorize".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Priority 12 is already taken by handler authorize"
        );
    }

    #[test]
    fn test_wrong_kind_message() {
        let error = SessionError::WrongKind {
            name: "spinning".to_string(),
            expected: EntryKind::Task,
            found: EntryKind::Signal,
        };
        assert_eq!(
            error.to_string(),
            "Session entry 'spinning' is a signal, expected a task"
        );
    }

    #[test]
    fn test_leaked_entries_message() {
        let error = DispatchError::LeakedEntries(vec!["a".into(), "b".into()]);
        assert_eq!(
            error.to_string(),
            "Session entries left at the end of the pass: a, b"
        );
    }

    #[test]
    fn test_handler_error_from_session() {
        let error: HandlerError = SessionError::NotLive {
            name: "read_sound".into(),
        }
        .into();
        assert!(matches!(error, HandlerError::Session(_)));
    }
}
