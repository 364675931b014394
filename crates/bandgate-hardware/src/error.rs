//! Error types for hardware operations.
//!
//! This module defines error types specific to the kiosk peripherals: the
//! card reader, the speaker and the LED rings. A halt is the only reader
//! error that ends a read; everything else is treated as transient by the
//! read loop.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The device was halted, usually because the kiosk is shutting down.
    #[error("Device halted")]
    Halted,

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Whether this error is the reader's halt signal.
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halted_error() {
        let error = HardwareError::Halted;
        assert!(error.is_halt());
        assert_eq!(error.to_string(), "Device halted");
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(3000);
        assert!(matches!(error, HardwareError::Timeout { .. }));
        assert!(!error.is_halt());
        assert_eq!(error.to_string(), "Operation timeout after 3000ms");
    }

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("CRC mismatch");
        assert!(matches!(error, HardwareError::CommunicationError { .. }));
        assert_eq!(error.to_string(), "Communication error: CRC mismatch");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "read.wav");
        let error: HardwareError = io.into();
        assert!(matches!(error, HardwareError::Io(_)));
    }
}
