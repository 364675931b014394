//! Hardware abstraction layer for the bandgate kiosk.
//!
//! This crate provides trait-based abstractions for the peripherals of a
//! wristband kiosk: a proximity card reader, a speaker and a pair of
//! addressable LED rings. Mock implementations of every trait live in
//! [`mock`] and are what the test suites and the `--simulate` mode run on.
//!
//! # Blocking Devices
//!
//! Reader, speaker and LED drivers all block on their bus, so the traits in
//! [`traits`] are synchronous. The async side of the kiosk never calls them
//! directly:
//!
//! - [`CardReader`] runs each read on a dedicated worker thread and races it
//!   against a timeout with Tokio.
//! - Handler tasks run on their own threads and may block freely.
//!
//! ```
//! use bandgate_hardware::mock::MockUidDevice;
//! use bandgate_hardware::{CardReader, ReadOutcome};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> bandgate_hardware::Result<()> {
//!     let (device, _handle) = MockUidDevice::new();
//!     let reader = CardReader::new(device);
//!
//!     // Nobody presents a band
//!     let outcome = reader.read(Duration::from_millis(50)).await?;
//!     assert_eq!(outcome, ReadOutcome::TimedOut);
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] which uses the
//! [`HardwareError`] error type. Only [`HardwareError::Halted`] ends a read;
//! the read loop retries every other error.
//!
//! # Thread Safety
//!
//! All traits require `Send + Sync + 'static` so one device can be shared
//! behind an `Arc` by the read loop, the handlers and the shutdown path.

pub mod error;
pub mod mock;
pub mod reader;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use reader::{CardReader, ReadOutcome};
pub use traits::{AudioOutput, LightStrip, StopSignal, UidDevice};
pub use types::{Color, Sound};
