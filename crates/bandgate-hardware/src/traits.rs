//! Hardware device trait definitions.
//!
//! These traits are the contract between the kiosk and its peripherals: the
//! card reader, the speaker and the LED rings. Real drivers block on the
//! bus, so every method is synchronous and is expected to be called from a
//! dedicated thread (the read worker, a session task, or a blocking pool
//! thread), never directly from an async task.
//!
//! All traits are object-safe and require `Send + Sync` so a single device
//! can be shared behind an `Arc` between the read loop and the handlers.

use crate::error::Result;
use crate::types::{Color, Sound};
use std::time::Duration;

/// Cooperative stop request for long-running light effects.
pub type StopSignal = tokio_util::sync::CancellationToken;

/// A proximity card reader that reports raw tag identifiers.
///
/// Implementations must tolerate [`halt`](UidDevice::halt) being called from
/// another thread while a [`read_uid`](UidDevice::read_uid) is blocked; the
/// blocked read must then return [`HardwareError::Halted`](crate::HardwareError::Halted)
/// promptly.
pub trait UidDevice: Send + Sync + 'static {
    /// Block until a tag is in the field or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// - `HardwareError::Halted` once the device has been halted
    /// - `HardwareError::Timeout` if no tag was presented in time
    /// - any other error for a transient bus or framing failure
    fn read_uid(&self, timeout: Duration) -> Result<Vec<u8>>;

    /// Interrupt any blocked read. Idempotent.
    fn halt(&self);

    /// Release the underlying bus. Called once, after [`halt`](UidDevice::halt).
    fn close(&self) -> Result<()>;
}

/// Sound output.
pub trait AudioOutput: Send + Sync + 'static {
    /// Locate a clip by file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the clip does not exist or cannot be decoded.
    fn load(&self, name: &str) -> Result<Sound>;

    /// Play a clip to the end. Blocks for the length of the clip; playback
    /// failures are logged by the implementation.
    fn play(&self, sound: &Sound);
}

/// A pair of addressable LED rings.
pub trait LightStrip: Send + Sync + 'static {
    /// Flash every pixel `times` times, `delay` on and `delay` off.
    fn blink(&self, color: Color, brightness: u8, times: u32, delay: Duration) -> Result<()>;

    /// Fill every pixel with `color` and ramp brightness up to `brightness`.
    fn fade_on(&self, color: Color, brightness: u8, step_delay: Duration) -> Result<()>;

    /// Ramp brightness down to zero, then clear.
    fn fade_off(&self, step_delay: Duration) -> Result<()>;

    /// Run a chase of `width` lit pixels around the rings until `stop` is
    /// cancelled, then clear. Returns early if the strip is closed.
    fn spin(
        &self,
        color: Color,
        brightness: u8,
        reverse: bool,
        width: usize,
        stop: &StopSignal,
    ) -> Result<()>;

    /// Turn everything off and release the strip. Idempotent.
    fn close(&self);
}
