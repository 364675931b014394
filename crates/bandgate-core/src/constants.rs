//! Shared constants for the bandgate kiosk.
//!
//! Values here are the defaults the binary falls back to when neither the
//! command line, the environment nor the YAML configuration file sets them,
//! plus the fixed strings of the HTTP bridge contract.
//!
//! # Usage
//!
//! ```
//! use bandgate_core::constants::*;
//! use std::time::Duration;
//!
//! let bridge_timeout = Duration::from_secs(DEFAULT_BRIDGE_TIMEOUT_SECS);
//! assert_eq!(bridge_timeout.as_secs(), 60);
//! assert_eq!(BRIDGE_TIMEOUT_MESSAGE, "Timeout waiting for device data");
//! ```

// ============================================================================
// HTTP Bridge
// ============================================================================

/// Path of the bridge endpoint that hands the next scan to an HTTP caller.
pub const BRIDGE_PATH: &str = "/get_uid";

/// Query parameter carrying the caller's timeout in seconds.
pub const BRIDGE_TIMEOUT_PARAM: &str = "timeout";

/// Timeout applied when the caller does not pass one (seconds).
pub const DEFAULT_BRIDGE_TIMEOUT_SECS: u64 = 60;

/// Body of the `408 Request Timeout` response.
pub const BRIDGE_TIMEOUT_MESSAGE: &str = "Timeout waiting for device data";

/// Body of the `503 Service Unavailable` response sent while shutting down.
pub const BRIDGE_SHUTDOWN_MESSAGE: &str = "Reader is shutting down";

// ============================================================================
// Card Reader
// ============================================================================

/// Timeout the main loop passes to each read (one day).
///
/// The loop simply reads again on expiry, so this only bounds how long a
/// single worker thread lives.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Maximum UID length in bytes (ISO 14443 triple-size UID).
pub const MAX_UID_BYTES: usize = 10;

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Configuration file loaded when `--config-file` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/bandgate/bandgate.yaml";

/// Prefix of every environment variable the binary reads.
pub const ENV_PREFIX: &str = "BANDGATE_";

/// Base URL of the rfid-security service.
pub const DEFAULT_API_URL: &str = "https://localhost:5000/api/v1.0";

/// Either `false` (skip TLS verification) or the CA bundle path.
pub const DEFAULT_API_SSL_VERIFY: &str = "ca.pem";

/// Permission checked for every scan.
pub const DEFAULT_PERMISSION: &str = "Open Door";

/// Address the bridge listens on. The bridge has no authentication, so
/// binding anything other than loopback is discouraged.
pub const DEFAULT_LISTEN_ADDRESS: &str = "localhost";

/// Port the bridge listens on.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Default `tracing` level directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Directory holding the sound files.
pub const DEFAULT_SOUND_DIR: &str = "/sounds";

/// Sound played as soon as a band is read.
pub const DEFAULT_READ_SOUND: &str = "read.wav";

/// Sound played when a band is authorized and no personal sound is set.
pub const DEFAULT_AUTHORIZED_SOUND: &str = "authorized.wav";

/// Sound played when a band is not authorized.
pub const DEFAULT_UNAUTHORIZED_SOUND: &str = "unauthorized.wav";

/// Volume adjustment applied to the base volume.
pub const DEFAULT_VOLUME_LEVEL: f64 = 0.0;

/// LED brightness, 0 (off) to 255.
pub const DEFAULT_BRIGHTNESS: u8 = 100;

/// Number of pixels in the outer ring.
pub const DEFAULT_OUTER_RING_SIZE: usize = 40;

/// Number of pixels in the inner ring.
pub const DEFAULT_INNER_RING_SIZE: usize = 20;
