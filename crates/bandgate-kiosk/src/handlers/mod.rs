//! Kiosk handlers.
//!
//! Handlers in one section hand work to each other through the pass's
//! session: a step starts a task (or a stop signal) under one of the names
//! below and a later step joins it.

mod authorize;
mod feedback;
mod logging;
mod status;

pub use authorize::Authorize;
pub use feedback::{ReadSound, Spin, StopSpin};
pub use logging::Logging;
pub use status::{AuthSound, ShowStatus, StopStatus};

use bandgate_dispatch::SlotKey;
use bandgate_network::MediaConfig;
use std::time::Duration;

/// Media config of a granted scan, put by [`Authorize`] and taken by
/// [`AuthSound`].
pub const MEDIA_CONFIG: SlotKey<MediaConfig> = SlotKey::new("media_config");

const READ_SOUND_TASK: &str = "read_sound";
const SPIN_TASK: &str = "spinning";
const STOP_SPINNING: &str = "stop_spinning";
const SHOW_STATUS_TASK: &str = "show_status";
const AUTH_SOUND_TASK: &str = "auth_sound";

const CHASE_WIDTH: usize = 8;
const REVERSE_SPIN: bool = true;
const FADE_STEP_DELAY: Duration = Duration::from_millis(5);
