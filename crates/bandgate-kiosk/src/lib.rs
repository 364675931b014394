//! The bandgate kiosk flow.
//!
//! A scan runs through two sections of handlers plus a final logging step:
//!
//! | Priority | Handler         | Does                                            |
//! |----------|-----------------|-------------------------------------------------|
//! | 10       | [`ReadSound`]   | starts the read sound                           |
//! | 11       | [`Spin`]        | starts the white chase                          |
//! | 12       | [`Authorize`]   | asks the service, classifies the event          |
//! | 13       | [`StopSpin`]    | joins the read sound, stops and joins the chase |
//! | 20       | [`ShowStatus`]  | starts fading on the status color               |
//! | 21       | [`AuthSound`]   | starts the authorized or unauthorized sound     |
//! | 22       | [`StopStatus`]  | joins both, fades off                           |
//! | 999      | [`Logging`]     | logs the outcome                                |
//!
//! [`build_registry`] registers all of them.

pub mod error;
pub mod handlers;
mod registry;

pub use error::KioskError;
pub use handlers::{
    AuthSound, Authorize, Logging, MEDIA_CONFIG, ReadSound, ShowStatus, Spin, StopSpin, StopStatus,
};
pub use registry::{KioskDeps, KioskSettings, build_registry, priority};
