//! Mock device implementations for testing and development.
//!
//! These devices can be driven programmatically without physical hardware.
//! The `--simulate` mode of the binary runs the whole kiosk on them.

pub mod audio;
pub mod lights;
pub mod uid;

pub use audio::MockAudio;
pub use lights::{LightEffect, MockLights};
pub use uid::{MockUidDevice, MockUidHandle};
