//! Errors raised while assembling the kiosk.

use bandgate_dispatch::RegistryError;
use bandgate_hardware::HardwareError;
use thiserror::Error;

/// The kiosk could not be built. Fatal at startup.
#[derive(Debug, Error)]
pub enum KioskError {
    #[error("Failed to load {role} sound '{name}': {source}")]
    Sound {
        role: &'static str,
        name: String,
        #[source]
        source: HardwareError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
