//! Assembles the kiosk's handler chain.

use crate::error::KioskError;
use crate::handlers::{AuthSound, Authorize, Logging, ReadSound, ShowStatus, Spin, StopSpin, StopStatus};
use bandgate_core::constants::{
    DEFAULT_AUTHORIZED_SOUND, DEFAULT_BRIGHTNESS, DEFAULT_PERMISSION, DEFAULT_READ_SOUND,
    DEFAULT_UNAUTHORIZED_SOUND,
};
use bandgate_dispatch::HandlerRegistry;
use bandgate_hardware::{AudioOutput, LightStrip, Sound};
use bandgate_network::Authorizer;
use std::sync::Arc;
use tracing::debug;

/// Handler priorities. Tens digit is the section, units digit the step.
pub mod priority {
    pub const READ_SOUND: i32 = 10;
    pub const SPIN: i32 = 11;
    pub const AUTHORIZE: i32 = 12;
    pub const STOP_SPIN: i32 = 13;
    pub const SHOW_STATUS: i32 = 20;
    pub const AUTH_SOUND: i32 = 21;
    pub const STOP_STATUS: i32 = 22;
    pub const LOGGING: i32 = 999;
}

/// Settings the handlers are built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskSettings {
    /// Permission checked for every scan.
    pub permission: String,
    pub brightness: u8,
    pub read_sound: String,
    pub authorized_sound: String,
    pub unauthorized_sound: String,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            permission: DEFAULT_PERMISSION.to_string(),
            brightness: DEFAULT_BRIGHTNESS,
            read_sound: DEFAULT_READ_SOUND.to_string(),
            authorized_sound: DEFAULT_AUTHORIZED_SOUND.to_string(),
            unauthorized_sound: DEFAULT_UNAUTHORIZED_SOUND.to_string(),
        }
    }
}

/// Devices and services shared by the handlers.
#[derive(Clone)]
pub struct KioskDeps {
    pub audio: Arc<dyn AudioOutput>,
    pub lights: Arc<dyn LightStrip>,
    pub authorizer: Arc<dyn Authorizer>,
    pub settings: KioskSettings,
}

/// Load the configured sounds and register every kiosk handler.
///
/// # Errors
///
/// Returns [`KioskError::Sound`] if a configured sound cannot be loaded.
pub fn build_registry(deps: &KioskDeps) -> Result<HandlerRegistry, KioskError> {
    let settings = &deps.settings;
    let load = |role: &'static str, name: &str| -> Result<Sound, KioskError> {
        deps.audio.load(name).map_err(|source| KioskError::Sound {
            role,
            name: name.to_string(),
            source,
        })
    };
    let read_sound = load("read", &settings.read_sound)?;
    let authorized_sound = load("authorized", &settings.authorized_sound)?;
    let unauthorized_sound = load("unauthorized", &settings.unauthorized_sound)?;

    let mut registry = HandlerRegistry::new();
    registry.register(
        priority::READ_SOUND,
        ReadSound::new(Arc::clone(&deps.audio), read_sound),
    )?;
    registry.register(
        priority::SPIN,
        Spin::new(Arc::clone(&deps.lights), settings.brightness),
    )?;
    registry.register(
        priority::AUTHORIZE,
        Authorize::new(Arc::clone(&deps.authorizer), settings.permission.clone()),
    )?;
    registry.register(priority::STOP_SPIN, StopSpin)?;
    registry.register(
        priority::SHOW_STATUS,
        ShowStatus::new(Arc::clone(&deps.lights), settings.brightness),
    )?;
    registry.register(
        priority::AUTH_SOUND,
        AuthSound::new(Arc::clone(&deps.audio), authorized_sound, unauthorized_sound),
    )?;
    registry.register(
        priority::STOP_STATUS,
        StopStatus::new(Arc::clone(&deps.lights)),
    )?;
    registry.register(priority::LOGGING, Logging::new(settings.permission.clone()))?;

    debug!(priorities = ?registry.priorities(), "Kiosk handlers registered");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgate_core::Uid;
    use bandgate_hardware::mock::{MockAudio, MockLights};
    use bandgate_network::Authorization;

    struct DenyAll;

    impl Authorizer for DenyAll {
        fn authorize(&self, _uid: &Uid, _permission: &str) -> Authorization {
            Authorization::Denied
        }
    }

    fn deps(audio: MockAudio) -> KioskDeps {
        KioskDeps {
            audio: Arc::new(audio),
            lights: Arc::new(MockLights::new(4, 2)),
            authorizer: Arc::new(DenyAll),
            settings: KioskSettings::default(),
        }
    }

    #[test]
    fn test_registers_full_flow_in_order() {
        let registry = build_registry(&deps(MockAudio::new())).unwrap();

        assert_eq!(registry.priorities(), vec![10, 11, 12, 13, 20, 21, 22, 999]);
        let names: Vec<_> = registry.ordered().iter().map(|h| h.name().to_string()).collect();
        assert_eq!(
            names,
            [
                "read_sound",
                "spin",
                "authorize",
                "stop_spin",
                "show_status",
                "auth_sound",
                "stop_status",
                "logging"
            ]
        );
    }

    #[test]
    fn test_missing_sound_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("read.wav"), b"RIFF").unwrap();

        let err = build_registry(&deps(MockAudio::new().with_sound_dir(dir.path()))).unwrap_err();
        assert!(matches!(err, KioskError::Sound { role: "authorized", .. }));
    }
}
