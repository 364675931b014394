//! Section two: show the outcome.

use super::{AUTH_SOUND_TASK, FADE_STEP_DELAY, MEDIA_CONFIG, SHOW_STATUS_TASK};
use bandgate_core::{Classification, Event};
use bandgate_dispatch::{Handler, HandlerResult, Session};
use bandgate_hardware::{AudioOutput, Color, LightStrip, Sound};
use bandgate_network::MediaConfig;
use std::sync::Arc;
use tracing::{error, info, trace, warn};

const DEFAULT_AUTHORIZED_COLOR: Color = Color::Green;
const UNAUTHORIZED_COLOR: Color = Color::Blue;

/// Fades the rings on in the media's color, or blue when unauthorized.
pub struct ShowStatus {
    lights: Arc<dyn LightStrip>,
    brightness: u8,
}

impl ShowStatus {
    pub fn new(lights: Arc<dyn LightStrip>, brightness: u8) -> Self {
        Self { lights, brightness }
    }
}

impl Handler for ShowStatus {
    fn handle(&self, event: &mut Event, session: &mut Session) -> HandlerResult {
        trace!("Showing status");
        let color = match event.classification() {
            Classification::Authorized => resolve_color(session.get(&MEDIA_CONFIG)),
            Classification::Unauthorized => UNAUTHORIZED_COLOR,
            Classification::Unknown => return Ok(()),
        };

        let lights = Arc::clone(&self.lights);
        let brightness = self.brightness;
        session.start_async(SHOW_STATUS_TASK, move || {
            if let Err(e) = lights.fade_on(color, brightness, FADE_STEP_DELAY) {
                warn!(error = %e, "Fade on failed");
            }
        })?;
        Ok(())
    }

    fn name(&self) -> &str {
        "show_status"
    }
}

fn resolve_color(config: Option<&MediaConfig>) -> Color {
    let Some(config) = config else {
        error!("No media config for an authorized scan, using the default color");
        return DEFAULT_AUTHORIZED_COLOR;
    };
    match &config.color {
        Some(color) => Color::from_u32(color.int),
        None => {
            info!("No color configured for this media, using the default color");
            DEFAULT_AUTHORIZED_COLOR
        }
    }
}

/// Plays the media's sound (or the default authorized sound), or the
/// unauthorized sound. Consumes the media config.
pub struct AuthSound {
    audio: Arc<dyn AudioOutput>,
    authorized: Sound,
    unauthorized: Sound,
}

impl AuthSound {
    pub fn new(audio: Arc<dyn AudioOutput>, authorized: Sound, unauthorized: Sound) -> Self {
        Self {
            audio,
            authorized,
            unauthorized,
        }
    }

    fn resolve_sound(&self, config: Option<MediaConfig>) -> Sound {
        let Some(config) = config else {
            error!("No media config for an authorized scan, using the default sound");
            return self.authorized.clone();
        };
        let Some(name) = config.sound_name() else {
            info!("No sound configured for this media, using the default sound");
            return self.authorized.clone();
        };
        self.audio.load(name).unwrap_or_else(|e| {
            error!(sound = name, error = %e, "Unable to load the media sound, using the default sound");
            self.authorized.clone()
        })
    }
}

impl Handler for AuthSound {
    fn handle(&self, event: &mut Event, session: &mut Session) -> HandlerResult {
        trace!("Playing the auth sound");
        let sound = match event.classification() {
            Classification::Authorized => self.resolve_sound(session.take(&MEDIA_CONFIG)),
            Classification::Unauthorized => self.unauthorized.clone(),
            Classification::Unknown => return Ok(()),
        };

        let audio = Arc::clone(&self.audio);
        session.start_async(AUTH_SOUND_TASK, move || audio.play(&sound))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "auth_sound"
    }
}

/// Waits for the status sound and fade, then fades the rings off.
pub struct StopStatus {
    lights: Arc<dyn LightStrip>,
}

impl StopStatus {
    pub fn new(lights: Arc<dyn LightStrip>) -> Self {
        Self { lights }
    }
}

impl Handler for StopStatus {
    fn handle(&self, _event: &mut Event, session: &mut Session) -> HandlerResult {
        trace!("Waiting for the auth sound to stop");
        for task in [AUTH_SOUND_TASK, SHOW_STATUS_TASK] {
            if session.is_live(task) {
                session.await_and_clear(task)?;
            }
        }
        self.lights.fade_off(FADE_STEP_DELAY)?;
        trace!("Auth sound has stopped");
        Ok(())
    }

    fn name(&self) -> &str {
        "stop_status"
    }
}
