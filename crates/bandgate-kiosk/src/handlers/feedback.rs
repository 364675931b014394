//! Section one: immediate feedback while the authorization check runs.

use super::{CHASE_WIDTH, READ_SOUND_TASK, REVERSE_SPIN, SPIN_TASK, STOP_SPINNING};
use bandgate_core::Event;
use bandgate_dispatch::{Handler, HandlerResult, Session};
use bandgate_hardware::{AudioOutput, Color, LightStrip, Sound};
use std::sync::Arc;
use tracing::{trace, warn};

/// Plays the read sound in the background.
pub struct ReadSound {
    audio: Arc<dyn AudioOutput>,
    sound: Sound,
}

impl ReadSound {
    pub fn new(audio: Arc<dyn AudioOutput>, sound: Sound) -> Self {
        Self { audio, sound }
    }
}

impl Handler for ReadSound {
    fn handle(&self, _event: &mut Event, session: &mut Session) -> HandlerResult {
        trace!(sound = self.sound.name(), "Playing the read sound");
        let audio = Arc::clone(&self.audio);
        let sound = self.sound.clone();
        session.start_async(READ_SOUND_TASK, move || audio.play(&sound))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "read_sound"
    }
}

/// Chases white around the rings until [`StopSpin`] stops it.
pub struct Spin {
    lights: Arc<dyn LightStrip>,
    brightness: u8,
}

impl Spin {
    pub fn new(lights: Arc<dyn LightStrip>, brightness: u8) -> Self {
        Self { lights, brightness }
    }
}

impl Handler for Spin {
    fn handle(&self, _event: &mut Event, session: &mut Session) -> HandlerResult {
        trace!("Spinning the lights");
        let stop = session.create_signal(STOP_SPINNING)?;
        let lights = Arc::clone(&self.lights);
        let brightness = self.brightness;
        session.start_async(SPIN_TASK, move || {
            if let Err(e) = lights.spin(Color::White, brightness, REVERSE_SPIN, CHASE_WIDTH, &stop) {
                warn!(error = %e, "Spin failed");
            }
        })?;
        Ok(())
    }

    fn name(&self) -> &str {
        "spin"
    }
}

/// Waits for the read sound, then stops the chase and waits for it to end.
pub struct StopSpin;

impl Handler for StopSpin {
    fn handle(&self, _event: &mut Event, session: &mut Session) -> HandlerResult {
        trace!("Stopping the spin");
        session.await_and_clear(READ_SOUND_TASK)?;
        session.close_signal(STOP_SPINNING)?;
        session.await_and_clear(SPIN_TASK)?;
        trace!("Spinning has stopped");
        Ok(())
    }

    fn name(&self) -> &str {
        "stop_spin"
    }
}
