//! Mock speaker that records what it was asked to play.

use crate::{Result, traits::AudioOutput, types::Sound};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

/// Mock speaker.
///
/// Without a sound directory any name loads; with one, [`load`](AudioOutput::load)
/// fails for files that do not exist, just like a real player would.
///
/// # Examples
///
/// ```
/// use bandgate_hardware::mock::MockAudio;
/// use bandgate_hardware::traits::AudioOutput;
///
/// let audio = MockAudio::new();
/// let sound = audio.load("read.wav").unwrap();
/// audio.play(&sound);
///
/// assert_eq!(audio.played(), vec!["read.wav".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct MockAudio {
    sound_dir: Option<PathBuf>,
    clip_length: Duration,
    volume: f64,
    played: Mutex<Vec<String>>,
}

impl MockAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only load sounds that exist in `dir`.
    pub fn with_sound_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sound_dir = Some(dir.into());
        self
    }

    /// How long each `play` blocks.
    pub fn with_clip_length(mut self, clip_length: Duration) -> Self {
        self.clip_length = clip_length;
        self
    }

    /// Volume adjustment relative to the base volume.
    pub fn with_volume(mut self, level: f64) -> Self {
        self.volume = level;
        self
    }

    /// Names of the sounds played so far, in order.
    pub fn played(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        match &self.sound_dir {
            Some(dir) => {
                let path = dir.join(name);
                std::fs::metadata(&path)?;
                Ok(path)
            }
            None => Ok(Path::new(name).to_path_buf()),
        }
    }
}

impl AudioOutput for MockAudio {
    fn load(&self, name: &str) -> Result<Sound> {
        let path = self.resolve(name)?;
        trace!(sound = %name, path = %path.display(), "Loaded sound");
        Ok(Sound::new(name, path))
    }

    fn play(&self, sound: &Sound) {
        debug!(sound = %sound.name(), volume = self.volume, "Playing sound");
        self.played
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sound.name().to_string());
        if !self.clip_length.is_zero() {
            std::thread::sleep(self.clip_length);
        }
    }
}
