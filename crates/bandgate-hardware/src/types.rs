//! Common types shared across the kiosk peripherals.
//!
//! Colors are expressed as plain RGB; brightness is applied separately by
//! the light strip so that a fade only has to step one value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Colors used for visual feedback on the LED rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Color {
    /// LEDs off.
    Off,

    /// Red.
    Red,

    /// Green. Shown for an authorized band without a personal color.
    Green,

    /// Blue. Shown for an unauthorized band.
    Blue,

    /// Yellow.
    Yellow,

    /// Orange.
    Orange,

    /// White. Used for the startup blink and the reading spinner.
    White,

    /// Custom RGB color (red, green, blue).
    Custom(u8, u8, u8),
}

impl Color {
    /// Create a custom RGB color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Custom(r, g, b)
    }

    /// Decode a packed `0xRRGGBB` value. Bits above the low 24 are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use bandgate_hardware::types::Color;
    ///
    /// assert_eq!(Color::from_u32(0xFF8000).as_rgb(), (255, 128, 0));
    /// ```
    pub fn from_u32(value: u32) -> Self {
        let [_, r, g, b] = value.to_be_bytes();
        Self::Custom(r, g, b)
    }

    /// Pack the color as `0xRRGGBB`.
    pub fn to_u32(&self) -> u32 {
        let (r, g, b) = self.as_rgb();
        u32::from_be_bytes([0, r, g, b])
    }

    /// Get the RGB components of the color.
    pub fn as_rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Off => (0, 0, 0),
            Self::Red => (255, 0, 0),
            Self::Green => (0, 255, 0),
            Self::Blue => (0, 0, 255),
            Self::Yellow => (255, 255, 0),
            Self::Orange => (255, 165, 0),
            Self::White => (255, 255, 255),
            Self::Custom(r, g, b) => (*r, *g, *b),
        }
    }

    /// Whether every channel is zero.
    pub fn is_off(&self) -> bool {
        self.as_rgb() == (0, 0, 0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.to_u32())
    }
}

/// A sound clip that has been located and is ready to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sound {
    name: String,
    path: PathBuf,
}

impl Sound {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// File name the sound was loaded by.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
