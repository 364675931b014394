//! Wire types of the rfid-security service.
//!
//! Every field is optional on the wire; a missing or `null` value
//! deserializes to `None` so that a partially filled record still grants
//! access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered wristband or card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "desc")]
    pub description: Option<String>,
}

/// A permission the media was checked against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "desc")]
    pub description: Option<String>,
}

/// The guest a media belongs to, with their personal preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub sound: Option<RemoteSound>,
    #[serde(default)]
    pub color: Option<MediaColor>,
}

/// A sound stored by the service. `content` is base64 and only filled in
/// when a single sound is fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSound {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub last_update_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A color in the service's three encodings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaColor {
    /// Packed `0xRRGGBB`.
    #[serde(default)]
    pub int: u32,
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

/// Extended result of a granted authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(default)]
    pub permission: Option<Permission>,
    #[serde(default)]
    pub guest: Option<Guest>,
    #[serde(default)]
    pub sound: Option<RemoteSound>,
    #[serde(default)]
    pub color: Option<MediaColor>,
}

impl MediaConfig {
    /// The sound to play for this media, if one is configured.
    pub fn sound_name(&self) -> Option<&str> {
        self.sound.as_ref().map(|s| s.name.as_str())
    }
}
