use crate::{Result, constants::MAX_UID_BYTES, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Tag identifier read from a proximity card.
///
/// Always non-empty uppercase hexadecimal text with two digits per byte,
/// at most [`MAX_UID_BYTES`] bytes long.
///
/// # Examples
///
/// ```
/// use bandgate_core::Uid;
///
/// let uid: Uid = "04abcdef".parse().unwrap();
/// assert_eq!(uid.as_str(), "04ABCDEF");
///
/// let uid = Uid::from_bytes(&[0x11, 0x22, 0x33, 0x44]).unwrap();
/// assert_eq!(uid.to_string(), "11223344");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Build a UID from the raw bytes reported by the reader.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if `bytes` is empty or longer than
    /// [`MAX_UID_BYTES`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::check_len(bytes.len())?;
        Ok(Uid(bytes.iter().map(|b| format!("{b:02X}")).collect()))
    }

    /// Get the UID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the UID back into raw bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0
            .as_bytes()
            .chunks(2)
            .filter_map(|pair| std::str::from_utf8(pair).ok())
            .filter_map(|digits| u8::from_str_radix(digits, 16).ok())
            .collect()
    }

    /// Number of bytes in the UID.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    fn check_len(len: usize) -> Result<()> {
        if !(1..=MAX_UID_BYTES).contains(&len) {
            return Err(Error::InvalidUid(format!(
                "UID must be 1-{MAX_UID_BYTES} bytes, got {len}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Uid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.len() % 2 != 0 {
            return Err(Error::InvalidUid(format!(
                "UID must have an even number of hex digits: {text:?}"
            )));
        }
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidUid(format!(
                "UID must be hexadecimal: {text:?}"
            )));
        }
        Self::check_len(text.len() / 2)?;
        Ok(Uid(text.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for Uid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

/// Outcome of the authorization step for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Not yet decided. Every event starts here.
    #[default]
    Unknown,

    /// The band holds the configured permission.
    Authorized,

    /// The band does not hold the permission, or the check failed.
    Unauthorized,
}

impl Classification {
    /// Whether the authorization step has run.
    #[must_use]
    pub fn is_decided(self) -> bool {
        !matches!(self, Classification::Unknown)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Classification::Unknown => "UNKNOWN",
            Classification::Authorized => "AUTHORIZED",
            Classification::Unauthorized => "UNAUTHORIZED",
        };
        f.write_str(text)
    }
}

/// One physical scan travelling through a single pass of the handler chain.
///
/// The classification is written exactly once by [`Event::classify`];
/// later writes are rejected so that no step can silently overrule the
/// authorization decision.
///
/// # Examples
///
/// ```
/// use bandgate_core::{Classification, Event, Uid};
///
/// let mut event = Event::new("AABBCC".parse::<Uid>().unwrap());
/// assert_eq!(event.classification(), Classification::Unknown);
///
/// event.classify(Classification::Authorized).unwrap();
/// assert!(event.classify(Classification::Unauthorized).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    uid: Uid,
    classification: Classification,
    scanned_at: DateTime<Utc>,
}

impl Event {
    /// Create an unclassified event stamped with the current time.
    pub fn new(uid: Uid) -> Self {
        Self {
            id: Uuid::new_v4(),
            uid,
            classification: Classification::Unknown,
            scanned_at: Utc::now(),
        }
    }

    /// Per-scan identifier used to correlate log lines.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    #[must_use]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    #[must_use]
    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }

    /// Record the authorization outcome.
    ///
    /// # Errors
    /// - `Error::AlreadyClassified` if a classification was already written.
    /// - `Error::InvalidClassification` if `classification` is `Unknown`.
    pub fn classify(&mut self, classification: Classification) -> Result<()> {
        if !classification.is_decided() {
            return Err(Error::InvalidClassification(classification));
        }
        if self.classification.is_decided() {
            return Err(Error::AlreadyClassified {
                uid: self.uid.to_string(),
                current: self.classification,
            });
        }
        self.classification = classification;
        Ok(())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event{{uid={}, type={}}}", self.uid, self.classification)
    }
}
