//! Layered configuration.
//!
//! Each setting is taken from the first source that has it: command line,
//! `BANDGATE_*` environment variable, YAML file, built-in default. The YAML
//! file uses the same names as the flags, with underscores:
//!
//! ```yaml
//! api_url: https://rfid.example.com/api/v1.0
//! api_key: 0123456789abcdef
//! api_ssl_verify: /etc/bandgate/ca.pem
//! brightness: 80
//! sound_dir: /var/lib/bandgate/sounds
//! ```

use bandgate_core::constants::{
    DEFAULT_API_SSL_VERIFY, DEFAULT_API_URL, DEFAULT_AUTHORIZED_SOUND, DEFAULT_BRIGHTNESS,
    DEFAULT_CONFIG_FILE, DEFAULT_INNER_RING_SIZE, DEFAULT_LISTEN_ADDRESS, DEFAULT_LISTEN_PORT,
    DEFAULT_LOG_LEVEL, DEFAULT_OUTER_RING_SIZE, DEFAULT_PERMISSION, DEFAULT_READ_SOUND,
    DEFAULT_SOUND_DIR, DEFAULT_UNAUTHORIZED_SOUND, DEFAULT_VOLUME_LEVEL,
};
use bandgate_kiosk::KioskSettings;
use bandgate_network::{ServiceConfig, SslVerify};
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{Level, debug};

/// Access-control kiosk: reads bands, checks them against the
/// rfid-security service and shows the result.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "bandgate", version, about, long_about = None)]
#[command(args_override_self = true)]
pub struct Args {
    /// The YAML configuration file to load; a missing file is ignored
    #[arg(long, env = "BANDGATE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// The API key to authenticate to the rfid-security service
    #[arg(long, env = "BANDGATE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to a CA certificate used to verify the service, or false to
    /// skip verification (insecure)
    #[arg(long, env = "BANDGATE_API_SSL_VERIFY")]
    pub api_ssl_verify: Option<String>,

    /// The rfid-security service base URL
    #[arg(long, env = "BANDGATE_API_URL")]
    pub api_url: Option<String>,

    /// Sound played when a band is authorized (relative to the sound dir)
    #[arg(long, env = "BANDGATE_AUTHORIZED_SOUND")]
    pub authorized_sound: Option<String>,

    /// LED brightness, 0 to 255 inclusive
    #[arg(long, env = "BANDGATE_BRIGHTNESS", allow_negative_numbers = true)]
    pub brightness: Option<i64>,

    /// Number of LEDs in the inner ring
    #[arg(long, env = "BANDGATE_INNER_RING_SIZE")]
    pub inner_ring_size: Option<usize>,

    /// Address the UID bridge listens on. The bridge has no authentication.
    #[arg(long, env = "BANDGATE_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    /// Port the UID bridge listens on
    #[arg(long, env = "BANDGATE_LISTEN_PORT")]
    pub listen_port: Option<u16>,

    /// One of: trace, debug, info, warn, error
    #[arg(long, env = "BANDGATE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Include file and line in log lines (trace level only)
    #[arg(
        long,
        env = "BANDGATE_LOG_REPORT_CALLER",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub log_report_caller: Option<bool>,

    /// Number of LEDs in the outer ring
    #[arg(long, env = "BANDGATE_OUTER_RING_SIZE")]
    pub outer_ring_size: Option<usize>,

    /// Permission checked before authorizing a band
    #[arg(long, env = "BANDGATE_PERMISSION")]
    pub permission: Option<String>,

    /// Sound played when a band is read (relative to the sound dir)
    #[arg(long, env = "BANDGATE_READ_SOUND")]
    pub read_sound: Option<String>,

    /// Directory containing the sound files
    #[arg(long, env = "BANDGATE_SOUND_DIR", value_name = "PATH")]
    pub sound_dir: Option<PathBuf>,

    /// Sound played when a band is not authorized (relative to the sound dir)
    #[arg(long, env = "BANDGATE_UNAUTHORIZED_SOUND")]
    pub unauthorized_sound: Option<String>,

    /// Volume adjustment applied to the base volume
    #[arg(long, env = "BANDGATE_VOLUME_LEVEL", allow_negative_numbers = true)]
    pub volume_level: Option<f64>,

    /// Run on simulated devices, reading hex UIDs from stdin
    #[arg(
        long,
        env = "BANDGATE_SIMULATE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub simulate: Option<bool>,

    /// Download missing or outdated sounds from the service at startup
    #[arg(
        long,
        env = "BANDGATE_SYNC_SOUNDS",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub sync_sounds: Option<bool>,
}

/// Invalid configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {key}: '{value}'. Must be between {low} and {high} inclusive.")]
    OutOfRange {
        key: &'static str,
        value: i64,
        low: i64,
        high: i64,
    },

    #[error("Invalid value for {key}: '{value}'. {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid value for {key}: '{}'. {source}", path.display())]
    MissingFile {
        key: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// The setting that was rejected, if any.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::OutOfRange { key, .. }
            | Self::InvalidValue { key, .. }
            | Self::MissingFile { key, .. } => Some(*key),
            Self::Read { .. } | Self::Parse { .. } => None,
        }
    }
}

/// Settings as read from the YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    api_ssl_verify: Option<String>,
    api_url: Option<String>,
    authorized_sound: Option<String>,
    brightness: Option<i64>,
    inner_ring_size: Option<usize>,
    listen_address: Option<String>,
    listen_port: Option<u16>,
    log_level: Option<String>,
    log_report_caller: Option<bool>,
    outer_ring_size: Option<usize>,
    permission: Option<String>,
    read_sound: Option<String>,
    sound_dir: Option<PathBuf>,
    unauthorized_sound: Option<String>,
    volume_level: Option<f64>,
    simulate: Option<bool>,
    sync_sounds: Option<bool>,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Effective configuration.
#[derive(Clone)]
pub struct Config {
    pub config_file: PathBuf,
    pub api_key: String,
    pub api_ssl_verify: SslVerify,
    pub api_url: String,
    pub authorized_sound: String,
    pub brightness: u8,
    pub inner_ring_size: usize,
    pub listen_address: String,
    pub listen_port: u16,
    pub log_level: Level,
    pub log_report_caller: bool,
    pub outer_ring_size: usize,
    pub permission: String,
    pub read_sound: String,
    pub sound_dir: PathBuf,
    pub unauthorized_sound: String,
    pub volume_level: f64,
    pub simulate: bool,
    pub sync_sounds: bool,
}

impl Config {
    /// Merge `args` over the config file they name (or the default one) and
    /// validate the result.
    ///
    /// Sound files are not checked here; see [`validate_sounds`](Self::validate_sounds).
    pub fn load(args: Args) -> Result<Self, ConfigError> {
        let config_file = args
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let file = FileConfig::read(&config_file)?;
        let config = Self::merge(args, file, config_file)?;
        config.validate()?;
        Ok(config)
    }

    fn merge(args: Args, file: FileConfig, config_file: PathBuf) -> Result<Self, ConfigError> {
        fn pick<T>(arg: Option<T>, file: Option<T>, default: impl FnOnce() -> T) -> T {
            arg.or(file).unwrap_or_else(default)
        }
        let text = |value: &str| value.to_string();

        let brightness = pick(args.brightness, file.brightness, || i64::from(DEFAULT_BRIGHTNESS));
        let brightness = u8::try_from(brightness).map_err(|_| ConfigError::OutOfRange {
            key: "brightness",
            value: brightness,
            low: 0,
            high: i64::from(u8::MAX),
        })?;

        let log_level = pick(args.log_level, file.log_level, || text(DEFAULT_LOG_LEVEL));
        let log_level = parse_log_level(&log_level).ok_or_else(|| ConfigError::InvalidValue {
            key: "log_level",
            reason: "Must be one of: trace, debug, info, warn, error.".to_string(),
            value: log_level,
        })?;

        let ssl_verify = pick(args.api_ssl_verify, file.api_ssl_verify, || {
            text(DEFAULT_API_SSL_VERIFY)
        });
        let api_ssl_verify = SslVerify::parse(&ssl_verify).map_err(|e| ConfigError::InvalidValue {
            key: "api_ssl_verify",
            value: ssl_verify,
            reason: e.to_string(),
        })?;

        Ok(Self {
            config_file,
            api_key: pick(args.api_key, file.api_key, String::new),
            api_ssl_verify,
            api_url: pick(args.api_url, file.api_url, || text(DEFAULT_API_URL)),
            authorized_sound: pick(args.authorized_sound, file.authorized_sound, || {
                text(DEFAULT_AUTHORIZED_SOUND)
            }),
            brightness,
            inner_ring_size: pick(args.inner_ring_size, file.inner_ring_size, || {
                DEFAULT_INNER_RING_SIZE
            }),
            listen_address: pick(args.listen_address, file.listen_address, || {
                text(DEFAULT_LISTEN_ADDRESS)
            }),
            listen_port: pick(args.listen_port, file.listen_port, || DEFAULT_LISTEN_PORT),
            log_level,
            log_report_caller: pick(args.log_report_caller, file.log_report_caller, || false),
            outer_ring_size: pick(args.outer_ring_size, file.outer_ring_size, || {
                DEFAULT_OUTER_RING_SIZE
            }),
            permission: pick(args.permission, file.permission, || text(DEFAULT_PERMISSION)),
            read_sound: pick(args.read_sound, file.read_sound, || text(DEFAULT_READ_SOUND)),
            sound_dir: pick(args.sound_dir, file.sound_dir, || PathBuf::from(DEFAULT_SOUND_DIR)),
            unauthorized_sound: pick(args.unauthorized_sound, file.unauthorized_sound, || {
                text(DEFAULT_UNAUTHORIZED_SOUND)
            }),
            volume_level: pick(args.volume_level, file.volume_level, || DEFAULT_VOLUME_LEVEL),
            simulate: pick(args.simulate, file.simulate, || false),
            sync_sounds: pick(args.sync_sounds, file.sync_sounds, || false),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let SslVerify::CaFile(path) = &self.api_ssl_verify {
            check_exists("api_ssl_verify", path)?;
        }
        check_exists("sound_dir", &self.sound_dir)?;
        if !self.sound_dir.is_dir() {
            return Err(ConfigError::InvalidValue {
                key: "sound_dir",
                value: self.sound_dir.display().to_string(),
                reason: "Not a directory.".to_string(),
            });
        }
        Ok(())
    }

    /// Check that every configured sound exists in the sound directory.
    pub fn validate_sounds(&self) -> Result<(), ConfigError> {
        for (key, name) in [
            ("authorized_sound", &self.authorized_sound),
            ("read_sound", &self.read_sound),
            ("unauthorized_sound", &self.unauthorized_sound),
        ] {
            check_exists(key, &self.sound_dir.join(name))?;
        }
        Ok(())
    }

    /// `address:port` for the UID bridge.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_address, self.listen_port)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            ssl_verify: self.api_ssl_verify.clone(),
        }
    }

    pub fn kiosk_settings(&self) -> KioskSettings {
        KioskSettings {
            permission: self.permission.clone(),
            brightness: self.brightness,
            read_sound: self.read_sound.clone(),
            authorized_sound: self.authorized_sound.clone(),
            unauthorized_sound: self.unauthorized_sound.clone(),
        }
    }

    /// Log every setting at debug level. The API key is redacted.
    pub fn log_effective(&self) {
        debug!("{self:#?}");
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("config_file", &self.config_file)
            .field("api_key", &redacted(&self.api_key))
            .field("api_ssl_verify", &self.api_ssl_verify)
            .field("api_url", &self.api_url)
            .field("authorized_sound", &self.authorized_sound)
            .field("brightness", &self.brightness)
            .field("inner_ring_size", &self.inner_ring_size)
            .field("listen_address", &self.listen_address)
            .field("listen_port", &self.listen_port)
            .field("log_level", &self.log_level)
            .field("log_report_caller", &self.log_report_caller)
            .field("outer_ring_size", &self.outer_ring_size)
            .field("permission", &self.permission)
            .field("read_sound", &self.read_sound)
            .field("sound_dir", &self.sound_dir)
            .field("unauthorized_sound", &self.unauthorized_sound)
            .field("volume_level", &self.volume_level)
            .field("simulate", &self.simulate)
            .field("sync_sounds", &self.sync_sounds)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

fn check_exists(key: &'static str, path: &Path) -> Result<(), ConfigError> {
    std::fs::metadata(path)
        .map(|_| ())
        .map_err(|source| ConfigError::MissingFile {
            key,
            path: path.to_path_buf(),
            source,
        })
}

fn parse_log_level(text: &str) -> Option<Level> {
    match text.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" | "fatal" | "panic" => Some(Level::ERROR),
        _ => None,
    }
}
