//! Client for the rfid-security service.
//!
//! The service answers two questions: whether a band holds a permission
//! (with the guest's personal color and sound when it does) and which
//! sounds exist. Every request carries the kiosk's API key in the
//! `X-RFIDSECURITYSVC-API-KEY` header.
//!
//! # Example
//!
//! ```no_run
//! use bandgate_network::{Authorization, Authorizer, ServiceClient, ServiceConfig, SslVerify};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new(ServiceConfig {
//!     api_url: "https://localhost:5000/api/v1.0".to_string(),
//!     api_key: "secret".to_string(),
//!     ssl_verify: SslVerify::parse("ca.pem")?,
//! })?;
//!
//! // Authorization blocks, so it runs off the async runtime
//! let granted = tokio::task::spawn_blocking(move || {
//!     let uid = "04ABCDEF".parse().unwrap();
//!     matches!(client.authorize(&uid, "Open Door"), Authorization::Granted(_))
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

#![allow(async_fn_in_trait)]

use crate::error::ServiceError;
use crate::types::{MediaConfig, RemoteSound};
use bandgate_core::Uid;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Certificate, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-RFIDSECURITYSVC-API-KEY";

/// Timeout applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// The band holds the permission.
    Granted(MediaConfig),

    /// The band does not hold the permission, or the check failed.
    Denied,
}

/// Decides whether a band holds a permission.
///
/// Implementations block and must absorb their own failures: a check that
/// cannot be completed is a denial.
pub trait Authorizer: Send + Sync + 'static {
    fn authorize(&self, uid: &Uid, permission: &str) -> Authorization;
}

/// Source of the sound catalog.
pub trait SoundSource {
    /// List the available sounds, without content.
    async fn list_sounds(&self) -> Result<Vec<RemoteSound>, ServiceError>;

    /// Fetch one sound with its base64 content.
    async fn fetch_sound(&self, name: &str) -> Result<RemoteSound, ServiceError>;
}

/// TLS verification mode for the service connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SslVerify {
    /// Accept any certificate.
    Disabled,

    /// Trust only the CAs in this PEM file.
    CaFile(PathBuf),
}

impl SslVerify {
    /// Parse the `api_ssl_verify` setting: a false boolean disables
    /// verification, anything that is not a boolean is a CA file path.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::VerifyTrue` for a true boolean.
    ///
    /// # Examples
    ///
    /// ```
    /// use bandgate_network::SslVerify;
    ///
    /// assert_eq!(SslVerify::parse("false").unwrap(), SslVerify::Disabled);
    /// assert_eq!(SslVerify::parse("ca.pem").unwrap(), SslVerify::CaFile("ca.pem".into()));
    /// assert!(SslVerify::parse("true").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ServiceError> {
        match text {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Err(ServiceError::VerifyTrue),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(Self::Disabled),
            path => Ok(Self::CaFile(PathBuf::from(path))),
        }
    }
}

/// Connection settings for [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL; a trailing slash is added if missing.
    pub api_url: String,
    pub api_key: String,
    pub ssl_verify: SslVerify,
}

/// HTTP client for the rfid-security service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base: Url,
    runtime: Option<Handle>,
}

impl ServiceClient {
    /// Build a client. Reads the CA file, if one is configured.
    ///
    /// Captures the current Tokio runtime, when there is one, so that
    /// [`Authorizer::authorize`] can be called from blocking threads.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable URL, an API key that is not a
    /// valid header value, or an unreadable or invalid CA file.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let base = parse_base_url(&config.api_url)?;

        let mut key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| ServiceError::InvalidApiKey(e.to_string()))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT);
        builder = match &config.ssl_verify {
            SslVerify::Disabled => {
                warn!("TLS certificate verification is disabled for the service connection");
                builder.danger_accept_invalid_certs(true)
            }
            SslVerify::CaFile(path) => {
                let pem = std::fs::read(path).map_err(|source| ServiceError::CaFile {
                    path: path.display().to_string(),
                    source,
                })?;
                builder
                    .tls_built_in_root_certs(false)
                    .add_root_certificate(Certificate::from_pem(&pem)?)
            }
        };

        debug!(url = %base, "Created service client");
        Ok(Self {
            client: builder.build()?,
            base,
            runtime: Handle::try_current().ok(),
        })
    }

    /// Base URL of the service, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Ask the service whether `uid` holds `permission`.
    ///
    /// `200` grants; a body that is not a valid media config grants with the
    /// default config. `403` denies.
    ///
    /// # Errors
    ///
    /// Network failures and any other status are errors.
    pub async fn check_authorization(
        &self,
        uid: &Uid,
        permission: &str,
    ) -> Result<Authorization, ServiceError> {
        let url = self.endpoint(&["authorized", uid.as_str(), permission])?;
        let response = self.client.get(url.clone()).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                let config = serde_json::from_slice(&body).unwrap_or_else(|e| {
                    warn!(uid = %uid, error = %e, "Unreadable media config, using defaults");
                    MediaConfig::default()
                });
                Ok(Authorization::Granted(config))
            }
            StatusCode::FORBIDDEN => Ok(Authorization::Denied),
            status => Err(ServiceError::UnexpectedStatus {
                url: url.to_string(),
                expected: StatusCode::OK.as_u16(),
                actual: status.as_u16(),
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ServiceError> {
        let url = self.endpoint(segments)?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ServiceError::UnexpectedStatus {
                url: url.to_string(),
                expected: StatusCode::OK.as_u16(),
                actual: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ServiceError::InvalidUrl {
                url: self.base.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Authorizer for ServiceClient {
    fn authorize(&self, uid: &Uid, permission: &str) -> Authorization {
        let Some(runtime) = &self.runtime else {
            error!(uid = %uid, "No async runtime available for the authorization check");
            return Authorization::Denied;
        };

        match runtime.block_on(self.check_authorization(uid, permission)) {
            Ok(authorization) => {
                info!(
                    uid = %uid,
                    permission,
                    granted = matches!(authorization, Authorization::Granted(_)),
                    "Authorization checked"
                );
                authorization
            }
            Err(e @ ServiceError::UnexpectedStatus { .. }) => {
                error!(uid = %uid, error = %e, "Unexpected authorization response");
                Authorization::Denied
            }
            Err(e) => {
                warn!(uid = %uid, error = %e, "Authorization check failed, denying");
                Authorization::Denied
            }
        }
    }
}

impl SoundSource for ServiceClient {
    async fn list_sounds(&self) -> Result<Vec<RemoteSound>, ServiceError> {
        self.get_json(&["sounds"]).await
    }

    async fn fetch_sound(&self, name: &str) -> Result<RemoteSound, ServiceError> {
        self.get_json(&["sounds", name]).await
    }
}

fn parse_base_url(text: &str) -> Result<Url, ServiceError> {
    let with_slash = if text.ends_with('/') {
        text.to_string()
    } else {
        format!("{text}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| ServiceError::InvalidUrl {
        url: text.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ServiceError::InvalidUrl {
            url: text.to_string(),
            reason: "URL cannot be a base".to_string(),
        });
    }
    Ok(url)
}
