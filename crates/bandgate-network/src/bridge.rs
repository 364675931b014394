//! HTTP bridge: `GET /get_uid` hands the next scan to the caller.
//!
//! | Status | Body                              | When                                   |
//! |--------|-----------------------------------|----------------------------------------|
//! | 200    | the UID                           | a scan arrived before the deadline     |
//! | 400    | the parse error                   | `timeout` is not an integer            |
//! | 408    | `Timeout waiting for device data` | no scan before the deadline            |
//! | 503    | `Reader is shutting down`         | the router closed while waiting        |

use crate::error::TimeoutParseError;
use crate::mailbox::BridgeOutcome;
use crate::router::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bandgate_core::constants::{
    BRIDGE_PATH, BRIDGE_SHUTDOWN_MESSAGE, BRIDGE_TIMEOUT_MESSAGE, BRIDGE_TIMEOUT_PARAM,
    DEFAULT_BRIDGE_TIMEOUT_SECS,
};
use std::time::Duration;
use tracing::debug;

/// Build the bridge's HTTP routes.
pub fn http_router(router: Router) -> axum::Router {
    axum::Router::new()
        .route(BRIDGE_PATH, get(get_uid))
        .with_state(router)
}

async fn get_uid(
    State(router): State<Router>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let timeout = match params.iter().find(|(key, _)| key == BRIDGE_TIMEOUT_PARAM) {
        Some((_, text)) => match parse_timeout(text) {
            Ok(timeout) => timeout,
            Err(e) => return text_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => Duration::from_secs(DEFAULT_BRIDGE_TIMEOUT_SECS),
    };

    debug!(timeout = ?timeout, "Bridge caller waiting for a scan");
    match router.wait_for_event(timeout).await {
        BridgeOutcome::Delivered(event) => {
            debug!(uid = %event.uid(), "Bridge caller received scan");
            text_response(StatusCode::OK, event.uid().to_string())
        }
        BridgeOutcome::TimedOut => {
            debug!("Bridge caller timed out");
            text_response(StatusCode::REQUEST_TIMEOUT, BRIDGE_TIMEOUT_MESSAGE)
        }
        BridgeOutcome::Closed => {
            text_response(StatusCode::SERVICE_UNAVAILABLE, BRIDGE_SHUTDOWN_MESSAGE)
        }
    }
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response {
    (status, [(CONTENT_TYPE, "text/plain")], body.into()).into_response()
}

/// Parse the `timeout` query parameter as whole seconds.
///
/// Accepts an optional sign followed by decimal digits, or a `0x`, `0o` or
/// `0b` prefixed number; a leading `0` alone means octal. Zero and negative
/// values yield a zero timeout.
///
/// # Examples
///
/// ```
/// use bandgate_network::parse_timeout;
/// use std::time::Duration;
///
/// assert_eq!(parse_timeout("30").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_timeout("0x10").unwrap(), Duration::from_secs(16));
/// assert_eq!(parse_timeout("-5").unwrap(), Duration::ZERO);
/// assert!(parse_timeout("soon").is_err());
/// ```
pub fn parse_timeout(text: &str) -> Result<Duration, TimeoutParseError> {
    let seconds = parse_integer(text).map_err(|reason| TimeoutParseError {
        text: text.to_string(),
        reason,
    })?;
    Ok(Duration::from_secs(u64::try_from(seconds).unwrap_or(0)))
}

fn parse_integer(text: &str) -> Result<i64, String> {
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        Some("0o" | "0O") => (8, &unsigned[2..]),
        Some("0b" | "0B") => (2, &unsigned[2..]),
        _ if unsigned.len() > 1 && unsigned.starts_with('0') => (8, &unsigned[1..]),
        _ => (10, unsigned),
    };

    // from_str_radix would accept a second sign
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err("invalid syntax".to_string());
    }

    let magnitude = u64::from_str_radix(digits, radix).map_err(|e| e.to_string())?;
    let value = if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    };
    value.ok_or_else(|| "value out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("60", 60)]
    #[case("+7", 7)]
    #[case("0", 0)]
    #[case("0x1F", 31)]
    #[case("0o17", 15)]
    #[case("017", 15)]
    #[case("0b101", 5)]
    #[case("-1", -1)]
    #[case("-9223372036854775808", i64::MIN)]
    fn test_parse_integer(#[case] text: &str, #[case] expected: i64) {
        assert_eq!(parse_integer(text).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1.5")]
    #[case("--1")]
    #[case("+-1")]
    #[case("0x")]
    #[case("09")]
    #[case(" 5")]
    #[case("9223372036854775808")]
    fn test_parse_integer_invalid(#[case] text: &str) {
        assert!(parse_integer(text).is_err(), "{text:?} should be rejected");
    }

    #[test]
    fn test_parse_timeout_error_mentions_input() {
        let err = parse_timeout("abc").unwrap_err();
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_non_positive_timeout_is_zero() {
        assert_eq!(parse_timeout("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_timeout("-30").unwrap(), Duration::ZERO);
    }
}
