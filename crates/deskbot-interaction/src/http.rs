//! HTTP error mapping shared by the provider clients.

use deskbot_core::error::DeskbotError;
use reqwest::{StatusCode, header::HeaderValue};
use std::time::Duration;

/// Maps a failed HTTP response to a domain error.
///
/// Rate limits and server errors are transient. Everything else is an
/// internal error; callers fall back to rules either way, so a bad key
/// surfaces in the logs rather than failing the turn.
pub(crate) fn map_http_error(
    provider: &'static str,
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
) -> DeskbotError {
    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    if is_retryable {
        let message = match retry_after {
            Some(delay) => format!("HTTP {}: {} (retry after {}s)", status.as_u16(), message, delay.as_secs()),
            None => format!("HTTP {}: {}", status.as_u16(), message),
        };
        DeskbotError::transient(provider, message)
    } else {
        DeskbotError::internal(format!("{} returned HTTP {}: {}", provider, status.as_u16(), message))
    }
}

/// Maps a transport-level failure.
pub(crate) fn map_request_error(provider: &'static str, err: reqwest::Error) -> DeskbotError {
    if err.is_connect() || err.is_timeout() {
        DeskbotError::transient(provider, format!("request failed: {err}"))
    } else {
        DeskbotError::internal(format!("{provider} request failed: {err}"))
    }
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // HTTP-date form is not supported
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
