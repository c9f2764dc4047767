//! Error types surfaced by the route session.
//!
//! Everything here is recoverable: the controller turns each variant into a
//! user-visible notice and the session keeps running.

use std::fmt;
use thiserror::Error;

/// Why the one-shot position lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    /// No location source is configured.
    #[error("location lookup not supported")]
    Unsupported,
    /// The source refused to reveal a position.
    #[error("location permission denied")]
    Denied,
    /// The source answered with nothing usable, or not at all.
    #[error("location unavailable")]
    Unavailable,
}

/// Which precondition an operation was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("User location not set")]
    NoPosition,
    #[error("A route is already being generated")]
    RequestInFlight,
}

/// Error body returned by the route service, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPayload {
    Structured(serde_json::Value),
    Text(String),
}

impl ErrorPayload {
    /// Interpret a raw error body: JSON objects and arrays stay structured,
    /// JSON strings are unwrapped, anything else is shown as text.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::String(s)) => ErrorPayload::Text(s),
            Ok(v @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
                ErrorPayload::Structured(v)
            }
            _ => ErrorPayload::Text(String::from_utf8_lossy(body).trim().to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ErrorPayload::Text(s) if s.is_empty())
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPayload::Structured(v) => {
                let pretty = serde_json::to_string_pretty(v).map_err(|_| fmt::Error)?;
                f.write_str(&pretty)
            }
            ErrorPayload::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Precondition(#[from] Precondition),
    #[error("Distance must be greater than 0 km (got {0})")]
    InvalidDistance(f64),
    /// Non-2xx answer or transport failure. `status` is absent for the latter.
    #[error("{}", service_message(.status, .payload))]
    Service {
        status: Option<u16>,
        payload: ErrorPayload,
    },
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl SessionError {
    pub fn transport(err: impl fmt::Display) -> Self {
        SessionError::Service {
            status: None,
            payload: ErrorPayload::Text(err.to_string()),
        }
    }
}

/// The payload verbatim, or the bare status when the body was empty.
fn service_message(status: &Option<u16>, payload: &ErrorPayload) -> String {
    match status {
        _ if !payload.is_empty() => payload.to_string(),
        Some(code) => format!("HTTP {code}"),
        None => "request failed".to_string(),
    }
}
