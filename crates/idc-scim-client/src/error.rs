//! Error types for the SCIM client and reconciliation engine.
//!
//! Three failure families matter to callers:
//! - [`ConfigError`]: connection settings are missing or malformed. Raised
//!   before any network call.
//! - [`ProtocolError`]: the directory answered with a non-success status.
//! - [`ValidationError`]: a locally constructed record breaks one of the
//!   directory's restrictions.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub use crate::config::ConfigError;

/// Result alias used throughout the crate.
pub type ScimClientResult<T> = Result<T, ScimClientError>;

/// Errors surfaced by the SCIM client.
#[derive(Debug, Error)]
pub enum ScimClientError {
    /// Connection settings are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The directory rejected the request.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A desired record violates a directory restriction.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request never produced an HTTP response (connect, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be interpreted.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// JSON (de)serialization failure outside of response parsing.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Some reverse membership queries failed, so current membership of
    /// existing groups is unknown.
    #[error("membership lookup failed for {0} user(s)")]
    IncompleteMembership(usize),

    /// An operation needs the server-assigned id and the record has none.
    #[error("{resource} '{name}' has no server id")]
    MissingId {
        resource: &'static str,
        name: String,
    },
}

impl ScimClientError {
    /// HTTP status of a directory rejection, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol(e) => Some(e.status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the directory reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the directory failed on its side (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Whether the failure came from the network layer rather than the directory.
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_connect() || e.is_timeout())
    }
}

/// Non-success response from the directory.
///
/// The directory adds fields that plain SCIM error payloads do not carry
/// (`exceptionRequestId`, `timestamp`) and sometimes uses `message` instead
/// of `detail`. All of them are folded in here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Human-readable message.
    pub detail: Option<String>,
    /// SCIM `scimType` error subtype (e.g. `uniqueness`).
    pub scim_type: Option<String>,
    /// Directory request id, useful when contacting support.
    pub request_id: Option<String>,
    /// Directory-side timestamp of the failure.
    pub timestamp: Option<String>,
}

impl ProtocolError {
    /// Build an error from a bare status with no payload.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self {
            status,
            detail: None,
            scim_type: None,
            request_id: None,
            timestamp: None,
        }
    }

    /// Build an error from a response status and raw body.
    ///
    /// A JSON body is mined for known fields. Anything else becomes the
    /// detail verbatim.
    #[must_use]
    pub fn from_response(http_status: u16, body: &str) -> Self {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
            let trimmed = body.trim();
            return Self {
                detail: (!trimmed.is_empty()).then(|| trimmed.to_string()),
                ..Self::from_status(http_status)
            };
        };

        let field = |name: &str| -> Option<&Value> {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        };
        let text = |name: &str| -> Option<String> {
            field(name).and_then(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };

        // `status` is a string in SCIM payloads but some responses send a number.
        let status = text("status")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(http_status);

        Self {
            status,
            detail: text("detail").or_else(|| text("message")),
            scim_type: text("scimType"),
            request_id: text("exceptionRequestId"),
            timestamp: text("timestamp"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.status,
            self.detail.as_deref().unwrap_or("Unknown error")
        )?;
        if let Some(scim_type) = &self.scim_type {
            write!(f, " ({scim_type})")?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request: {request_id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

/// A record breaks one of the directory's documented restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required attribute is absent or empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A multi-valued attribute carries more than the single allowed value.
    #[error("{attribute} accepts at most one value (got {count})")]
    TooManyValues { attribute: &'static str, count: usize },

    /// A patch operation name outside the supported set.
    #[error("unsupported patch operation '{0}'")]
    UnsupportedPatchOp(String),

    /// A patch operation the target resource does not accept.
    #[error("{op} is not accepted on {resource}")]
    OperationNotAllowed {
        op: &'static str,
        resource: &'static str,
    },

    /// Desired-state input that is not shaped like a record at all.
    #[error("malformed input: {0}")]
    Malformed(String),
}
