// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Home Connect client.
//!
//! The hierarchy distinguishes fatal configuration problems, failed
//! communication with the cloud API, malformed responses and invalid values
//! supplied by the caller.

use std::fmt;

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The client is misconfigured. Retrying will not help.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The API answered with an unexpected status or an unparseable body, or
    /// could not be reached during authentication.
    #[error("communication error: {0}")]
    Communication(#[from] CommunicationError),

    /// An authorization redirect or event payload could not be interpreted.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A caller-supplied value is not acceptable.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The client has been disposed and cannot be used anymore.
    #[error("client has been disposed")]
    Disposed,
}

impl Error {
    /// Returns the HTTP status code attached to a communication error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Communication(err) => err.status,
            _ => None,
        }
    }
}

/// Errors caused by missing or invalid client configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Device flow was selected but no refresh token is configured.
    #[error("no refresh token configured")]
    MissingRefreshToken,

    /// The configured base URL cannot be parsed.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be created.
    #[error("cannot create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Failed exchange with the Home Connect API.
///
/// Carries the HTTP status, reason phrase and body when a response was
/// received. Transport-level failures (DNS, TLS, timeouts) leave `status`
/// empty and put the transport error text into `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicationError {
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Reason phrase or transport error description.
    pub message: String,
    /// Raw response body, empty when unavailable.
    pub body: String,
}

impl CommunicationError {
    /// Creates an error for a response with an unexpected status code.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        Self {
            status: Some(status.as_u16()),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body: body.into(),
        }
    }

    /// Creates an error for an accepted response whose body cannot be mapped.
    #[must_use]
    pub fn unparseable(
        status: reqwest::StatusCode,
        err: &ParseError,
        body: impl Into<String>,
    ) -> Self {
        Self {
            status: Some(status.as_u16()),
            message: format!("unparseable response: {err}"),
            body: body.into(),
        }
    }

    /// Creates an error for a request that never produced a response.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            body: String::new(),
        }
    }
}

impl fmt::Display for CommunicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status} {}", self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

impl std::error::Error for CommunicationError {}

/// Errors raised while mapping API payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// The authorize redirect did not carry an authorization code.
    #[error("authorization redirect without code: {0}")]
    MissingAuthorizationCode(String),
}

/// Errors related to caller-supplied values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// An integral setting value could not be parsed as an integer.
    #[error("value {0:?} is not an integer")]
    NotAnInteger(String),
}

/// Outcome of a single REST exchange that did not succeed.
///
/// `InvalidToken` never leaves the crate: the retry wrapper either absorbs it
/// or converts it into a [`CommunicationError`].
#[derive(Debug)]
pub(crate) enum TransportError {
    /// HTTP 401 on a call that did not accept it.
    InvalidToken(CommunicationError),
    /// Status code outside the accepted set.
    Status(CommunicationError),
    /// No usable response (connection failure, timeout, unreadable body).
    Io(reqwest::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn communication_error_display_with_body() {
        let err = CommunicationError {
            status: Some(409),
            message: "Conflict".to_string(),
            body: "{\"error\":{}}".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 409 Conflict: {\"error\":{}}");
    }

    #[test]
    fn communication_error_display_without_status() {
        let err = CommunicationError {
            status: None,
            message: "connection refused".to_string(),
            body: String::new(),
        };
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn communication_error_from_status() {
        let err = CommunicationError::from_status(reqwest::StatusCode::FORBIDDEN, "denied");
        assert_eq!(err.status, Some(403));
        assert_eq!(err.message, "Forbidden");
        assert_eq!(err.body, "denied");
    }

    #[test]
    fn communication_error_for_unparseable_body() {
        let parse = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err = CommunicationError::unparseable(
            reqwest::StatusCode::OK,
            &ParseError::Json(parse),
            "<html>",
        );
        assert_eq!(err.status, Some(200));
        assert!(err.message.starts_with("unparseable response: JSON parse error"));
        assert_eq!(err.body, "<html>");
    }

    #[test]
    fn configuration_error_display() {
        let err: Error = ConfigurationError::MissingRefreshToken.into();
        assert_eq!(
            err.to_string(),
            "configuration error: no refresh token configured"
        );
    }

    #[test]
    fn status_accessor() {
        let err: Error =
            CommunicationError::from_status(reqwest::StatusCode::UNAUTHORIZED, "").into();
        assert_eq!(err.status(), Some(401));
        assert_eq!(Error::Disposed.status(), None);
    }

    #[test]
    fn value_error_display() {
        let err = ValueError::NotAnInteger("warm".to_string());
        assert_eq!(err.to_string(), "value \"warm\" is not an integer");
    }
}
