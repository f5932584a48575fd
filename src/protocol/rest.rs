// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Authenticated REST calls against the Home Connect API.

use reqwest::{Client, Method, StatusCode, header};

use crate::config::ClientConfig;
use crate::error::{CommunicationError, ConfigurationError, TransportError};

/// Versioned media type required by the API.
pub const BSH_JSON_V1: &str = "application/vnd.bsh.sdk.v1+json";

/// A single REST request description.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<String>,
    accepted: Vec<StatusCode>,
}

impl ApiRequest {
    /// Creates a `GET` request that accepts only `200 OK`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            accepted: vec![StatusCode::OK],
        }
    }

    /// Creates a `PUT` request that accepts only `204 No Content`.
    #[must_use]
    pub fn put(path: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(body),
            accepted: vec![StatusCode::NO_CONTENT],
        }
    }

    /// Replaces the set of accepted status codes.
    #[must_use]
    pub fn accepting(mut self, accepted: &[StatusCode]) -> Self {
        self.accepted = accepted.to_vec();
        self
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path relative to the API host.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the accepted status codes.
    #[must_use]
    pub fn accepted(&self) -> &[StatusCode] {
        &self.accepted
    }
}

/// Body and status of an accepted response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Status code, one of the request's accepted codes.
    pub status: StatusCode,
    /// Raw response body.
    pub body: String,
}

/// Outcome of checking a status code against the accepted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The status is in the accepted set.
    Accepted,
    /// `401` while `401` was not accepted: the access token is no longer valid.
    InvalidToken,
    /// Any other status outside the accepted set.
    Unexpected,
}

/// Classifies a status code against the accepted set.
///
/// `401` is special-cased: unless the caller explicitly accepted it, it
/// signals an invalid token rather than a generic failure.
#[must_use]
pub fn classify(status: StatusCode, accepted: &[StatusCode]) -> Classification {
    if accepted.contains(&status) {
        Classification::Accepted
    } else if status == StatusCode::UNAUTHORIZED {
        Classification::InvalidToken
    } else {
        Classification::Unexpected
    }
}

/// REST transport for the Home Connect API.
///
/// Every request carries the bearer token and the vendor media type. The
/// transport itself holds no token state; clearing the token on an invalid
/// token signal is the caller's job.
#[derive(Debug, Clone)]
pub struct RestTransport {
    base_url: String,
    client: Client,
}

impl RestTransport {
    /// Creates a transport for the configured API host.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ConfigurationError::HttpClient)?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            client,
        })
    }

    /// Returns the API host.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Executes a request with the given access token.
    pub(crate) async fn execute(
        &self,
        token: &str,
        request: &ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        tracing::debug!(method = %request.method, url = %url, "Sending API request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::ACCEPT, BSH_JSON_V1)
            .bearer_auth(token);
        if let Some(body) = &request.body {
            builder = builder
                .header(header::CONTENT_TYPE, BSH_JSON_V1)
                .body(body.clone());
        }

        let response = builder.send().await.map_err(TransportError::Io)?;
        let status = response.status();
        let body = response.text().await.map_err(TransportError::Io)?;

        tracing::debug!(
            method = %request.method,
            url = %url,
            status = status.as_u16(),
            body = %body,
            "Received API response"
        );

        match classify(status, &request.accepted) {
            Classification::Accepted => Ok(ApiResponse { status, body }),
            Classification::InvalidToken => {
                tracing::debug!("Current token is invalid, need to refresh");
                Err(TransportError::InvalidToken(
                    CommunicationError::from_status(status, body),
                ))
            }
            Classification::Unexpected => Err(TransportError::Status(
                CommunicationError::from_status(status, body),
            )),
        }
    }
}

/// Builds an API path, percent-encoding each dynamic segment.
pub(crate) fn api_path(segments: &[&str]) -> String {
    let mut path = String::from("/api/homeappliances");
    for segment in segments {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    path
}
