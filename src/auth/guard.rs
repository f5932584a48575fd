// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Access token acquisition.

use reqwest::{Client, StatusCode, Url, redirect};
use serde::Deserialize;

use crate::auth::Session;
use crate::config::ClientConfig;
use crate::error::{CommunicationError, ConfigurationError, Error, ParseError, Result};

const AUTHORIZE_PATH: &str = "/security/oauth/authorize";
const TOKEN_PATH: &str = "/security/oauth/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Ensures a valid access token is available before an API call.
///
/// - Simulator: without an access token, runs the authorization code grant
///   (authorize redirect, then code exchange).
/// - Physical appliances: requires a configured refresh token and, without an
///   access token, runs the refresh token grant. A rotated refresh token is
///   handed to the session's rotation callback.
///
/// Any communication failure during either flow clears the access token so
/// the next attempt starts from scratch.
#[derive(Debug, Clone)]
pub struct CredentialGuard {
    base_url: String,
    redirect_uri: String,
    scope: String,
    client: Client,
    authorize_client: Client,
}

impl CredentialGuard {
    /// Creates a guard for the configured API host.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the HTTP clients cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ConfigurationError::HttpClient)?;

        // The authorization code arrives in the redirect target, so the
        // redirect must not be followed.
        let authorize_client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(ConfigurationError::HttpClient)?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            redirect_uri: config.redirect_uri().to_string(),
            scope: config.scope().to_string(),
            client,
            authorize_client,
        })
    }

    /// Returns a usable access token, authenticating first if necessary.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::MissingRefreshToken` for the device flow
    ///   without a refresh token. This is fatal.
    /// - `CommunicationError` if the OAuth endpoints fail. The access token
    ///   is cleared in that case.
    pub async fn ensure_valid_token(&self, session: &mut Session) -> Result<String> {
        let result = if session.is_simulated() {
            match session.access_token() {
                Some(token) => Ok(token.to_string()),
                None => self.authorize(session).await,
            }
        } else if session.refresh_token().is_empty() {
            tracing::error!("No refresh token present");
            return Err(ConfigurationError::MissingRefreshToken.into());
        } else {
            match session.access_token() {
                Some(token) => Ok(token.to_string()),
                None => self.refresh(session).await,
            }
        };

        if let Err(Error::Communication(_)) = &result {
            session.invalidate();
        }
        result
    }

    /// Authorization code grant. Only works with simulator client ids.
    async fn authorize(&self, session: &mut Session) -> Result<String> {
        tracing::debug!(
            client_id = %session.client_id(),
            "Authorizing with authorization code grant"
        );

        let url = Url::parse_with_params(
            &format!("{}{AUTHORIZE_PATH}", self.base_url),
            &[
                ("client_id", session.client_id()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scope.as_str()),
            ],
        )
        .map_err(|e| ConfigurationError::InvalidBaseUrl(e.to_string()))?;

        let response = self
            .authorize_client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_failure(&e))?;

        let status = response.status();
        if status != StatusCode::FOUND {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Authorization request rejected");
            return Err(CommunicationError::from_status(status, body).into());
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ParseError::MissingField("Location".to_string()))?
            .to_string();
        let code = authorization_code(&location)?;
        tracing::debug!(status = status.as_u16(), "Received authorization code");

        let form = [
            ("client_id", session.client_id()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code.as_str()),
        ];
        let tokens = self.request_token(&form).await?;

        session.set_access_token(tokens.access_token.clone());
        tracing::debug!("Access token acquired (authorization code grant)");
        Ok(tokens.access_token)
    }

    /// Refresh token grant for physical appliances.
    async fn refresh(&self, session: &mut Session) -> Result<String> {
        tracing::debug!(
            client_id = %session.client_id(),
            "Refreshing access token"
        );

        let refresh_token = session.refresh_token().to_string();
        let client_secret = session.client_secret().to_string();
        let form = [
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
            ("client_secret", client_secret.as_str()),
        ];
        let tokens = self.request_token(&form).await?;

        session.set_access_token(tokens.access_token.clone());
        if session.tracks_rotation() {
            match tokens.refresh_token.as_deref() {
                Some(rotated) if !rotated.is_empty() => session.rotate_refresh_token(rotated),
                _ => tracing::warn!("Token response did not contain a refresh token"),
            }
        }

        tracing::debug!("Access token acquired (refresh token grant)");
        Ok(tokens.access_token)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(format!("{}{TOKEN_PATH}", self.base_url))
            .form(form)
            .send()
            .await
            .map_err(|e| transport_failure(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_failure(&e))?;
        if status != StatusCode::OK {
            tracing::error!(status = status.as_u16(), "Token request rejected");
            return Err(CommunicationError::from_status(status, body).into());
        }

        tracing::debug!(status = status.as_u16(), "Token request succeeded");
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(status = status.as_u16(), error = %e, "Cannot parse token response");
            CommunicationError::unparseable(status, &ParseError::Json(e), body.as_str()).into()
        })
    }
}

fn transport_failure(err: &reqwest::Error) -> Error {
    tracing::error!(error = %err, "Error while communicating with the OAuth endpoints");
    CommunicationError::from_transport(err).into()
}

/// Extracts the `code` query parameter from an authorize redirect target.
fn authorization_code(location: &str) -> Result<String> {
    let url = Url::parse(location)
        .map_err(|_| ParseError::MissingAuthorizationCode(location.to_string()))?;
    url.query_pairs()
        .find(|(name, _)| name == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ParseError::MissingAuthorizationCode(location.to_string()).into())
}
