// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client configuration.

use std::fmt;
use std::time::Duration;

/// Production API host.
pub const API_URL: &str = "https://api.home-connect.com";
/// Simulator API host.
pub const API_SIMULATOR_URL: &str = "https://simulator.home-connect.com";

/// Configuration for a [`HomeConnectClient`](crate::HomeConnectClient).
///
/// Physical appliances use the device flow: a refresh token obtained out of
/// band is exchanged for access tokens. The simulator uses the authorization
/// code grant and needs no refresh token.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::ClientConfig;
/// use std::time::Duration;
///
/// // Physical appliances
/// let config = ClientConfig::new("client-id", "client-secret", "refresh-token");
///
/// // Simulator with custom timeouts
/// let config = ClientConfig::new("sim-client-id", "", "")
///     .with_simulator(true)
///     .with_request_timeout(Duration::from_secs(10))
///     .with_sse_idle_timeout(Duration::from_secs(60));
/// assert_eq!(config.base_url(), "https://simulator.home-connect.com");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    simulated: bool,
    base_url: Option<String>,
    request_timeout: Duration,
    sse_idle_timeout: Duration,
    sse_retry_delay: Duration,
    redirect_uri: String,
    scope: String,
}

impl ClientConfig {
    /// Default REST read timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    /// The server must send a keep-alive within this window.
    pub const DEFAULT_SSE_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
    /// Delay before an event stream reconnects, unless the server overrides it.
    pub const DEFAULT_SSE_RETRY_DELAY: Duration = Duration::from_secs(3);
    /// Redirect URI registered for the simulator client.
    pub const DEFAULT_REDIRECT_URI: &'static str = "https://apiclient.home-connect.com/o2c.html";
    /// Scope requested by the authorization code grant.
    pub const DEFAULT_SCOPE: &'static str = "IdentifyAppliance Monitor Settings";

    /// Creates a configuration for the device flow.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            simulated: false,
            base_url: None,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            sse_idle_timeout: Self::DEFAULT_SSE_IDLE_TIMEOUT,
            sse_retry_delay: Self::DEFAULT_SSE_RETRY_DELAY,
            redirect_uri: Self::DEFAULT_REDIRECT_URI.to_string(),
            scope: Self::DEFAULT_SCOPE.to_string(),
        }
    }

    /// Selects the simulator host and the authorization code grant.
    #[must_use]
    pub fn with_simulator(mut self, simulated: bool) -> Self {
        self.simulated = simulated;
        self
    }

    /// Overrides the API host. Trailing slashes are stripped.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url: String = base_url.into();
        self.base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Sets the REST read timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the window in which the event stream must deliver data.
    #[must_use]
    pub fn with_sse_idle_timeout(mut self, timeout: Duration) -> Self {
        self.sse_idle_timeout = timeout;
        self
    }

    /// Sets the initial reconnect delay for event streams.
    #[must_use]
    pub fn with_sse_retry_delay(mut self, delay: Duration) -> Self {
        self.sse_retry_delay = delay;
        self
    }

    /// Sets the OAuth redirect URI used by the authorization code grant.
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Sets the OAuth scope used by the authorization code grant.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Returns the OAuth client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the configured refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Returns whether the simulator is used.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Returns the REST read timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the event stream idle timeout.
    #[must_use]
    pub fn sse_idle_timeout(&self) -> Duration {
        self.sse_idle_timeout
    }

    /// Returns the initial event stream reconnect delay.
    #[must_use]
    pub fn sse_retry_delay(&self) -> Duration {
        self.sse_retry_delay
    }

    /// Returns the OAuth redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the OAuth scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the API host: the override if set, otherwise the production
    /// or simulator host depending on the simulation flag.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url,
            None if self.simulated => API_SIMULATOR_URL,
            None => API_URL,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("simulated", &self.simulated)
            .field("base_url", &self.base_url())
            .field("request_timeout", &self.request_timeout)
            .field("sse_idle_timeout", &self.sse_idle_timeout)
            .field("sse_retry_delay", &self.sse_retry_delay)
            .finish_non_exhaustive()
    }
}
