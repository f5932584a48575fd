// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OAuth session state and token acquisition.
//!
//! - [`Session`] holds the client credentials and current tokens.
//! - [`CredentialGuard`] makes sure a usable access token exists before any
//!   API call, running the authorization code grant (simulator) or the
//!   refresh token grant (physical appliances) as needed.

mod guard;

pub use guard::CredentialGuard;

use std::fmt;
use std::sync::Arc;

use crate::config::ClientConfig;

/// Callback invoked with a freshly rotated refresh token.
pub type RefreshTokenCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Credentials and tokens of one client.
///
/// Owned by the client and only mutated while its state lock is held, so
/// two callers can never refresh the token concurrently. Token state cannot
/// be changed from outside the crate:
///
/// ```compile_fail
/// use homeconnect_lib::ClientConfig;
/// use homeconnect_lib::auth::Session;
///
/// let mut session = Session::new(&ClientConfig::new("id", "secret", "refresh"), None);
/// session.invalidate();
/// ```
#[derive(Clone)]
pub struct Session {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    access_token: Option<String>,
    simulated: bool,
    on_new_refresh_token: Option<RefreshTokenCallback>,
}

impl Session {
    /// Creates a session without an access token.
    #[must_use]
    pub fn new(config: &ClientConfig, on_new_refresh_token: Option<RefreshTokenCallback>) -> Self {
        Self {
            client_id: config.client_id().to_string(),
            client_secret: config.client_secret().to_string(),
            refresh_token: config.refresh_token().to_string(),
            access_token: None,
            simulated: config.is_simulated(),
            on_new_refresh_token,
        }
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

    /// Returns the current refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Returns the current access token if one is held.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns whether the simulator flow is used.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Returns whether refresh token rotation is propagated to a callback.
    #[must_use]
    pub fn tracks_rotation(&self) -> bool {
        self.on_new_refresh_token.is_some()
    }

    /// Stores a new access token.
    pub(crate) fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// Drops the access token, forcing re-authentication on the next call.
    pub(crate) fn invalidate(&mut self) {
        self.access_token = None;
    }

    /// Replaces the refresh token and notifies the rotation callback.
    ///
    /// Does nothing when no callback is configured.
    pub(crate) fn rotate_refresh_token(&mut self, refresh_token: &str) {
        if let Some(callback) = &self.on_new_refresh_token {
            self.refresh_token = refresh_token.to_string();
            callback(refresh_token);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .field("simulated", &self.simulated)
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .field("has_access_token", &self.access_token().is_some())
            .field("tracks_rotation", &self.tracks_rotation())
            .finish_non_exhaustive()
    }
}
