// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Home Connect API client.
//!
//! [`HomeConnectClient`] combines the credential guard, the REST transport
//! and the event stream manager behind one cloneable handle. Token state and
//! the connection map sit behind a single async lock, so REST calls,
//! registrations and disposal never interleave.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::sync::{Mutex, MutexGuard};

use crate::auth::{CredentialGuard, RefreshTokenCallback, Session};
use crate::command::SettingCommand;
use crate::config::ClientConfig;
use crate::error::{CommunicationError, ConfigurationError, Error, ParseError, Result, TransportError};
use crate::keys;
use crate::protocol::{ApiRequest, ApiResponse, RestTransport, api_path};
use crate::response;
use crate::subscription::{
    ApplianceStream, EventListener, ListenerRegistry, SseConnection, StreamSettings,
    SubscriptionId,
};
use crate::types::{Datum, HomeAppliance, Program};

/// A call is attempted at most this often when the token is rejected.
const MAX_ATTEMPTS: u32 = 2;

/// Builder for [`HomeConnectClient`].
///
/// # Examples
///
/// ```no_run
/// use homeconnect_lib::{ClientConfig, HomeConnectClient};
///
/// # fn example() -> homeconnect_lib::Result<()> {
/// let client = HomeConnectClient::builder(ClientConfig::new("id", "secret", "refresh"))
///     .on_refresh_token_rotated(|token| println!("persist {} chars", token.len()))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    on_refresh_token_rotated: Option<RefreshTokenCallback>,
}

impl ClientBuilder {
    fn new(config: ClientConfig) -> Self {
        Self {
            config,
            on_refresh_token_rotated: None,
        }
    }

    /// Sets the callback receiving rotated refresh tokens.
    ///
    /// Without a callback, refresh tokens in token responses are ignored and
    /// the configured one is kept.
    #[must_use]
    pub fn on_refresh_token_rotated<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_refresh_token_rotated = Some(Arc::new(callback));
        self
    }

    /// Builds the client. No network access happens here.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the HTTP clients cannot be created.
    pub fn build(self) -> Result<HomeConnectClient> {
        let guard = CredentialGuard::new(&self.config)?;
        let transport = RestTransport::new(&self.config)?;

        // No overall timeout: the stream stays open indefinitely and idle
        // detection happens per read.
        let sse_client = Client::builder()
            .connect_timeout(self.config.request_timeout())
            .build()
            .map_err(ConfigurationError::HttpClient)?;

        let session = Session::new(&self.config, self.on_refresh_token_rotated);

        Ok(HomeConnectClient {
            inner: Arc::new(ClientInner {
                guard,
                transport,
                sse_client,
                sse_idle_timeout: self.config.sse_idle_timeout(),
                sse_retry_delay: self.config.sse_retry_delay(),
                listeners: Arc::new(ListenerRegistry::new()),
                state: Mutex::new(ClientState {
                    session,
                    connections: HashMap::new(),
                    next_generation: 0,
                    disposed: false,
                }),
            }),
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field(
                "on_refresh_token_rotated",
                &self.on_refresh_token_rotated.is_some(),
            )
            .finish()
    }
}

/// Client for the Home Connect cloud API.
///
/// Cheap to clone; clones share tokens, listeners and event streams.
///
/// Typed accessors return `Ok(None)` when the API could not be reached at
/// all (the failure is logged). Rejected requests surface as
/// [`Error::Communication`], a missing refresh token as
/// [`Error::Configuration`].
///
/// # Examples
///
/// ```no_run
/// use homeconnect_lib::{ClientConfig, HomeConnectClient};
///
/// # async fn example() -> homeconnect_lib::Result<()> {
/// let client = HomeConnectClient::new(ClientConfig::new("id", "secret", "refresh"))?;
///
/// if let Some(appliances) = client.get_home_appliances().await? {
///     for appliance in appliances {
///         let door = client.get_door_state(&appliance.id).await?;
///         println!("{}: {:?}", appliance.name, door.map(|d| d.value));
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HomeConnectClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    guard: CredentialGuard,
    transport: RestTransport,
    sse_client: Client,
    sse_idle_timeout: Duration,
    sse_retry_delay: Duration,
    listeners: Arc<ListenerRegistry>,
    state: Mutex<ClientState>,
}

struct ClientState {
    session: Session,
    connections: HashMap<String, SseConnection>,
    next_generation: u64,
    disposed: bool,
}

impl ClientState {
    fn is_current(&self, ha_id: &str, generation: u64) -> bool {
        self.connections
            .get(ha_id)
            .is_some_and(|connection| connection.generation() == generation)
    }
}

/// Result of an authenticated exchange.
enum Exchange {
    Response(ApiResponse),
    /// The API could not be reached after authentication succeeded.
    Unreachable(CommunicationError),
}

impl Exchange {
    /// Maps an accepted response, treating an unreachable API as absent.
    fn parse<T>(self, parse: fn(&str) -> std::result::Result<T, ParseError>) -> Result<Option<T>> {
        match self {
            Self::Response(response) => map_body(&response, parse).map(Some),
            Self::Unreachable(_) => Ok(None),
        }
    }
}

/// Maps an accepted body. A body that does not parse is a failed exchange.
fn map_body<T>(
    response: &ApiResponse,
    parse: fn(&str) -> std::result::Result<T, ParseError>,
) -> Result<T> {
    parse(&response.body).map_err(|err| {
        tracing::error!(
            status = response.status.as_u16(),
            error = %err,
            "Cannot parse API response"
        );
        CommunicationError::unparseable(response.status, &err, response.body.as_str()).into()
    })
}

impl HomeConnectClient {
    /// Creates a client without a refresh token rotation callback.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the HTTP clients cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new(config).build()
    }

    /// Returns a builder for more elaborate setups.
    #[must_use]
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Lists all appliances paired with the account.
    ///
    /// # Errors
    ///
    /// Returns error if authentication fails, the API rejects the request or
    /// answers with a body that cannot be parsed.
    pub async fn get_home_appliances(&self) -> Result<Option<Vec<HomeAppliance>>> {
        self.inner
            .execute(&ApiRequest::get(api_path(&[])))
            .await?
            .parse(response::parse_home_appliances)
    }

    /// Fetches a single appliance.
    ///
    /// # Errors
    ///
    /// Returns error if authentication fails, the API rejects the request or
    /// answers with a body that cannot be parsed.
    pub async fn get_home_appliance(&self, ha_id: &str) -> Result<Option<HomeAppliance>> {
        self.inner
            .execute(&ApiRequest::get(api_path(&[ha_id])))
            .await?
            .parse(response::parse_home_appliance)
    }

    /// Reads a setting.
    ///
    /// # Errors
    ///
    /// Returns error if authentication fails, the API rejects the request or
    /// answers with a body that cannot be parsed.
    pub async fn get_setting(&self, ha_id: &str, key: &str) -> Result<Option<Datum>> {
        self.inner
            .execute(&ApiRequest::get(api_path(&[ha_id, "settings", key])))
            .await?
            .parse(response::parse_datum)
    }

    /// Writes a setting.
    ///
    /// With `as_int`, the value is sent as a JSON number.
    ///
    /// # Errors
    ///
    /// - `ValueError` if `as_int` is set and the value is not an integer
    /// - `CommunicationError` if the API rejects the write or cannot be
    ///   reached
    pub async fn put_setting(&self, ha_id: &str, datum: Datum, as_int: bool) -> Result<()> {
        let command = SettingCommand::new(datum, as_int);
        let body = command.to_json()?;
        let request = ApiRequest::put(api_path(&[ha_id, "settings", command.key()]), body);

        match self.inner.execute(&request).await? {
            Exchange::Response(_) => Ok(()),
            Exchange::Unreachable(err) => Err(err.into()),
        }
    }

    /// Reads a status value.
    ///
    /// # Errors
    ///
    /// Returns error if authentication fails, the API rejects the request or
    /// answers with a body that cannot be parsed.
    pub async fn get_status(&self, ha_id: &str, key: &str) -> Result<Option<Datum>> {
        self.inner
            .execute(&ApiRequest::get(api_path(&[ha_id, "status", key])))
            .await?
            .parse(response::parse_datum)
    }

    /// Returns the running program, or `None` if no program is active.
    ///
    /// # Errors
    ///
    /// Returns error if authentication fails, the API rejects the request or
    /// answers with a body that cannot be parsed.
    pub async fn get_active_program(&self, ha_id: &str) -> Result<Option<Program>> {
        self.get_program(ha_id, "active").await
    }

    /// Returns the selected program, or `None` if no program is selected.
    ///
    /// # Errors
    ///
    /// Returns error if authentication fails, the API rejects the request or
    /// answers with a body that cannot be parsed.
    pub async fn get_selected_program(&self, ha_id: &str) -> Result<Option<Program>> {
        self.get_program(ha_id, "selected").await
    }

    async fn get_program(&self, ha_id: &str, which: &str) -> Result<Option<Program>> {
        let request = ApiRequest::get(api_path(&[ha_id, "programs", which]))
            .accepting(&[StatusCode::OK, StatusCode::NOT_FOUND]);

        match self.inner.execute(&request).await? {
            Exchange::Response(response) if response.status == StatusCode::OK => {
                map_body(&response, response::parse_program).map(Some)
            }
            _ => Ok(None),
        }
    }

    // Convenience accessors for well-known keys

    /// Reads `BSH.Common.Setting.PowerState`.
    ///
    /// # Errors
    ///
    /// See [`get_setting`](Self::get_setting).
    pub async fn get_power_state(&self, ha_id: &str) -> Result<Option<Datum>> {
        self.get_setting(ha_id, keys::POWER_STATE).await
    }

    /// Writes `BSH.Common.Setting.PowerState`, e.g.
    /// `BSH.Common.EnumType.PowerState.On`.
    ///
    /// # Errors
    ///
    /// See [`put_setting`](Self::put_setting).
    pub async fn set_power_state(&self, ha_id: &str, state: &str) -> Result<()> {
        self.put_setting(ha_id, Datum::new(keys::POWER_STATE, state, None), false)
            .await
    }

    /// Reads the freezer setpoint temperature.
    ///
    /// # Errors
    ///
    /// See [`get_setting`](Self::get_setting).
    pub async fn get_freezer_setpoint_temperature(&self, ha_id: &str) -> Result<Option<Datum>> {
        self.get_setting(ha_id, keys::SETPOINT_TEMPERATURE_FREEZER)
            .await
    }

    /// Writes the freezer setpoint temperature as an integer.
    ///
    /// # Errors
    ///
    /// See [`put_setting`](Self::put_setting).
    pub async fn set_freezer_setpoint_temperature(
        &self,
        ha_id: &str,
        value: &str,
        unit: &str,
    ) -> Result<()> {
        let datum = Datum::new(
            keys::SETPOINT_TEMPERATURE_FREEZER,
            value,
            Some(unit.to_string()),
        );
        self.put_setting(ha_id, datum, true).await
    }

    /// Reads the refrigerator setpoint temperature.
    ///
    /// # Errors
    ///
    /// See [`get_setting`](Self::get_setting).
    pub async fn get_fridge_setpoint_temperature(&self, ha_id: &str) -> Result<Option<Datum>> {
        self.get_setting(ha_id, keys::SETPOINT_TEMPERATURE_REFRIGERATOR)
            .await
    }

    /// Writes the refrigerator setpoint temperature as an integer.
    ///
    /// # Errors
    ///
    /// See [`put_setting`](Self::put_setting).
    pub async fn set_fridge_setpoint_temperature(
        &self,
        ha_id: &str,
        value: &str,
        unit: &str,
    ) -> Result<()> {
        let datum = Datum::new(
            keys::SETPOINT_TEMPERATURE_REFRIGERATOR,
            value,
            Some(unit.to_string()),
        );
        self.put_setting(ha_id, datum, true).await
    }

    /// Reads the refrigerator super mode.
    ///
    /// # Errors
    ///
    /// See [`get_setting`](Self::get_setting).
    pub async fn get_fridge_super_mode(&self, ha_id: &str) -> Result<Option<Datum>> {
        self.get_setting(ha_id, keys::SUPER_MODE_REFRIGERATOR).await
    }

    /// Reads the freezer super mode.
    ///
    /// # Errors
    ///
    /// See [`get_setting`](Self::get_setting).
    pub async fn get_freezer_super_mode(&self, ha_id: &str) -> Result<Option<Datum>> {
        self.get_setting(ha_id, keys::SUPER_MODE_FREEZER).await
    }

    /// Reads `BSH.Common.Status.DoorState`.
    ///
    /// # Errors
    ///
    /// See [`get_status`](Self::get_status).
    pub async fn get_door_state(&self, ha_id: &str) -> Result<Option<Datum>> {
        self.get_status(ha_id, keys::DOOR_STATE).await
    }

    /// Reads `BSH.Common.Status.OperationState`.
    ///
    /// # Errors
    ///
    /// See [`get_status`](Self::get_status).
    pub async fn get_operation_state(&self, ha_id: &str) -> Result<Option<Datum>> {
        self.get_status(ha_id, keys::OPERATION_STATE).await
    }

    /// Returns whether a program may be started remotely.
    ///
    /// `false` if the status is unavailable.
    ///
    /// # Errors
    ///
    /// See [`get_status`](Self::get_status).
    pub async fn is_remote_control_start_allowed(&self, ha_id: &str) -> Result<bool> {
        let datum = self
            .get_status(ha_id, keys::REMOTE_CONTROL_START_ALLOWED)
            .await?;
        Ok(datum.is_some_and(|d| d.as_bool()))
    }

    /// Returns whether remote control is active.
    ///
    /// `false` if the status is unavailable.
    ///
    /// # Errors
    ///
    /// See [`get_status`](Self::get_status).
    pub async fn is_remote_control_active(&self, ha_id: &str) -> Result<bool> {
        let datum = self.get_status(ha_id, keys::REMOTE_CONTROL_ACTIVE).await?;
        Ok(datum.is_some_and(|d| d.as_bool()))
    }

    // Event streams

    /// Registers a listener for push events of its appliance.
    ///
    /// Opens the appliance's event stream if none is open yet. Registering
    /// the same `Arc` twice returns the existing id.
    ///
    /// # Errors
    ///
    /// - `Disposed` after [`dispose`](Self::dispose)
    /// - Authentication errors while opening the stream. A listener that was
    ///   new is not kept in that case.
    pub async fn register_event_listener(
        &self,
        listener: Arc<dyn EventListener>,
    ) -> Result<SubscriptionId> {
        self.inner.register(listener).await
    }

    /// Removes a listener.
    ///
    /// Closes the appliance's event stream when its last listener is gone.
    /// Returns `false` if the id was not registered. An event already being
    /// delivered may still reach the listener.
    pub async fn unregister_event_listener(&self, id: SubscriptionId) -> bool {
        let mut state = self.inner.state.lock().await;
        let Some(listener) = self.inner.listeners.remove(id) else {
            return false;
        };

        let ha_id = listener.appliance_id();
        tracing::debug!(ha_id = %ha_id, subscription = %id, "Unregistered event listener");

        if !self.inner.listeners.has_listeners_for(ha_id)
            && let Some(connection) = state.connections.remove(ha_id)
        {
            tracing::debug!(ha_id = %ha_id, "Closing event stream, no listeners left");
            connection.close();
        }
        true
    }

    /// Closes every event stream and drops every listener.
    ///
    /// The client is unusable afterwards; further calls fail with
    /// [`Error::Disposed`]. Disposing twice is harmless.
    pub async fn dispose(&self) {
        let mut state = self.inner.state.lock().await;
        if state.disposed {
            return;
        }
        state.disposed = true;

        self.inner.listeners.clear();
        for (ha_id, connection) in state.connections.drain() {
            tracing::debug!(ha_id = %ha_id, "Closing event stream");
            connection.close();
        }
        state.session.invalidate();
        tracing::debug!("Client disposed");
    }

    // Introspection

    /// Returns the number of open event streams.
    pub async fn connection_count(&self) -> usize {
        self.inner.state.lock().await.connections.len()
    }

    /// Returns `true` if an event stream is open for the appliance.
    pub async fn has_connection(&self, ha_id: &str) -> bool {
        self.inner.state.lock().await.connections.contains_key(ha_id)
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub async fn is_disposed(&self) -> bool {
        self.inner.state.lock().await.disposed
    }
}

impl std::fmt::Debug for HomeConnectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeConnectClient")
            .field("base_url", &self.inner.transport.base_url())
            .field("listeners", &self.inner.listeners)
            .finish_non_exhaustive()
    }
}

impl ClientInner {
    async fn lock_usable(&self) -> Result<MutexGuard<'_, ClientState>> {
        let state = self.state.lock().await;
        if state.disposed {
            return Err(Error::Disposed);
        }
        Ok(state)
    }

    /// Runs a request with a valid token, retrying once on a rejected token.
    async fn execute(&self, request: &ApiRequest) -> Result<Exchange> {
        let mut state = self.lock_usable().await?;

        let mut attempt = 1;
        loop {
            let token = self.guard.ensure_valid_token(&mut state.session).await?;

            match self.transport.execute(&token, request).await {
                Ok(response) => return Ok(Exchange::Response(response)),
                Err(TransportError::InvalidToken(err)) => {
                    state.session.invalidate();
                    if attempt >= MAX_ATTEMPTS {
                        tracing::error!(
                            method = %request.method(),
                            path = %request.path(),
                            "Access token rejected again after re-authentication"
                        );
                        return Err(err.into());
                    }
                    attempt += 1;
                }
                Err(TransportError::Status(err)) => return Err(err.into()),
                Err(TransportError::Io(err)) => {
                    tracing::error!(
                        method = %request.method(),
                        path = %request.path(),
                        error = %err,
                        "API request failed"
                    );
                    return Ok(Exchange::Unreachable(CommunicationError::from_transport(
                        &err,
                    )));
                }
            }
        }
    }

    async fn register(self: &Arc<Self>, listener: Arc<dyn EventListener>) -> Result<SubscriptionId> {
        let mut state = self.lock_usable().await?;

        let ha_id = listener.appliance_id().to_string();
        let existing = self.listeners.find(&listener);
        let id = self.listeners.insert(listener);
        tracing::debug!(ha_id = %ha_id, subscription = %id, "Registered event listener");

        if !state.connections.contains_key(&ha_id)
            && let Err(err) = self.open_connection(&mut state, &ha_id).await
        {
            if existing.is_none() {
                self.listeners.remove(id);
            }
            return Err(err);
        }
        Ok(id)
    }

    async fn open_connection(self: &Arc<Self>, state: &mut ClientState, ha_id: &str) -> Result<()> {
        let token = self.guard.ensure_valid_token(&mut state.session).await?;

        state.next_generation += 1;
        let generation = state.next_generation;

        let handler = Arc::new(ApplianceStream::new(
            ha_id,
            generation,
            Arc::clone(&self.listeners),
            Arc::downgrade(self),
        ));
        let settings = StreamSettings {
            url: format!(
                "{}{}",
                self.transport.base_url(),
                api_path(&[ha_id, "events"])
            ),
            token,
            idle_timeout: self.sse_idle_timeout,
            retry_delay: self.sse_retry_delay,
        };

        tracing::debug!(ha_id = %ha_id, generation, "Opening event stream");
        let connection = SseConnection::open(self.sse_client.clone(), settings, handler, generation);
        state.connections.insert(ha_id.to_string(), connection);
        Ok(())
    }

    /// Replaces a stream whose token was rejected.
    ///
    /// Listeners keep their registrations. Does nothing if the stream has
    /// been replaced or closed in the meantime.
    pub(crate) async fn reopen_after_invalid_token(self: &Arc<Self>, ha_id: &str, generation: u64) {
        let mut state = self.state.lock().await;
        if state.disposed || !state.is_current(ha_id, generation) {
            return;
        }

        state.session.invalidate();
        if let Some(stale) = state.connections.remove(ha_id) {
            stale.close();
        }

        if !self.listeners.has_listeners_for(ha_id) {
            return;
        }
        if let Err(err) = self.open_connection(&mut state, ha_id).await {
            tracing::error!(ha_id = %ha_id, error = %err, "Cannot reopen event stream");
        }
    }

    /// Drops the entry of a stream that stopped for good, so that the next
    /// registration opens a new one.
    pub(crate) async fn forget_connection(&self, ha_id: &str, generation: u64) {
        let mut state = self.state.lock().await;
        if state.is_current(ha_id, generation) {
            state.connections.remove(ha_id);
            tracing::debug!(ha_id = %ha_id, "Event stream entry removed");
        }
    }
}
