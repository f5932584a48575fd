// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event stream handler for one appliance.

use std::sync::{Arc, Weak};
use std::time::Duration;

use reqwest::StatusCode;

use crate::client::ClientInner;
use crate::protocol::SseEvent;
use crate::response::parse_events;
use crate::subscription::connection::{SseHandler, StreamFailure};
use crate::subscription::listener::ListenerRegistry;
use crate::types::{CONNECTED, DISCONNECTED, Event};

const KEEP_ALIVE: &str = "KEEP-ALIVE";

/// Routes the events of one appliance stream to its listeners.
///
/// `generation` ties the handler to the connection entry it was created
/// for, so late callbacks from a replaced connection cannot touch its
/// successor.
pub(crate) struct ApplianceStream {
    ha_id: String,
    generation: u64,
    listeners: Arc<ListenerRegistry>,
    client: Weak<ClientInner>,
}

impl ApplianceStream {
    pub(crate) fn new(
        ha_id: impl Into<String>,
        generation: u64,
        listeners: Arc<ListenerRegistry>,
        client: Weak<ClientInner>,
    ) -> Self {
        Self {
            ha_id: ha_id.into(),
            generation,
            listeners,
            client,
        }
    }

    fn dispatch_payload(&self, data: &str) {
        match parse_events(data) {
            Ok(events) => {
                for event in &events {
                    self.listeners.dispatch(&self.ha_id, event);
                }
            }
            Err(e) => {
                tracing::warn!(ha_id = %self.ha_id, error = %e, "Ignoring unparseable event payload");
            }
        }
    }
}

impl SseHandler for ApplianceStream {
    fn on_open(&self) {
        tracing::debug!(ha_id = %self.ha_id, "Event stream opened");
    }

    fn on_message(&self, event: &SseEvent) {
        let name = event.event.as_deref();
        if name == Some(KEEP_ALIVE) {
            tracing::debug!(ha_id = %self.ha_id, "Event stream KEEP-ALIVE");
        } else {
            tracing::debug!(
                ha_id = %self.ha_id,
                id = ?event.id,
                event = ?name,
                data = %event.data,
                "Event stream message"
            );
        }

        if !event.data.is_empty() {
            self.dispatch_payload(&event.data);
        }

        if let Some(kind @ (CONNECTED | DISCONNECTED)) = name {
            self.listeners.dispatch(&self.ha_id, &Event::connection(kind));
        }
    }

    fn on_comment(&self, comment: &str) {
        tracing::debug!(ha_id = %self.ha_id, comment = %comment, "Event stream comment");
    }

    fn on_retry_time(&self, delay: Duration) -> bool {
        tracing::debug!(
            ha_id = %self.ha_id,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Event stream retry time"
        );
        true
    }

    fn on_retry_error(&self, failure: &StreamFailure) -> bool {
        match failure.status() {
            Some(StatusCode::FORBIDDEN) => {
                tracing::warn!(
                    ha_id = %self.ha_id,
                    "Event stream forbidden (403), not reconnecting"
                );
                if let Some(client) = self.client.upgrade() {
                    let ha_id = self.ha_id.clone();
                    let generation = self.generation;
                    tokio::spawn(async move {
                        client.forget_connection(&ha_id, generation).await;
                    });
                }
                false
            }
            Some(StatusCode::UNAUTHORIZED) => {
                tracing::error!(
                    ha_id = %self.ha_id,
                    "Event stream token invalid (401), reopening with a new token"
                );
                if let Some(client) = self.client.upgrade() {
                    let ha_id = self.ha_id.clone();
                    let generation = self.generation;
                    tokio::spawn(async move {
                        client.reopen_after_invalid_token(&ha_id, generation).await;
                    });
                }
                false
            }
            _ => {
                tracing::debug!(ha_id = %self.ha_id, error = %failure, "Event stream failed, will retry");
                true
            }
        }
    }

    fn on_closed(&self) {
        tracing::debug!(ha_id = %self.ha_id, "Event stream closed");
    }

    fn on_pre_retry(&self) {
        tracing::debug!(ha_id = %self.ha_id, "Event stream reconnecting");
        self.listeners.notify_reconnect(&self.ha_id);
    }
}
