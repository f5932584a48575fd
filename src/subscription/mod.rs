// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push updates over per-appliance event streams.
//!
//! # Overview
//!
//! - [`EventListener`] - Callback interface, one appliance per listener
//! - [`SubscriptionId`] - Identity of a registration, used to unregister
//! - [`ListenerRegistry`] - Registry that fans events out to listeners
//!
//! The client keeps at most one event stream per appliance, no matter how
//! many listeners are registered for it. The stream is opened with the first
//! listener and closed with the last one.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use homeconnect_lib::{ClientConfig, Event, EventListener, HomeConnectClient};
//!
//! struct Printer;
//!
//! impl EventListener for Printer {
//!     fn appliance_id(&self) -> &str {
//!         "SIEMENS-HCS02DWH1-6BE58C26DCC1"
//!     }
//!
//!     fn on_event(&self, event: &Event) {
//!         println!("{:?} = {:?}", event.key, event.value);
//!     }
//! }
//!
//! # async fn example() -> homeconnect_lib::Result<()> {
//! let client = HomeConnectClient::new(ClientConfig::new("id", "secret", "refresh"))?;
//! let sub_id = client.register_event_listener(Arc::new(Printer)).await?;
//!
//! // Later, unsubscribe
//! client.unregister_event_listener(sub_id).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Reconnects
//!
//! Failed streams reconnect on their own and call
//! [`EventListener::on_reconnect`] before each attempt. A `401` reopens the
//! stream with a fresh token. A `403` stops the stream for good; register a
//! listener again to retry.

mod appliance_stream;
mod connection;
mod listener;

pub use listener::{EventListener, ListenerRegistry, SubscriptionId};

pub(crate) use appliance_stream::ApplianceStream;
pub(crate) use connection::{SseConnection, StreamSettings};
