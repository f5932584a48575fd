// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push events delivered over the event stream.

/// Key of the synthetic event emitted when an appliance comes online.
pub const CONNECTED: &str = "CONNECTED";
/// Key of the synthetic event emitted when an appliance goes offline.
pub const DISCONNECTED: &str = "DISCONNECTED";

/// A single item received on an appliance event stream.
///
/// Connection state changes are surfaced as synthetic events whose key is
/// [`CONNECTED`] or [`DISCONNECTED`] and whose value and unit are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Setting, status, option or event key.
    pub key: Option<String>,
    /// String-encoded value.
    pub value: Option<String>,
    /// Unit of the value.
    pub unit: Option<String>,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(key: Option<String>, value: Option<String>, unit: Option<String>) -> Self {
        Self { key, value, unit }
    }

    /// Creates a synthetic connection-state event.
    #[must_use]
    pub fn connection(kind: &str) -> Self {
        Self {
            key: Some(kind.to_string()),
            value: None,
            unit: None,
        }
    }

    /// Returns `true` for the synthetic `CONNECTED`/`DISCONNECTED` events.
    #[must_use]
    pub fn is_connection_event(&self) -> bool {
        self.value.is_none()
            && self.unit.is_none()
            && matches!(self.key.as_deref(), Some(CONNECTED | DISCONNECTED))
    }
}
