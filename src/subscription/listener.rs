// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event listeners and the registry that fans events out to them.
//!
//! - [`EventListener`] - Callback interface implemented by the host
//! - [`SubscriptionId`] - Identity of a registration, used to unregister
//! - [`ListenerRegistry`] - Registry storing listeners and dispatching events

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::types::Event;

/// Receiver of push updates for one appliance.
///
/// Callbacks run on the event stream's background task, not on the task
/// that registered the listener. They must return quickly.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::{Event, EventListener};
///
/// struct DoorWatcher {
///     ha_id: String,
/// }
///
/// impl EventListener for DoorWatcher {
///     fn appliance_id(&self) -> &str {
///         &self.ha_id
///     }
///
///     fn on_event(&self, event: &Event) {
///         if event.key.as_deref() == Some("BSH.Common.Status.DoorState") {
///             println!("door is now {:?}", event.value);
///         }
///     }
/// }
/// ```
pub trait EventListener: Send + Sync {
    /// The appliance (`haId`) this listener is interested in.
    fn appliance_id(&self) -> &str;

    /// Called for every event received for the appliance.
    fn on_event(&self, event: &Event);

    /// Called before the event stream reconnects after a failure.
    fn on_reconnect(&self) {}
}

/// Unique identifier of a listener registration.
///
/// IDs are unique within a client's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type SharedListener = Arc<dyn EventListener>;

/// Registry of event listeners, keyed by registration identity.
///
/// Several listeners may share one appliance id. Registering the same
/// `Arc` twice yields the existing registration. Reads never block on the
/// client's state lock, so event delivery proceeds while a REST call is in
/// flight.
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<SubscriptionId, SharedListener>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a listener and returns its registration id.
    ///
    /// If this exact listener is already registered, its existing id is
    /// returned and nothing changes.
    pub fn insert(&self, listener: SharedListener) -> SubscriptionId {
        let mut listeners = self.listeners.write();
        if let Some(id) = listeners
            .iter()
            .find(|(_, existing)| same_listener(existing, &listener))
            .map(|(id, _)| *id)
        {
            return id;
        }

        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        listeners.insert(id, listener);
        id
    }

    /// Returns the id under which this exact listener is registered.
    #[must_use]
    pub fn find(&self, listener: &SharedListener) -> Option<SubscriptionId> {
        self.listeners
            .read()
            .iter()
            .find(|(_, existing)| same_listener(existing, listener))
            .map(|(id, _)| *id)
    }

    /// Removes a registration, returning the listener if it existed.
    pub fn remove(&self, id: SubscriptionId) -> Option<SharedListener> {
        self.listeners.write().remove(&id)
    }

    /// Removes every registration.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Returns `true` if any listener is registered for the appliance.
    #[must_use]
    pub fn has_listeners_for(&self, appliance_id: &str) -> bool {
        self.listeners
            .read()
            .values()
            .any(|listener| listener.appliance_id() == appliance_id)
    }

    /// Returns the listeners registered for the appliance.
    #[must_use]
    pub fn listeners_for(&self, appliance_id: &str) -> Vec<SharedListener> {
        self.listeners
            .read()
            .values()
            .filter(|listener| listener.appliance_id() == appliance_id)
            .cloned()
            .collect()
    }

    /// Delivers an event to every listener of the appliance.
    ///
    /// Callbacks run after the registry lock has been released.
    pub fn dispatch(&self, appliance_id: &str, event: &Event) {
        for listener in self.listeners_for(appliance_id) {
            listener.on_event(event);
        }
    }

    /// Notifies every listener of the appliance about a reconnect.
    pub fn notify_reconnect(&self, appliance_id: &str) {
        for listener in self.listeners_for(appliance_id) {
            listener.on_reconnect();
        }
    }

    /// Returns the number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if there are no registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compares listener identity by data pointer, ignoring vtables.
fn same_listener(a: &SharedListener, b: &SharedListener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.len())
            .finish()
    }
}
