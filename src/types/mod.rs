// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Domain records exchanged with the Home Connect API.
//!
//! All records are immutable values. They are produced by the mappers in
//! [`response`](crate::response) and, for settings, serialized by
//! [`command`](crate::command).

mod appliance;
mod datum;
mod event;
mod program;

pub use appliance::HomeAppliance;
pub use datum::Datum;
pub use event::{CONNECTED, DISCONNECTED, Event};
pub use program::{Program, ProgramOption};
