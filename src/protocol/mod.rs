// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-level building blocks for talking to the Home Connect API.
//!
//! - [`RestTransport`]: authenticated REST calls and status classification
//! - [`SseDecoder`]: incremental decoder for the appliance event streams

mod rest;
mod sse;

pub use rest::{ApiRequest, ApiResponse, BSH_JSON_V1, Classification, RestTransport, classify};
pub use sse::{SseDecoder, SseEvent, SseItem};

pub(crate) use rest::api_path;
