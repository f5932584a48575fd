// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `HomeConnect` Lib - A Rust client for the Home Connect appliance cloud.
//!
//! This library provides async APIs to read and write appliance settings,
//! status values and programs over REST, and to receive push updates over
//! per-appliance server-sent event streams.
//!
//! # Supported Features
//!
//! - **Authentication**: refresh token grant for physical appliances,
//!   authorization code grant for the simulator, refresh token rotation
//! - **REST**: appliances, settings, status values, active/selected programs
//! - **Events**: one stream per appliance shared by all of its listeners,
//!   automatic reconnects, token renewal on `401`
//!
//! # Quick Start
//!
//! ## Reading and Writing Settings
//!
//! ```no_run
//! use homeconnect_lib::{ClientConfig, HomeConnectClient};
//!
//! #[tokio::main]
//! async fn main() -> homeconnect_lib::Result<()> {
//!     let config = ClientConfig::new("client-id", "client-secret", "refresh-token");
//!     let client = HomeConnectClient::new(config)?;
//!
//!     let ha_id = "SIEMENS-HCS05FRF1-9E3A8E4DCC27";
//!     if let Some(temperature) = client.get_fridge_setpoint_temperature(ha_id).await? {
//!         println!("fridge at {temperature}");
//!     }
//!     client.set_fridge_setpoint_temperature(ha_id, "4", "°C").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Simulator
//!
//! ```no_run
//! use homeconnect_lib::{ClientConfig, HomeConnectClient};
//!
//! #[tokio::main]
//! async fn main() -> homeconnect_lib::Result<()> {
//!     // Simulator client ids use the authorization code grant; no refresh token needed
//!     let config = ClientConfig::new("simulator-client-id", "", "").with_simulator(true);
//!     let client = HomeConnectClient::new(config)?;
//!
//!     let appliances = client.get_home_appliances().await?.unwrap_or_default();
//!     println!("{} appliances", appliances.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Refresh Token Rotation
//!
//! ```no_run
//! use homeconnect_lib::{ClientConfig, HomeConnectClient};
//!
//! # fn example() -> homeconnect_lib::Result<()> {
//! let client = HomeConnectClient::builder(ClientConfig::new("id", "secret", "refresh"))
//!     .on_refresh_token_rotated(|token| println!("store {} chars", token.len()))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! See [`subscription`] for push events.

pub mod auth;
mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod keys;
pub mod protocol;
pub mod response;
pub mod subscription;
pub mod types;

pub use client::{ClientBuilder, HomeConnectClient};
pub use config::{API_SIMULATOR_URL, API_URL, ClientConfig};
pub use error::{
    CommunicationError, ConfigurationError, Error, ParseError, Result, ValueError,
};
pub use subscription::{EventListener, SubscriptionId};
pub use types::{Datum, Event, HomeAppliance, Program, ProgramOption};
