// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home appliance description.

use serde::Deserialize;

/// A paired home appliance as reported by `GET /api/homeappliances`.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::HomeAppliance;
///
/// let json = r#"{"haId":"X1","name":"Oven","brand":"B","vib":"V",
///                "connected":true,"type":"Oven","enumber":"E1"}"#;
/// let appliance: HomeAppliance = serde_json::from_str(json).unwrap();
/// assert_eq!(appliance.id, "X1");
/// assert!(appliance.connected);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HomeAppliance {
    /// Vendor-assigned appliance id (`haId`).
    #[serde(rename = "haId")]
    pub id: String,
    /// User-visible name.
    pub name: String,
    /// Brand name.
    pub brand: String,
    /// Vendor internal build identifier.
    pub vib: String,
    /// Whether the appliance is currently online.
    pub connected: bool,
    /// Appliance type, e.g. `Oven` or `FridgeFreezer`.
    #[serde(rename = "type")]
    pub kind: String,
    /// E-number of the appliance.
    pub enumber: String,
}
