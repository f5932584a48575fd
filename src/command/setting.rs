// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Setting write command.

use serde::Serialize;

use crate::error::{ParseError, Result, ValueError};
use crate::types::Datum;

/// Body of `PUT /api/homeappliances/{haId}/settings/{key}`.
///
/// Serializes as `{"data": {"key": ..., "value": ..., "unit": ...}}`. The
/// value is written as a JSON number when the setting is integral
/// (temperature setpoints), otherwise as a string. `unit` is omitted when
/// absent.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::Datum;
/// use homeconnect_lib::command::SettingCommand;
///
/// let datum = Datum::new("SetpointTemperatureRefrigerator", "7", Some("°C".into()));
/// let body = SettingCommand::new(datum, true).to_json().unwrap();
/// assert_eq!(
///     body,
///     r#"{"data":{"key":"SetpointTemperatureRefrigerator","value":7,"unit":"°C"}}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingCommand {
    datum: Datum,
    as_int: bool,
}

#[derive(Serialize)]
struct Body<'a> {
    data: Payload<'a>,
}

#[derive(Serialize)]
struct Payload<'a> {
    key: &'a str,
    value: SettingValue<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum SettingValue<'a> {
    Int(i64),
    Text(&'a str),
}

impl SettingCommand {
    /// Creates a setting write for the given datum.
    #[must_use]
    pub fn new(datum: Datum, as_int: bool) -> Self {
        Self { datum, as_int }
    }

    /// Returns the setting key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.datum.name
    }

    /// Returns the datum being written.
    #[must_use]
    pub fn datum(&self) -> &Datum {
        &self.datum
    }

    /// Serializes the request body.
    ///
    /// # Errors
    ///
    /// - `ValueError::NotAnInteger` if the setting is integral and the value
    ///   does not parse as an integer
    /// - `ParseError::Json` if the body cannot be serialized
    pub fn to_json(&self) -> Result<String> {
        let value = if self.as_int {
            SettingValue::Int(
                self.datum
                    .as_i64()
                    .ok_or_else(|| ValueError::NotAnInteger(self.datum.value.clone()))?,
            )
        } else {
            SettingValue::Text(&self.datum.value)
        };

        let body = Body {
            data: Payload {
                key: &self.datum.name,
                value,
                unit: self.datum.unit.as_deref(),
            },
        };

        Ok(serde_json::to_string(&body).map_err(ParseError::Json)?)
    }
}
