// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response parsing for Home Connect JSON payloads.
//!
//! The REST API wraps every payload in a `{"data": ...}` envelope, while the
//! event stream sends `{"items": [...]}` bodies. The functions here are pure:
//! they map a body into domain records and never touch the network.
//!
//! Optional fields are tolerated: a missing `unit` or a `null` value maps to
//! an empty representation instead of failing.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ParseError;
use crate::types::{Datum, Event, HomeAppliance, Program, ProgramOption};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ApplianceList {
    homeappliances: Vec<HomeAppliance>,
}

#[derive(Debug, Deserialize)]
struct RawDatum {
    key: String,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProgram {
    key: String,
    #[serde(default)]
    options: Vec<RawItem>,
}

/// Shape shared by program options and event items.
#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventBody {
    #[serde(default)]
    items: Vec<RawItem>,
}

fn parse_data<T: DeserializeOwned>(body: &str) -> Result<T, ParseError> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.data)
}

/// String-encodes a JSON value. `null` yields `None`.
fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Parses the body of `GET /api/homeappliances`.
///
/// # Errors
///
/// Returns `ParseError` if the body is not a valid appliance list.
pub fn parse_home_appliances(body: &str) -> Result<Vec<HomeAppliance>, ParseError> {
    parse_data::<ApplianceList>(body).map(|list| list.homeappliances)
}

/// Parses the body of `GET /api/homeappliances/{haId}`.
///
/// # Errors
///
/// Returns `ParseError` if the body is not a valid appliance description.
pub fn parse_home_appliance(body: &str) -> Result<HomeAppliance, ParseError> {
    parse_data(body)
}

/// Parses a setting or status body into a [`Datum`].
///
/// # Examples
///
/// ```
/// use homeconnect_lib::response::parse_datum;
///
/// let body = r#"{"data":{"key":"BSH.Common.Status.DoorState",
///                        "value":"BSH.Common.EnumType.DoorState.Closed"}}"#;
/// let datum = parse_datum(body).unwrap();
/// assert_eq!(datum.value, "BSH.Common.EnumType.DoorState.Closed");
/// assert!(datum.unit.is_none());
/// ```
///
/// # Errors
///
/// Returns `ParseError` if the body is not a valid datum.
pub fn parse_datum(body: &str) -> Result<Datum, ParseError> {
    let raw: RawDatum = parse_data(body)?;
    Ok(Datum {
        name: raw.key,
        value: value_to_string(raw.value).unwrap_or_default(),
        unit: raw.unit,
    })
}

/// Parses an active or selected program body.
///
/// # Errors
///
/// Returns `ParseError` if the body is not a valid program.
pub fn parse_program(body: &str) -> Result<Program, ParseError> {
    let raw: RawProgram = parse_data(body)?;
    Ok(Program {
        key: raw.key,
        options: raw
            .options
            .into_iter()
            .map(|item| ProgramOption {
                key: item.key,
                value: value_to_string(item.value),
                unit: item.unit,
            })
            .collect(),
    })
}

/// Parses the data of an event stream message into events, in item order.
///
/// # Errors
///
/// Returns `ParseError` if the message is not valid JSON.
pub fn parse_events(message: &str) -> Result<Vec<Event>, ParseError> {
    let body: EventBody = serde_json::from_str(message)?;
    Ok(body
        .items
        .into_iter()
        .map(|item| Event::new(item.key, value_to_string(item.value), item.unit))
        .collect())
}
