// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Setting and status values.

use std::fmt;

/// A single named setting or status value.
///
/// The API transports booleans, numbers and enumeration keys; they are kept
/// string-encoded here and can be interpreted with [`as_bool`](Self::as_bool)
/// and [`as_i64`](Self::as_i64).
///
/// # Examples
///
/// ```
/// use homeconnect_lib::Datum;
///
/// let datum = Datum::new("BSH.Common.Status.RemoteControlActive", "TRUE", None);
/// assert!(datum.as_bool());
///
/// let temperature = Datum::new("SetpointTemperatureFreezer", "-18", Some("°C".into()));
/// assert_eq!(temperature.as_i64(), Some(-18));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datum {
    /// Setting or status key.
    pub name: String,
    /// String-encoded value. Empty when the API sent `null`.
    pub value: String,
    /// Unit of the value, if any.
    pub unit: Option<String>,
}

impl Datum {
    /// Creates a new datum.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, unit: Option<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit,
        }
    }

    /// Returns `true` if the value is `"true"`, ignoring case.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        self.value.eq_ignore_ascii_case("true")
    }

    /// Parses the value as an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}={} {unit}", self.name, self.value),
            None => write!(f, "{}={}", self.name, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_bool_is_case_insensitive() {
        assert!(Datum::new("k", "true", None).as_bool());
        assert!(Datum::new("k", "True", None).as_bool());
        assert!(!Datum::new("k", "false", None).as_bool());
        assert!(!Datum::new("k", "", None).as_bool());
    }

    #[test]
    fn as_i64_parses_numbers_only() {
        assert_eq!(Datum::new("k", "7", None).as_i64(), Some(7));
        assert_eq!(Datum::new("k", " -3 ", None).as_i64(), Some(-3));
        assert_eq!(Datum::new("k", "seven", None).as_i64(), None);
    }

    #[test]
    fn display_includes_unit() {
        let datum = Datum::new("Temp", "4", Some("°C".to_string()));
        assert_eq!(datum.to_string(), "Temp=4 °C");
        assert_eq!(Datum::new("Door", "Open", None).to_string(), "Door=Open");
    }
}
