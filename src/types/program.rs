// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance programs.

/// An active or selected program together with its options.
///
/// Options keep the order in which the API listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Program key, e.g. `Cooking.Oven.Program.HeatingMode.HotAir`.
    pub key: String,
    /// Program options in API order.
    pub options: Vec<ProgramOption>,
}

impl Program {
    /// Returns the first option with the given key.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&ProgramOption> {
        self.options
            .iter()
            .find(|option| option.key.as_deref() == Some(key))
    }
}

/// A single program option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOption {
    /// Option key.
    pub key: Option<String>,
    /// String-encoded value, `None` when the API sent `null`.
    pub value: Option<String>,
    /// Unit of the value, if any.
    pub unit: Option<String>,
}
