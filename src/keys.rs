// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Well-known setting and status keys.

/// Power state setting (`On`, `Off`, `Standby`).
pub const POWER_STATE: &str = "BSH.Common.Setting.PowerState";

/// Freezer target temperature.
pub const SETPOINT_TEMPERATURE_FREEZER: &str =
    "Refrigeration.FridgeFreezer.Setting.SetpointTemperatureFreezer";
/// Refrigerator target temperature.
pub const SETPOINT_TEMPERATURE_REFRIGERATOR: &str =
    "Refrigeration.FridgeFreezer.Setting.SetpointTemperatureRefrigerator";
/// Refrigerator super cooling mode (boolean).
pub const SUPER_MODE_REFRIGERATOR: &str =
    "Refrigeration.FridgeFreezer.Setting.SuperModeRefrigerator";
/// Freezer super freezing mode (boolean).
pub const SUPER_MODE_FREEZER: &str = "Refrigeration.FridgeFreezer.Setting.SuperModeFreezer";

/// Door state status (`Open`, `Closed`, `Locked`).
pub const DOOR_STATE: &str = "BSH.Common.Status.DoorState";
/// Operation state status (`Ready`, `Run`, `Finished`, ...).
pub const OPERATION_STATE: &str = "BSH.Common.Status.OperationState";
/// Whether a program may be started remotely (boolean status).
pub const REMOTE_CONTROL_START_ALLOWED: &str = "BSH.Common.Status.RemoteControlStartAllowed";
/// Whether remote control is enabled on the appliance (boolean status).
pub const REMOTE_CONTROL_ACTIVE: &str = "BSH.Common.Status.RemoteControlActive";
