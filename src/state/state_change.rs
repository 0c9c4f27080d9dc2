// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! A command is planned as a list of [`StateChange`]s. The same list drives
//! both the pin writes sent to the device and the optimistic update of the
//! cached [`DeviceState`](super::DeviceState) once the writes succeed.

use crate::speed_map;
use crate::types::{Pin, PinValue, SpeedLevel};

/// A single change to a fan's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StateChange {
    /// Power turned on or off.
    Power(bool),
    /// Speed level changed.
    Speed(SpeedLevel),
}

impl StateChange {
    /// Returns the pin write that performs this change.
    #[must_use]
    pub fn pin_write(&self) -> (Pin, PinValue) {
        match *self {
            Self::Power(on) => (Pin::POWER, speed_map::power_to_pin_value(on)),
            Self::Speed(level) => (Pin::FAN_SPEED, speed_map::level_to_pin_value(level)),
        }
    }
}
