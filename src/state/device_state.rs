// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cached device state.

use chrono::{DateTime, Utc};

use crate::client::DeviceStatus;
use crate::error::DeviceErrorKind;
use crate::speed_map;
use crate::types::SpeedLevel;

use super::StateChange;

/// Last-known state of a fan.
///
/// The state starts out unknown and unavailable. It is updated by the
/// coordinator after every successful poll or acknowledged command and
/// marked unavailable, without losing power or speed, when a poll fails.
///
/// `speed` is only `None` while `power` is `false`.
///
/// # Examples
///
/// ```
/// use windmill_fan::state::{DeviceState, StateChange};
/// use windmill_fan::types::SpeedLevel;
///
/// let mut state = DeviceState::new();
/// assert!(!state.is_available());
///
/// state.apply_all(&[StateChange::Power(true), StateChange::Speed(SpeedLevel::Low)]);
/// assert_eq!(state.percentage(), 40);
/// assert_eq!(state.preset_mode(), Some(SpeedLevel::Low));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceState {
    power: bool,
    speed: Option<SpeedLevel>,
    last_updated: Option<DateTime<Utc>>,
    available: bool,
    last_error: Option<DeviceErrorKind>,
}

impl DeviceState {
    /// Creates a new unknown, unavailable state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the fan is running.
    #[must_use]
    pub fn power(&self) -> bool {
        self.power
    }

    /// Returns the speed level, running or remembered.
    #[must_use]
    pub fn speed(&self) -> Option<SpeedLevel> {
        self.speed
    }

    /// Returns when the state was last confirmed by the device.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Returns `false` if the most recent poll failed.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Returns the kind of the error that made the state unavailable.
    #[must_use]
    pub fn last_error(&self) -> Option<DeviceErrorKind> {
        self.last_error
    }

    /// Returns the current speed as a percentage, or 0 while off.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        match (self.power, self.speed) {
            (true, Some(level)) => speed_map::level_to_percentage(level),
            _ => 0,
        }
    }

    /// Returns the running speed level, or `None` while off.
    #[must_use]
    pub fn preset_mode(&self) -> Option<SpeedLevel> {
        if self.power { self.speed } else { None }
    }

    /// Applies a single change. Returns `true` if the state changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match *change {
            StateChange::Power(on) => {
                let changed = self.power != on;
                self.power = on;
                changed
            }
            StateChange::Speed(level) => {
                let changed = self.speed != Some(level);
                self.speed = Some(level);
                changed
            }
        }
    }

    /// Applies several changes in order. Returns `true` if any changed.
    pub fn apply_all(&mut self, changes: &[StateChange]) -> bool {
        changes
            .iter()
            .fold(false, |changed, change| self.apply(change) || changed)
    }

    /// Replaces power and speed with a status read and marks the state available.
    pub fn apply_status(&mut self, status: DeviceStatus, at: DateTime<Utc>) {
        self.power = status.power;
        self.speed = Some(status.speed);
        self.confirm(at);
    }

    /// Marks the state as confirmed by the device at `at`.
    pub fn confirm(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
        self.available = true;
        self.last_error = None;
    }

    /// Marks the state unavailable, keeping power and speed.
    pub fn mark_unavailable(&mut self, kind: DeviceErrorKind) {
        self.available = false;
        self.last_error = Some(kind);
    }
}
