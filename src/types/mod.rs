// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for Windmill fan control.
//!
//! # Types
//!
//! - [`SpeedLevel`] - The five named fan speeds
//! - [`Pin`] - A virtual pin address (`V0`, `V2`, ...)
//! - [`PinValue`] - A raw value carried by a pin
//! - [`AuthToken`] - The device token, redacted in all diagnostics

mod pin;
mod speed;
mod token;

pub use pin::{Pin, PinValue};
pub use speed::{SpeedLevel, UnknownSpeedLevel};
pub use token::AuthToken;
