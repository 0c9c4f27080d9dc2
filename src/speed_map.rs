// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translation between speed levels, percentages and pin values.
//!
//! Every function here is pure. Each [`SpeedLevel`] owns one percentage in
//! `{20, 40, 60, 80, 100}` and one speed pin value in `1..=5`.
//!
//! # Percentage rounding
//!
//! Percentages between the defined steps resolve to the nearest level,
//! with exact ties going to the faster level. Values below 20 resolve to
//! [`SpeedLevel::Whisper`] and values above 100 to [`SpeedLevel::Boost`].
//!
//! ```
//! use windmill_fan::speed_map::percentage_to_level;
//! use windmill_fan::types::SpeedLevel;
//!
//! assert_eq!(percentage_to_level(40), SpeedLevel::Low);
//! assert_eq!(percentage_to_level(30), SpeedLevel::Low);
//! assert_eq!(percentage_to_level(29), SpeedLevel::Whisper);
//! assert_eq!(percentage_to_level(150), SpeedLevel::Boost);
//! ```

use crate::error::ParseError;
use crate::types::{Pin, PinValue, SpeedLevel};

/// Percentage distance between two adjacent levels.
const STEP: u16 = 20;

/// Returns the percentage a level represents.
#[must_use]
pub const fn level_to_percentage(level: SpeedLevel) -> u8 {
    // ordinal <= 5, so the product fits in u8
    level.ordinal() * 20
}

/// Returns the level nearest to a percentage, ties resolved upward.
#[must_use]
pub fn percentage_to_level(percentage: u8) -> SpeedLevel {
    let ordinal = ((u16::from(percentage) + STEP / 2) / STEP).clamp(1, 5);
    // clamped to 1..=5 above
    #[allow(clippy::cast_possible_truncation)]
    let ordinal = ordinal as u8;
    SpeedLevel::from_ordinal(ordinal).unwrap_or(SpeedLevel::Boost)
}

/// Returns the speed pin value for a level.
#[must_use]
pub fn level_to_pin_value(level: SpeedLevel) -> PinValue {
    PinValue::from(level.ordinal())
}

/// Decodes a speed pin value.
///
/// # Errors
///
/// Returns `ParseError::UnrecognizedPinValue` for anything outside `1..=5`.
pub fn pin_value_to_level(value: &PinValue) -> Result<SpeedLevel, ParseError> {
    value
        .as_integer()
        .and_then(|n| u8::try_from(n).ok())
        .and_then(SpeedLevel::from_ordinal)
        .ok_or_else(|| unrecognized(Pin::FAN_SPEED, value))
}

/// Returns the power pin value for an on/off state.
#[must_use]
pub fn power_to_pin_value(on: bool) -> PinValue {
    PinValue::from(u8::from(on))
}

/// Decodes a power pin value.
///
/// # Errors
///
/// Returns `ParseError::UnrecognizedPinValue` for anything but `0` or `1`.
pub fn pin_value_to_power(value: &PinValue) -> Result<bool, ParseError> {
    match value.as_integer() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(unrecognized(Pin::POWER, value)),
    }
}

fn unrecognized(pin: Pin, value: &PinValue) -> ParseError {
    ParseError::UnrecognizedPinValue {
        pin: pin.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_percentages_round_trip() {
        for p in [20, 40, 60, 80, 100] {
            assert_eq!(level_to_percentage(percentage_to_level(p)), p);
        }
    }

    #[test]
    fn levels_round_trip_through_percentage() {
        for level in SpeedLevel::ALL {
            assert_eq!(percentage_to_level(level_to_percentage(level)), level);
        }
    }

    #[test]
    fn ties_resolve_upward() {
        assert_eq!(percentage_to_level(30), SpeedLevel::Low);
        assert_eq!(percentage_to_level(50), SpeedLevel::Medium);
        assert_eq!(percentage_to_level(70), SpeedLevel::High);
        assert_eq!(percentage_to_level(90), SpeedLevel::Boost);
    }

    #[test]
    fn nearest_level_wins() {
        assert_eq!(percentage_to_level(49), SpeedLevel::Low);
        assert_eq!(percentage_to_level(51), SpeedLevel::Medium);
        assert_eq!(percentage_to_level(61), SpeedLevel::Medium);
        assert_eq!(percentage_to_level(89), SpeedLevel::High);
    }

    #[test]
    fn out_of_range_clamps() {
        assert_eq!(percentage_to_level(0), SpeedLevel::Whisper);
        assert_eq!(percentage_to_level(10), SpeedLevel::Whisper);
        assert_eq!(percentage_to_level(101), SpeedLevel::Boost);
        assert_eq!(percentage_to_level(u8::MAX), SpeedLevel::Boost);
    }

    #[test]
    fn pin_values_round_trip() {
        for level in SpeedLevel::ALL {
            assert_eq!(pin_value_to_level(&level_to_pin_value(level)), Ok(level));
        }
        assert_eq!(level_to_pin_value(SpeedLevel::Whisper), PinValue::Integer(1));
        assert_eq!(level_to_pin_value(SpeedLevel::Boost), PinValue::Integer(5));
    }

    #[test]
    fn unrecognized_speed_value_is_an_error() {
        for raw in [
            PinValue::Integer(0),
            PinValue::Integer(6),
            PinValue::Integer(-3),
            PinValue::Text("Medium".into()),
        ] {
            let err = pin_value_to_level(&raw).unwrap_err();
            assert!(matches!(
                err,
                ParseError::UnrecognizedPinValue { ref pin, .. } if pin == "V2"
            ));
        }
    }

    #[test]
    fn power_values() {
        assert_eq!(pin_value_to_power(&power_to_pin_value(true)), Ok(true));
        assert_eq!(pin_value_to_power(&power_to_pin_value(false)), Ok(false));
        assert!(pin_value_to_power(&PinValue::Integer(2)).is_err());
        assert!(pin_value_to_power(&PinValue::Text("on".into())).is_err());
    }
}
