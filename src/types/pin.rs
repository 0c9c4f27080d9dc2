// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Virtual pins and their raw values.
//!
//! The Blynk API exposes device attributes as numbered virtual pins
//! (`V0`, `V1`, ...). Each pin holds a raw value that is either an integer
//! or a short string. Interpretation of those values belongs to
//! [`speed_map`](crate::speed_map).

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::ValueError;

/// A virtual pin on the device.
///
/// # Examples
///
/// ```
/// use windmill_fan::types::Pin;
///
/// assert_eq!(Pin::POWER.to_string(), "V0");
/// assert_eq!("v2".parse::<Pin>().unwrap(), Pin::FAN_SPEED);
/// assert!("X1".parse::<Pin>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pin(u8);

impl Pin {
    /// Power pin (`0` = off, `1` = on).
    pub const POWER: Self = Self(0);

    /// Fan speed pin (`1`..=`5`).
    pub const FAN_SPEED: Self = Self(2);

    /// Creates a pin from its number.
    #[must_use]
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// Returns the pin number.
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

impl FromStr for Pin {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(['V', 'v'])
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(Self)
            .ok_or_else(|| ValueError::InvalidPin(s.to_string()))
    }
}

/// A raw value read from or written to a pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PinValue {
    /// Integer value.
    Integer(i64),
    /// Any non-numeric value.
    Text(String),
}

impl PinValue {
    /// Parses the plain-text body returned by a single-pin read.
    ///
    /// Digits become integers, anything else is kept as text. A JSON array
    /// body yields its first element.
    #[must_use]
    pub fn parse_body(body: &str) -> Self {
        let body = body.trim();

        if let Some(value) = Self::parse_digits(body) {
            return value;
        }

        if body.starts_with('[')
            && let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body)
            && let Some(value) = items.first().and_then(Self::from_json)
        {
            return value;
        }

        Self::Text(body.to_string())
    }

    /// Converts a JSON value from a multi-pin read.
    ///
    /// Returns `None` for `null`, objects and empty arrays.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(
                n.as_i64()
                    .map_or_else(|| Self::Text(n.to_string()), Self::Integer),
            ),
            Value::String(s) => {
                Some(Self::parse_digits(s.trim()).unwrap_or_else(|| Self::Text(s.clone())))
            }
            Value::Bool(b) => Some(Self::Integer(i64::from(*b))),
            Value::Array(items) => items.first().and_then(Self::from_json),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Returns the value as an integer, if it is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    fn parse_digits(s: &str) -> Option<Self> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().ok().map(Self::Integer)
        } else {
            None
        }
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PinValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u8> for PinValue {
    fn from(value: u8) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for PinValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_parse() {
        assert_eq!("V0".parse::<Pin>(), Ok(Pin::POWER));
        assert_eq!("V255".parse::<Pin>().map(|p| p.number()), Ok(255));
        assert!("V".parse::<Pin>().is_err());
        assert!("V256".parse::<Pin>().is_err());
        assert!("V-1".parse::<Pin>().is_err());
        assert!("2".parse::<Pin>().is_err());
    }

    #[test]
    fn body_digits_become_integer() {
        assert_eq!(PinValue::parse_body("3\n"), PinValue::Integer(3));
    }

    #[test]
    fn body_text_is_kept() {
        assert_eq!(PinValue::parse_body("off"), PinValue::Text("off".into()));
        assert_eq!(PinValue::parse_body("1.5"), PinValue::Text("1.5".into()));
    }

    #[test]
    fn body_json_array_yields_first_element() {
        assert_eq!(PinValue::parse_body(r#"["4"]"#), PinValue::Integer(4));
        assert_eq!(PinValue::parse_body("[1, 2]"), PinValue::Integer(1));
        assert_eq!(PinValue::parse_body("[]"), PinValue::Text("[]".into()));
    }

    #[test]
    fn json_values() {
        assert_eq!(
            PinValue::from_json(&serde_json::json!(2)),
            Some(PinValue::Integer(2))
        );
        assert_eq!(
            PinValue::from_json(&serde_json::json!("5")),
            Some(PinValue::Integer(5))
        );
        assert_eq!(
            PinValue::from_json(&serde_json::json!(2.5)),
            Some(PinValue::Text("2.5".into()))
        );
        assert_eq!(PinValue::from_json(&serde_json::json!(null)), None);
    }

    #[test]
    fn display_is_wire_format() {
        assert_eq!(PinValue::from(1_u8).to_string(), "1");
        assert_eq!(PinValue::from("abc").to_string(), "abc");
    }
}
