// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discrete fan speed levels.
//!
//! Translation between levels, percentages and raw pin values lives in
//! [`speed_map`](crate::speed_map).

use std::fmt;
use std::str::FromStr;

/// One of the five named speeds a Windmill fan supports.
///
/// Levels are ordered from slowest to fastest.
///
/// # Examples
///
/// ```
/// use windmill_fan::types::SpeedLevel;
///
/// let level: SpeedLevel = "boost".parse().unwrap();
/// assert_eq!(level, SpeedLevel::Boost);
/// assert_eq!(level.as_str(), "Boost");
/// assert!(SpeedLevel::Whisper < SpeedLevel::Boost);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum SpeedLevel {
    /// Quietest setting.
    Whisper,
    /// Low speed.
    Low,
    /// Medium speed, the default when turning on without a known speed.
    #[default]
    Medium,
    /// High speed.
    High,
    /// Maximum speed.
    Boost,
}

impl SpeedLevel {
    /// All levels, slowest first.
    pub const ALL: [Self; 5] = [Self::Whisper, Self::Low, Self::Medium, Self::High, Self::Boost];

    /// Number of distinct levels.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the display name used for preset modes.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Whisper => "Whisper",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Boost => "Boost",
        }
    }

    /// Returns the 1-based position of this level.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        match self {
            Self::Whisper => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
            Self::Boost => 5,
        }
    }

    /// Returns the level at a 1-based position.
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(Self::Whisper),
            2 => Some(Self::Low),
            3 => Some(Self::Medium),
            4 => Some(Self::High),
            5 => Some(Self::Boost),
            _ => None,
        }
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a preset mode name is not a known level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown speed level: {0}")]
pub struct UnknownSpeedLevel(pub String);

impl FromStr for SpeedLevel {
    type Err = UnknownSpeedLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSpeedLevel(s.to_string()))
    }
}
