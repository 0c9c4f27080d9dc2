// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device auth token.

use std::fmt;

use crate::error::ValueError;

/// Opaque device token authenticating every API request.
///
/// `Debug` and `Display` only ever show the redacted form, so a token can be
/// passed to `tracing` fields without leaking it.
///
/// # Examples
///
/// ```
/// use windmill_fan::types::AuthToken;
///
/// let token = AuthToken::new("abcdefghij1234").unwrap();
/// assert_eq!(token.to_string(), "****1234");
/// assert_eq!(token.suffix(), "ghij1234");
/// assert!(AuthToken::new("short").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Minimum length of a plausible device token.
    pub const MIN_LEN: usize = 10;

    const VISIBLE: usize = 4;
    const SUFFIX: usize = 8;

    /// Creates a token, rejecting values too short to be a device token.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidToken` if the trimmed token is shorter
    /// than [`MIN_LEN`](Self::MIN_LEN).
    pub fn new(token: impl Into<String>) -> Result<Self, ValueError> {
        let token = token.into().trim().to_string();
        if token.chars().count() < Self::MIN_LEN {
            return Err(ValueError::InvalidToken {
                min_len: Self::MIN_LEN,
            });
        }
        Ok(Self(token))
    }

    /// Returns the full token for building requests.
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the last eight characters, used to derive stable ids.
    #[must_use]
    pub fn suffix(&self) -> &str {
        Self::tail(&self.0, Self::SUFFIX)
    }

    /// Returns the token with all but the last four characters masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        format!("****{}", Self::tail(&self.0, Self::VISIBLE))
    }

    fn tail(s: &str, n: usize) -> &str {
        let start = s
            .char_indices()
            .rev()
            .nth(n.saturating_sub(1))
            .map_or(0, |(i, _)| i);
        &s[start..]
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&self.redacted()).finish()
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl TryFrom<&str> for AuthToken {
    type Error = ValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for AuthToken {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
