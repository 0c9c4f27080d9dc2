// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Windmill fan library.
//!
//! Errors are layered the same way the library is:
//!
//! - [`TransportError`] - raw HTTP failures, never seen outside the
//!   [`DeviceClient`](crate::DeviceClient)
//! - [`DeviceError`] - the domain taxonomy surfaced to callers
//! - [`SetupError`] - failures while bringing a device handle up
//! - [`Error`] - failures of host commands on a running handle

use thiserror::Error;

/// The error type returned by host commands on a [`DeviceHandle`](crate::DeviceHandle).
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The device rejected or failed the command.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// The handle has been shut down.
    #[error("device handle has been shut down")]
    Stopped,
}

impl Error {
    /// Returns the device error kind, if this error came from the device.
    #[must_use]
    pub fn device_kind(&self) -> Option<DeviceErrorKind> {
        match self {
            Self::Device(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A pin name is not of the form `V<number>`.
    #[error("invalid pin name: {0}")]
    InvalidPin(String),

    /// The auth token does not look like a device token.
    #[error("auth token must be at least {min_len} characters")]
    InvalidToken {
        /// Minimum accepted length.
        min_len: usize,
    },
}

/// Transport-level failures of a single HTTP request.
///
/// The transport never retries; classification into retryable and terminal
/// failures happens in [`DeviceError::from_transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Connection to the API host failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Response body, kept for classification.
        body: String,
    },

    /// The response body could not be read or decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors related to decoding pin values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An expected pin is absent from the status response.
    #[error("missing value for pin {0}")]
    MissingPin(String),

    /// A pin carries a value outside the protocol's vocabulary.
    #[error("unrecognized value {value:?} for pin {pin}")]
    UnrecognizedPinValue {
        /// The pin that was read.
        pin: String,
        /// The raw value received.
        value: String,
    },

    /// The response does not have the expected shape.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Device errors surfaced to callers of the [`DeviceClient`](crate::DeviceClient).
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The auth token was rejected.
    #[error("invalid authentication token")]
    AuthInvalid,

    /// The API could not be reached, timed out, or is failing server-side.
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),

    /// The response violated the pin protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// Any other failure.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl DeviceError {
    /// Translates a transport failure into the device taxonomy.
    #[must_use]
    pub fn from_transport(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) | TransportError::ConnectionFailed(_) => {
                Self::DeviceUnreachable(err.to_string())
            }
            TransportError::HttpStatus { status: 401 | 403, .. } => Self::AuthInvalid,
            TransportError::HttpStatus { status: 400, ref body }
                if body.to_ascii_lowercase().contains("invalid token") =>
            {
                Self::AuthInvalid
            }
            TransportError::HttpStatus { status, .. } if status >= 500 => {
                Self::DeviceUnreachable(err.to_string())
            }
            TransportError::HttpStatus { .. } | TransportError::Client(_) => {
                Self::Unknown(err.to_string())
            }
            TransportError::MalformedResponse(message) => {
                Self::Protocol(ParseError::UnexpectedFormat(message))
            }
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> DeviceErrorKind {
        match self {
            Self::AuthInvalid => DeviceErrorKind::AuthInvalid,
            Self::DeviceUnreachable(_) => DeviceErrorKind::DeviceUnreachable,
            Self::Protocol(_) => DeviceErrorKind::Protocol,
            Self::Unknown(_) => DeviceErrorKind::Unknown,
        }
    }

    /// Returns `true` if a fresh attempt may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DeviceUnreachable(_))
    }
}

/// Discriminant of a [`DeviceError`], cheap to copy into cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DeviceErrorKind {
    /// See [`DeviceError::AuthInvalid`].
    AuthInvalid,
    /// See [`DeviceError::DeviceUnreachable`].
    DeviceUnreachable,
    /// See [`DeviceError::Protocol`].
    Protocol,
    /// See [`DeviceError::Unknown`].
    Unknown,
}

/// Errors raised while setting up a device handle.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The token was rejected before any request was made.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] ValueError),

    /// Token validation or the first refresh failed.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// The HTTP transport could not be created.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SetupError {
    /// Returns the device error kind, if setup reached the device.
    #[must_use]
    pub fn device_kind(&self) -> Option<DeviceErrorKind> {
        match self {
            Self::Device(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// A specialized Result type for host commands.
pub type Result<T> = std::result::Result<T, Error>;
