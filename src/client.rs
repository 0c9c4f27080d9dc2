// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device client for a single Windmill fan.
//!
//! The [`DeviceClient`] owns the auth token and the transport. It turns
//! pin-level API calls into domain results and applies the retry policy:
//! transient failures are retried with exponential backoff and jitter,
//! auth and protocol failures are returned immediately.

use serde_json::{Map, Value};

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{DeviceError, ParseError, TransportError};
use crate::protocol::{HttpTransport, Request, Response, Transport};
use crate::speed_map;
use crate::types::{AuthToken, Pin, PinValue, SpeedLevel};

const GET_PATH: &str = "external/api/get";
const UPDATE_PATH: &str = "external/api/update";

/// Power and speed as reported by one status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Whether the fan is running.
    pub power: bool,
    /// Speed the fan runs at, or will resume at when turned on.
    pub speed: SpeedLevel,
}

/// Client for the Blynk API of one device.
///
/// # Examples
///
/// ```no_run
/// use windmill_fan::{ClientConfig, DeviceClient};
/// use windmill_fan::types::{AuthToken, Pin};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let token = AuthToken::new("my-device-token")?;
/// let client = DeviceClient::http(token, ClientConfig::default())?;
///
/// let status = client.fetch_status().await?;
/// println!("power={} speed={}", status.power, status.speed);
///
/// client.set_pin_value(Pin::POWER, 1_u8.into()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DeviceClient<T: Transport = HttpTransport> {
    token: AuthToken,
    transport: T,
    retry: RetryPolicy,
}

impl DeviceClient<HttpTransport> {
    /// Creates a client using the reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn http(token: AuthToken, config: ClientConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(token, &config, transport))
    }
}

impl<T: Transport> DeviceClient<T> {
    /// Creates a client over an arbitrary transport.
    pub fn new(token: AuthToken, config: &ClientConfig, transport: T) -> Self {
        Self {
            token,
            transport,
            retry: config.retry().clone(),
        }
    }

    /// Returns the auth token.
    #[must_use]
    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reads the power and speed pins in one request.
    ///
    /// Returns a raw [`DeviceStatus`] snapshot rather than a
    /// [`DeviceState`](crate::state::DeviceState): availability and
    /// timestamps belong to the cache, which the coordinator updates with
    /// [`DeviceState::apply_status`](crate::state::DeviceState::apply_status).
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Protocol` if a pin is missing or carries an
    /// unrecognized value, otherwise the translated transport failure.
    pub async fn fetch_status(&self) -> Result<DeviceStatus, DeviceError> {
        let request = Request::get(GET_PATH)
            .flag(Pin::POWER.to_string())
            .flag(Pin::FAN_SPEED.to_string());

        let response = self.send(&request).await?;
        let pins: Map<String, Value> = response.json().map_err(DeviceError::from_transport)?;

        let power = speed_map::pin_value_to_power(&pin_from_map(&pins, Pin::POWER)?)?;
        let speed = speed_map::pin_value_to_level(&pin_from_map(&pins, Pin::FAN_SPEED)?)?;

        tracing::debug!(power, speed = %speed, "Fetched device status");

        Ok(DeviceStatus { power, speed })
    }

    /// Reads a single pin.
    ///
    /// # Errors
    ///
    /// Returns the translated transport failure.
    pub async fn get_pin_value(&self, pin: Pin) -> Result<PinValue, DeviceError> {
        tracing::debug!(pin = %pin, "Getting pin value");

        let request = Request::get(GET_PATH).flag(pin.to_string());
        let response = self.send(&request).await?;

        Ok(PinValue::parse_body(response.body()))
    }

    /// Writes a single pin.
    ///
    /// # Errors
    ///
    /// Returns the translated transport failure.
    pub async fn set_pin_value(&self, pin: Pin, value: PinValue) -> Result<(), DeviceError> {
        tracing::debug!(pin = %pin, value = %value, "Setting pin value");

        let request = Request::get(UPDATE_PATH).param(pin.to_string(), value.to_string());
        self.send(&request).await.map(|_| ())
    }

    /// Checks that the token is accepted by reading the power pin.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::AuthInvalid` for a rejected token, or
    /// `DeviceError::Protocol` if the power pin is unreadable.
    pub async fn validate_token(&self) -> Result<(), DeviceError> {
        let value = self.get_pin_value(Pin::POWER).await?;
        speed_map::pin_value_to_power(&value)?;

        tracing::debug!(token = %self.token, "Token validated");
        Ok(())
    }

    /// Sends a request, retrying transient failures per the retry policy.
    async fn send(&self, request: &Request) -> Result<Response, DeviceError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let err = match self.transport.request(request, &self.token).await {
                Ok(response) => return Ok(response),
                Err(err) => DeviceError::from_transport(err),
            };

            if !err.is_transient() {
                return Err(err);
            }

            if !self.retry.should_retry(attempts) {
                tracing::warn!(
                    path = request.path(),
                    attempts,
                    error = %err,
                    "Request failed, giving up"
                );
                return Err(err);
            }

            let delay = self.retry.jittered_delay(attempts - 1);
            tracing::warn!(
                path = request.path(),
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Looks a pin up in a multi-pin response, ignoring key case.
fn pin_from_map(pins: &Map<String, Value>, pin: Pin) -> Result<PinValue, ParseError> {
    let name = pin.to_string();
    pins.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        .and_then(|(_, value)| PinValue::from_json(value))
        .ok_or(ParseError::MissingPin(name))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use std::collections::VecDeque;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::sync::watch;

    use super::*;

    type Reply = Result<Response, TransportError>;

    /// Transport that replays queued replies and records requests.
    ///
    /// When the queue is empty, reads answer with `default_status` and
    /// writes with an empty body.
    #[derive(Debug, Clone)]
    pub(crate) struct ScriptedTransport {
        inner: Arc<Inner>,
    }

    #[derive(Debug)]
    struct Inner {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<Request>>,
        default_status: Mutex<Option<String>>,
        // true while requests may complete
        gate: watch::Sender<bool>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            let transport = Self {
                inner: Arc::new(Inner {
                    replies: Mutex::default(),
                    requests: Mutex::default(),
                    default_status: Mutex::default(),
                    gate: watch::Sender::new(true),
                }),
            };
            transport.set_status(true, 3);
            transport
        }

        /// Sets the body returned by status reads once the script runs dry.
        pub(crate) fn set_status(&self, power: bool, speed: u8) {
            *self.inner.default_status.lock() =
                Some(format!(r#"{{"V0":{},"V2":{speed}}}"#, u8::from(power)));
        }

        pub(crate) fn push_ok(&self, body: &str) {
            self.inner
                .replies
                .lock()
                .push_back(Ok(Response::new(body)));
        }

        pub(crate) fn push_err(&self, err: TransportError) {
            self.inner.replies.lock().push_back(Err(err));
        }

        /// Makes requests wait until [`release`](Self::release) is called.
        pub(crate) fn hold(&self) {
            self.inner.gate.send_replace(false);
        }

        pub(crate) fn release(&self) {
            self.inner.gate.send_replace(true);
        }

        pub(crate) fn requests(&self) -> Vec<Request> {
            self.inner.requests.lock().clone()
        }

        pub(crate) fn request_count(&self) -> usize {
            self.inner.requests.lock().len()
        }

        /// Returns the `(pin, value)` writes in issue order.
        pub(crate) fn writes(&self) -> Vec<(String, String)> {
            self.requests()
                .iter()
                .filter(|r| r.path() == UPDATE_PATH)
                .filter_map(|r| r.query().first().cloned())
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect()
        }
    }

    impl Transport for ScriptedTransport {
        async fn request(&self, request: &Request, _token: &AuthToken) -> Reply {
            self.inner.requests.lock().push(request.clone());

            let mut gate = self.inner.gate.subscribe();
            let _ = gate.wait_for(|open| *open).await;

            if let Some(reply) = self.inner.replies.lock().pop_front() {
                return reply;
            }

            if request.path() == UPDATE_PATH {
                return Ok(Response::new(""));
            }

            match self.inner.default_status.lock().clone() {
                Some(body) if request.query().len() > 1 => Ok(Response::new(body)),
                _ => Ok(Response::new("1")),
            }
        }
    }
}
