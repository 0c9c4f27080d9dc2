// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Windmill Fan - A Rust library to control Windmill fans.
//!
//! Windmill fans are controlled through the Blynk cloud API: every device
//! attribute is a virtual pin read and written with a per-device token.
//! This library polls the device, keeps a cached last-known state, and
//! translates between the pin protocol and five named fan speeds.
//!
//! # Layers
//!
//! - [`protocol`] - one authenticated HTTP request per call, no retries
//! - [`DeviceClient`] - pin reads and writes with retry and backoff
//! - [`speed_map`] - pure speed/percentage/pin value translation
//! - [`StateCoordinator`] - single-flight polling and commands over a
//!   cached [`DeviceState`](state::DeviceState)
//! - [`DeviceHandle`] - the [`FanControl`] surface a host entity uses
//!
//! # Quick Start
//!
//! ```no_run
//! use windmill_fan::{ClientConfig, FanControl};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Validates the token and performs the first refresh
//!     let fan = windmill_fan::setup("my-device-token", ClientConfig::default()).await?;
//!
//!     fan.turn_on().await?;
//!     fan.set_percentage(80).await?;
//!
//!     let state = fan.current_state();
//!     println!("on={} speed={:?}", state.power(), state.speed());
//!
//!     fan.shutdown();
//!     Ok(())
//! }
//! ```

mod client;
pub mod config;
mod coordinator;
mod device;
pub mod error;
pub mod protocol;
pub mod speed_map;
pub mod state;
pub mod types;

pub use client::{DeviceClient, DeviceStatus};
pub use config::{ClientConfig, RetryPolicy};
pub use coordinator::{CoordinatorPhase, PollOutcome, StateCoordinator};
pub use device::{DeviceHandle, FanControl, setup};
pub use error::{
    DeviceError, DeviceErrorKind, Error, ParseError, Result, SetupError, TransportError,
    ValueError,
};
pub use types::{AuthToken, Pin, PinValue, SpeedLevel};
