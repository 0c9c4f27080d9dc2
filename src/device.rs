// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing device handle.
//!
//! A host adapter (a fan entity in some home-automation platform) talks to
//! the library through [`FanControl`], implemented by [`DeviceHandle`].
//! The handle is created once by [`setup`], which validates the token and
//! performs the first refresh before returning.
//!
//! ```no_run
//! use windmill_fan::{ClientConfig, FanControl};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fan = windmill_fan::setup("my-device-token", ClientConfig::default()).await?;
//!
//! // Either let the library drive polling...
//! let polling = fan.spawn_polling();
//!
//! // ...or call `fan.poll()` from the host's own timer.
//! fan.set_percentage(60).await?;
//! println!("{:?}", fan.current_state());
//!
//! fan.shutdown();
//! polling.await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::DeviceClient;
use crate::config::ClientConfig;
use crate::coordinator::{CoordinatorPhase, PollOutcome, StateCoordinator};
use crate::error::{Result, SetupError};
use crate::protocol::{HttpTransport, Transport};
use crate::state::DeviceState;
use crate::types::{AuthToken, SpeedLevel};

/// Prefix of the unique ids derived from device tokens.
const UNIQUE_ID_PREFIX: &str = "windmillfan";

/// Capabilities a host fan entity needs from the library.
pub trait FanControl {
    /// Returns the cached state without waiting on the device.
    fn current_state(&self) -> DeviceState;

    /// Turns the fan on.
    fn turn_on(&self) -> impl Future<Output = Result<()>> + Send;

    /// Turns the fan off.
    fn turn_off(&self) -> impl Future<Output = Result<()>> + Send;

    /// Sets the speed from a percentage; 0 turns the fan off.
    fn set_percentage(&self, percentage: u8) -> impl Future<Output = Result<()>> + Send;

    /// Sets a named speed level, turning the fan on if needed.
    fn set_preset_mode(&self, level: SpeedLevel) -> impl Future<Output = Result<()>> + Send;

    /// Handles a poll tick from the host's timer.
    fn poll(&self) -> impl Future<Output = PollOutcome> + Send;
}

/// Sets up a handle for the device identified by `token`.
///
/// # Errors
///
/// - `SetupError::InvalidToken` if the token is too short
/// - `SetupError::Device` if the token is rejected or the first refresh fails
/// - `SetupError::Transport` if the HTTP client cannot be created
pub async fn setup(
    token: &str,
    config: ClientConfig,
) -> std::result::Result<DeviceHandle, SetupError> {
    let token = AuthToken::new(token)?;
    let transport = HttpTransport::new(&config)?;
    DeviceHandle::with_transport(token, config, transport).await
}

/// Handle to one set-up device. Cheap to clone.
#[derive(Debug)]
pub struct DeviceHandle<T: Transport = HttpTransport> {
    coordinator: Arc<StateCoordinator<T>>,
}

impl<T: Transport> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<T: Transport> DeviceHandle<T> {
    /// Sets up a handle over an arbitrary transport.
    ///
    /// # Errors
    ///
    /// Returns `SetupError::Device` if the token is rejected or the first
    /// refresh fails. The transport is dropped on every error path.
    pub async fn with_transport(
        token: AuthToken,
        config: ClientConfig,
        transport: T,
    ) -> std::result::Result<Self, SetupError> {
        tracing::debug!(token = %token, "Setting up device");

        let client = DeviceClient::new(token, &config, transport);

        if let Err(err) = client.validate_token().await {
            tracing::error!(error = %err, "Token validation failed");
            return Err(err.into());
        }

        let coordinator = StateCoordinator::new(client, &config);

        if let Err(err) = coordinator.refresh().await {
            tracing::error!(error = %err, "Initial refresh failed");
            return Err(err.into());
        }

        let handle = Self {
            coordinator: Arc::new(coordinator),
        };
        tracing::info!(unique_id = %handle.unique_id(), "Device set up");
        Ok(handle)
    }

    /// Returns a stable id derived from the token suffix.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!(
            "{UNIQUE_ID_PREFIX}_{}",
            self.coordinator.client().token().suffix()
        )
    }

    /// Returns the coordinator phase.
    #[must_use]
    pub fn phase(&self) -> CoordinatorPhase {
        self.coordinator.phase()
    }

    /// Returns a receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.coordinator.subscribe()
    }

    /// Returns the underlying coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &StateCoordinator<T> {
        &self.coordinator
    }

    /// Stops the handle.
    ///
    /// The polling task, if any, exits without starting another poll. An
    /// in-flight request completes or times out; later commands fail with
    /// [`Error::Stopped`](crate::Error::Stopped).
    pub fn shutdown(&self) {
        self.coordinator.stop();
        tracing::info!(unique_id = %self.unique_id(), "Device shut down");
    }
}

impl<T: Transport + Send + Sync + 'static> DeviceHandle<T> {
    /// Spawns a task polling the device on the configured interval.
    ///
    /// The first tick fires one interval after spawning, since setup has
    /// just refreshed. Missed ticks are skipped. The task ends after
    /// [`shutdown`](Self::shutdown), or once every handle is dropped. It
    /// holds no strong reference, so dropping the last handle releases the
    /// HTTP client.
    #[must_use = "the task handle should be awaited after shutdown"]
    pub fn spawn_polling(&self) -> JoinHandle<()> {
        let coordinator = Arc::downgrade(&self.coordinator);
        let mut phase = self.coordinator.subscribe_phase();
        let period = self.coordinator.update_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                if *phase.borrow_and_update() == CoordinatorPhase::Stopped {
                    break;
                }

                tokio::select! {
                    _ = interval.tick() => {}
                    changed = phase.changed() => {
                        // Err means the coordinator was dropped
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }

                let Some(coordinator) = coordinator.upgrade() else {
                    break;
                };

                match coordinator.poll().await {
                    PollOutcome::Stopped => break,
                    PollOutcome::Failed(kind) => {
                        tracing::debug!(?kind, "Scheduled poll failed");
                    }
                    PollOutcome::Updated | PollOutcome::Skipped | PollOutcome::Discarded => {}
                }
            }

            tracing::debug!("Polling task finished");
        })
    }
}

impl<T: Transport + Send + Sync> FanControl for DeviceHandle<T> {
    fn current_state(&self) -> DeviceState {
        self.coordinator.current_state()
    }

    async fn turn_on(&self) -> Result<()> {
        self.coordinator.turn_on().await
    }

    async fn turn_off(&self) -> Result<()> {
        self.coordinator.turn_off().await
    }

    async fn set_percentage(&self, percentage: u8) -> Result<()> {
        self.coordinator.set_percentage(percentage).await
    }

    async fn set_preset_mode(&self, level: SpeedLevel) -> Result<()> {
        self.coordinator.set_speed(level).await
    }

    async fn poll(&self) -> PollOutcome {
        self.coordinator.poll().await
    }
}
