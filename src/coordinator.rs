// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling and command coordination for one device.
//!
//! The [`StateCoordinator`] owns the cached [`DeviceState`] and serializes
//! every call to the [`DeviceClient`]: at most one device operation is in
//! flight per coordinator.
//!
//! # Operation slot
//!
//! - Commands wait for the slot in issue order and always run.
//! - Polls never wait. A poll that finds the slot busy is skipped, since
//!   the running command refreshes the cache itself.
//! - Every command bumps a generation counter when issued. A poll whose
//!   generation is outdated by the time its response arrives is discarded,
//!   so a poll never overwrites the result of a newer command.
//!
//! # Phases
//!
//! ```text
//! Uninitialized -> Polling <-> Updating
//!        \            \           \
//!         +------------+-----------+--> Stopped
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{Mutex, watch};

use crate::client::DeviceClient;
use crate::config::ClientConfig;
use crate::error::{DeviceError, DeviceErrorKind, Error, Result};
use crate::protocol::{HttpTransport, Transport};
use crate::speed_map;
use crate::state::{DeviceState, StateChange};
use crate::types::SpeedLevel;

/// Lifecycle phase of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorPhase {
    /// No device operation has completed yet.
    Uninitialized,
    /// Idle between operations.
    Polling,
    /// A device operation is in flight.
    Updating,
    /// Shut down; no new operations start.
    Stopped,
}

/// Result of a poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The cache was refreshed from the device.
    Updated,
    /// Another operation held the slot; nothing was sent.
    Skipped,
    /// A command was issued while the poll was in flight; its result was dropped.
    Discarded,
    /// The poll failed; the cache was marked unavailable.
    Failed(DeviceErrorKind),
    /// The coordinator is stopped.
    Stopped,
}

/// Serializes polls and commands for one device and caches its state.
#[derive(Debug)]
pub struct StateCoordinator<T: Transport = HttpTransport> {
    client: DeviceClient<T>,
    slot: Mutex<()>,
    generation: AtomicU64,
    state: RwLock<DeviceState>,
    updates: watch::Sender<DeviceState>,
    phase: watch::Sender<CoordinatorPhase>,
    update_interval: Duration,
}

impl<T: Transport> StateCoordinator<T> {
    /// Creates a coordinator with an unknown, unavailable state.
    pub fn new(client: DeviceClient<T>, config: &ClientConfig) -> Self {
        let state = DeviceState::new();
        let (updates, _) = watch::channel(state.clone());
        let (phase, _) = watch::channel(CoordinatorPhase::Uninitialized);

        Self {
            client,
            slot: Mutex::new(()),
            generation: AtomicU64::new(0),
            state: RwLock::new(state),
            updates,
            phase,
            update_interval: config.update_interval(),
        }
    }

    /// Returns the device client.
    #[must_use]
    pub fn client(&self) -> &DeviceClient<T> {
        &self.client
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Returns a snapshot of the cached state without waiting.
    #[must_use]
    pub fn current_state(&self) -> DeviceState {
        self.state.read().clone()
    }

    /// Returns a receiver notified on every cache change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.updates.subscribe()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> CoordinatorPhase {
        *self.phase.borrow()
    }

    /// Returns a receiver notified on every phase change.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<CoordinatorPhase> {
        self.phase.subscribe()
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.phase() == CoordinatorPhase::Stopped
    }

    /// Stops the coordinator. An in-flight operation is allowed to finish.
    pub fn stop(&self) {
        let previous = self.phase.send_replace(CoordinatorPhase::Stopped);
        if previous != CoordinatorPhase::Stopped {
            tracing::debug!(token = %self.client.token(), "Coordinator stopped");
        }
    }

    /// Handles a poll tick.
    ///
    /// Never fails: errors degrade the cached state to unavailable and are
    /// reported through the outcome.
    pub async fn poll(&self) -> PollOutcome {
        if self.is_stopped() {
            return PollOutcome::Stopped;
        }

        let Ok(_slot) = self.slot.try_lock() else {
            tracing::debug!("Device busy, skipping poll");
            return PollOutcome::Skipped;
        };

        self.fetch_locked()
            .await
            .unwrap_or_else(|err| PollOutcome::Failed(err.kind()))
    }

    /// Refreshes the cache, waiting for the slot if a command is running.
    ///
    /// # Errors
    ///
    /// Returns the device error if the status read failed. The cache is
    /// marked unavailable in that case.
    pub async fn refresh(&self) -> std::result::Result<PollOutcome, DeviceError> {
        if self.is_stopped() {
            return Ok(PollOutcome::Stopped);
        }

        let _slot = self.slot.lock().await;
        self.fetch_locked().await
    }

    /// Turns the fan on, at the default speed if none is known.
    ///
    /// # Errors
    ///
    /// Returns error if a pin write fails or the coordinator is stopped.
    pub async fn turn_on(&self) -> Result<()> {
        self.execute("turn_on", |state| {
            let mut changes = vec![StateChange::Power(true)];
            if state.speed().is_none() {
                changes.push(StateChange::Speed(SpeedLevel::default()));
            }
            changes
        })
        .await
    }

    /// Turns the fan off.
    ///
    /// # Errors
    ///
    /// Returns error if the pin write fails or the coordinator is stopped.
    pub async fn turn_off(&self) -> Result<()> {
        self.execute("turn_off", |_| vec![StateChange::Power(false)])
            .await
    }

    /// Sets the speed from a percentage; 0 turns the fan off.
    ///
    /// # Errors
    ///
    /// Returns error if a pin write fails or the coordinator is stopped.
    pub async fn set_percentage(&self, percentage: u8) -> Result<()> {
        if percentage == 0 {
            return self.turn_off().await;
        }

        let level = speed_map::percentage_to_level(percentage);
        tracing::debug!(percentage, level = %level, "Mapped percentage to speed level");
        self.set_speed(level).await
    }

    /// Sets a speed level, turning the fan on if needed.
    ///
    /// # Errors
    ///
    /// Returns error if a pin write fails or the coordinator is stopped.
    pub async fn set_speed(&self, level: SpeedLevel) -> Result<()> {
        self.execute("set_speed", move |state| {
            let mut changes = Vec::with_capacity(2);
            if !state.power() {
                changes.push(StateChange::Power(true));
            }
            changes.push(StateChange::Speed(level));
            changes
        })
        .await
    }

    /// Runs one command: waits for the slot, plans against the cache,
    /// writes the pins and applies the changes once all writes succeeded.
    async fn execute(
        &self,
        command: &'static str,
        plan: impl FnOnce(&DeviceState) -> Vec<StateChange>,
    ) -> Result<()> {
        if self.is_stopped() {
            return Err(Error::Stopped);
        }

        self.generation.fetch_add(1, Ordering::AcqRel);
        let _slot = self.slot.lock().await;

        if self.is_stopped() {
            return Err(Error::Stopped);
        }

        let changes = plan(&self.current_state());
        self.begin_operation();

        let mut result = Ok(());
        for change in &changes {
            let (pin, value) = change.pin_write();
            if let Err(err) = self.client.set_pin_value(pin, value).await {
                result = Err(err);
                break;
            }
        }

        match result {
            Ok(()) => {
                self.update_state(|state| {
                    state.apply_all(&changes);
                    state.confirm(Utc::now());
                });
                tracing::debug!(command, ?changes, "Command applied");
            }
            Err(ref err) => {
                tracing::error!(command, error = %err, "Command failed");
            }
        }

        self.end_operation();
        result.map_err(Error::Device)
    }

    /// Reads the device status while holding the slot.
    async fn fetch_locked(&self) -> std::result::Result<PollOutcome, DeviceError> {
        if self.is_stopped() {
            return Ok(PollOutcome::Stopped);
        }

        let generation = self.generation.load(Ordering::Acquire);
        self.begin_operation();

        let result = self.client.fetch_status().await;

        let outcome = if self.generation.load(Ordering::Acquire) == generation {
            match result {
                Ok(status) => {
                    self.update_state(|state| state.apply_status(status, Utc::now()));
                    Ok(PollOutcome::Updated)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Poll failed, marking device unavailable");
                    self.update_state(|state| state.mark_unavailable(err.kind()));
                    Err(err)
                }
            }
        } else {
            tracing::debug!("Command issued during poll, discarding result");
            Ok(PollOutcome::Discarded)
        };

        self.end_operation();
        outcome
    }

    fn update_state(&self, f: impl FnOnce(&mut DeviceState)) {
        let snapshot = {
            let mut state = self.state.write();
            f(&mut state);
            state.clone()
        };
        self.updates.send_replace(snapshot);
    }

    fn begin_operation(&self) {
        self.transition(CoordinatorPhase::Updating);
    }

    fn end_operation(&self) {
        self.transition(CoordinatorPhase::Polling);
    }

    fn transition(&self, next: CoordinatorPhase) {
        self.phase.send_if_modified(|phase| {
            if *phase == CoordinatorPhase::Stopped || *phase == next {
                return false;
            }
            *phase = next;
            true
        });
    }
}
