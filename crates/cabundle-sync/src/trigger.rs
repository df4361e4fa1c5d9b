//! Timer-driven trigger source.
//!
//! The trigger only ever writes wake-ups into the reconciliation queue. It
//! never touches the network or the cluster, so a slow cycle cannot stall it.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// A wake-up for the reconciliation loop.
///
/// Names the configuration resource the cycle should read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Namespace of the configuration resource
    pub namespace: String,
    /// Name of the configuration resource
    pub name: String,
}

impl TriggerEvent {
    /// Create a new event
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Sending half of the reconciliation queue.
pub type TriggerSender = mpsc::Sender<TriggerEvent>;

/// Receiving half of the reconciliation queue.
pub type TriggerReceiver = mpsc::Receiver<TriggerEvent>;

/// Create a bounded reconciliation queue.
#[must_use]
pub fn queue(capacity: usize) -> (TriggerSender, TriggerReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Lifecycle of a [`PeriodicTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// Timer armed, waiting for the next tick
    Idle,
    /// Terminal; never emits again
    Stopped,
}

/// What happened to one emitted wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Event placed on the queue
    Queued,
    /// Queue full, wake-up dropped
    Dropped,
    /// Trigger stopped or queue closed; nothing sent
    Stopped,
}

/// Pushes a [`TriggerEvent`] into the queue at a fixed interval.
pub struct PeriodicTrigger {
    interval: Duration,
    event: TriggerEvent,
    sender: Option<TriggerSender>,
}

impl PeriodicTrigger {
    /// Create a trigger that emits `event` every `interval`
    #[must_use]
    pub const fn new(interval: Duration, event: TriggerEvent, sender: TriggerSender) -> Self {
        Self {
            interval,
            event,
            sender: Some(sender),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> TriggerState {
        if self.sender.is_some() {
            TriggerState::Idle
        } else {
            TriggerState::Stopped
        }
    }

    /// Emit one wake-up without waiting for queue space.
    pub fn fire(&mut self) -> Emit {
        let Some(sender) = &self.sender else {
            return Emit::Stopped;
        };

        match sender.try_send(self.event.clone()) {
            Ok(()) => {
                debug!(namespace = %self.event.namespace, name = %self.event.name, "enqueued periodic trigger");
                Emit::Queued
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("reconciliation queue full, dropping periodic trigger");
                Emit::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stop();
                Emit::Stopped
            }
        }
    }

    /// Stop the timer and release the queue's sending half.
    pub fn stop(&mut self) {
        if self.sender.take().is_some() {
            info!("periodic trigger stopped");
        }
    }

    /// Run until `shutdown` turns true, its sender is dropped, or the queue
    /// closes. The first event fires one full interval after start.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "periodic trigger started");

        while self.state() == TriggerState::Idle && !shutdown_requested(&shutdown) {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || shutdown_requested(&shutdown) {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.fire();
                }
            }
        }

        self.stop();
    }
}

pub(crate) fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}
