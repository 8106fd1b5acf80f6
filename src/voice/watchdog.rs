use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::traits::VoiceConnector;
use crate::error::VoiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipPhase {
    ConnectedCorrect,
    ConnectedWrongChannel,
    Disconnected,
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    InPlace,
    Reconnected,
    /// A reconnect is already scheduled or running.
    AlreadyPending,
    Failed,
}

enum ReconnectSlot {
    Idle,
    Scheduled { generation: u64, handle: JoinHandle<()> },
    Running,
}

/// Returns the slot to `Idle` when a reconnect attempt ends, however it ends.
struct RunningGuard<'a> {
    slot: &'a Mutex<ReconnectSlot>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*slot, ReconnectSlot::Running) {
            *slot = ReconnectSlot::Idle;
        }
    }
}

/// Keeps the bot in exactly one designated voice channel.
///
/// Two inputs drive it: a periodic check and membership-change events for
/// the bot's own user. Events schedule a delayed reconnect (a newer event
/// replaces an older schedule); the periodic check reconnects immediately.
/// At most one reconnect is ever in flight.
pub struct ConnectionWatchdog {
    connector: Arc<dyn VoiceConnector>,
    target_channel_id: String,
    reconnect_delay: Duration,
    slot: Mutex<ReconnectSlot>,
    generation: AtomicU64,
}

impl ConnectionWatchdog {
    pub fn new(
        connector: Arc<dyn VoiceConnector>,
        target_channel_id: impl Into<String>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            connector,
            target_channel_id: target_channel_id.into(),
            reconnect_delay,
            slot: Mutex::new(ReconnectSlot::Idle),
            generation: AtomicU64::new(0),
        }
    }

    pub fn target_channel_id(&self) -> &str {
        &self.target_channel_id
    }

    pub fn phase(&self) -> MembershipPhase {
        if matches!(*self.lock_slot(), ReconnectSlot::Running) {
            return MembershipPhase::Reconnecting;
        }
        match self.connector.current_channel() {
            Some(channel) if channel == self.target_channel_id => MembershipPhase::ConnectedCorrect,
            Some(_) => MembershipPhase::ConnectedWrongChannel,
            None => MembershipPhase::Disconnected,
        }
    }

    /// Periodic correctness check.
    pub async fn on_check(&self) -> CheckOutcome {
        if self.is_in_place() {
            return CheckOutcome::InPlace;
        }

        {
            let mut slot = self.lock_slot();
            if !matches!(*slot, ReconnectSlot::Idle) {
                tracing::debug!("Voice reconnect already pending; check skipped");
                return CheckOutcome::AlreadyPending;
            }
            *slot = ReconnectSlot::Running;
        }

        tracing::info!(
            "Not in voice channel {}; reconnecting",
            self.target_channel_id
        );
        self.reconnect_guarded().await
    }

    /// Membership notification for the bot's own user.
    pub fn on_membership_changed(self: &Arc<Self>, channel_id: Option<&str>) {
        let mut slot = self.lock_slot();

        if channel_id == Some(self.target_channel_id.as_str()) {
            if let ReconnectSlot::Scheduled { handle, .. } =
                std::mem::replace(&mut *slot, ReconnectSlot::Idle)
            {
                tracing::debug!("Back in voice channel; scheduled reconnect cancelled");
                handle.abort();
            }
            return;
        }

        match std::mem::replace(&mut *slot, ReconnectSlot::Idle) {
            ReconnectSlot::Running => {
                *slot = ReconnectSlot::Running;
                return;
            }
            ReconnectSlot::Scheduled { handle, .. } => handle.abort(),
            ReconnectSlot::Idle => {}
        }

        tracing::info!(
            "Voice membership moved to {}; reconnecting in {}s",
            channel_id.unwrap_or("no channel"),
            self.reconnect_delay.as_secs()
        );
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let watchdog = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(watchdog.reconnect_delay).await;
            {
                let mut slot = watchdog.lock_slot();
                let still_ours = matches!(
                    *slot,
                    ReconnectSlot::Scheduled { generation: current, .. } if current == generation
                );
                if !still_ours {
                    return;
                }
                *slot = ReconnectSlot::Running;
            }
            watchdog.reconnect_guarded().await;
        });
        *slot = ReconnectSlot::Scheduled { generation, handle };
    }

    /// Runs the periodic check until the task is aborted.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.on_check().await;
        }
    }

    fn is_in_place(&self) -> bool {
        self.connector.current_channel().as_deref() == Some(self.target_channel_id.as_str())
    }

    /// Caller must have moved the slot to `Running`.
    async fn reconnect_guarded(&self) -> CheckOutcome {
        let _guard = RunningGuard { slot: &self.slot };
        match self.reconnect().await {
            Ok(true) => CheckOutcome::Reconnected,
            Ok(false) => CheckOutcome::InPlace,
            Err(error) => {
                tracing::warn!("Voice reconnect to {} failed: {error}", self.target_channel_id);
                CheckOutcome::Failed
            }
        }
    }

    /// Returns whether a join was issued.
    async fn reconnect(&self) -> Result<bool, VoiceError> {
        let target = self
            .connector
            .resolve_channel(&self.target_channel_id)
            .await?;

        let current = self.connector.current_channel();
        if current.as_deref() == Some(target.channel_id.as_str()) {
            return Ok(false);
        }
        if let Some(stale) = current {
            tracing::info!("Leaving stale voice channel {stale}");
            self.connector.leave(&target.guild_id).await?;
        }

        self.connector.join(&target).await?;
        tracing::info!("Joined voice channel {}", target.channel_id);
        Ok(true)
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, ReconnectSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
