use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use super::debounce::{ConfirmationFilter, FilterDecision};
use super::enabled::EnabledFlag;
use super::engine::{ReconcileReport, ReconciliationEngine};
use crate::commands::{CommandOutcome, GliderCommand};
use crate::status::{Observation, StatusSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still running.
    Skipped,
    /// The feed produced no observation this tick.
    FetchFailed,
    /// A closing edge is waiting out its confirmation window.
    Held,
    Reconciled(ReconcileReport),
}

struct TickState {
    filter: ConfirmationFilter,
    engine: ReconciliationEngine,
    last_forwarded: Option<Observation>,
}

/// Drives poll → confirm → reconcile. Ticks never overlap: the timer skips
/// a tick while one is running, commands wait for it.
pub struct PresenceController {
    source: Arc<dyn StatusSource>,
    enabled: EnabledFlag,
    tick: Mutex<TickState>,
}

impl PresenceController {
    pub fn new(
        source: Arc<dyn StatusSource>,
        enabled: EnabledFlag,
        filter: ConfirmationFilter,
        engine: ReconciliationEngine,
    ) -> Self {
        Self {
            source,
            enabled,
            tick: Mutex::new(TickState {
                filter,
                engine,
                last_forwarded: None,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.is_enabled()
    }

    /// Timer entry point.
    pub async fn on_tick(&self) -> TickOutcome {
        let Ok(mut state) = self.tick.try_lock() else {
            tracing::debug!("Previous status tick still running; skipping");
            return TickOutcome::Skipped;
        };
        self.run_tick(&mut state).await
    }

    /// Out-of-cycle tick; waits for a running tick to finish first.
    pub async fn force_tick(&self) -> TickOutcome {
        let mut state = self.tick.lock().await;
        self.run_tick(&mut state).await
    }

    pub async fn on_command(&self, command: GliderCommand) -> CommandOutcome {
        let enabled = match command {
            GliderCommand::Help => return CommandOutcome::Help,
            GliderCommand::Enable => true,
            GliderCommand::Disable => false,
        };

        let changed = self.enabled.replace(enabled);
        if let Err(error) = self.enabled.persist(enabled) {
            tracing::error!("Failed to persist enabled flag: {error:#}");
        }
        tracing::info!(
            "Status updates {} by command",
            if enabled { "enabled" } else { "disabled" }
        );

        self.force_tick().await;
        CommandOutcome::Toggled { enabled, changed }
    }

    async fn run_tick(&self, state: &mut TickState) -> TickOutcome {
        let observation = if self.enabled.is_enabled() {
            match self.source.poll().await {
                Ok(observation) => observation,
                Err(error) => {
                    tracing::warn!("Status poll via {} failed: {error}", self.source.name());
                    return TickOutcome::FetchFailed;
                }
            }
        } else {
            Observation::unknown()
        };

        match state.filter.apply(observation, Instant::now()) {
            FilterDecision::Forward(observation) => {
                state.last_forwarded = Some(observation);
                let report = state.engine.reconcile(&observation).await;
                if !report.is_noop() {
                    tracing::debug!("Reconciled {}: {report:?}", observation.state);
                }
                TickOutcome::Reconciled(report)
            }
            FilterDecision::Hold { remaining } => {
                tracing::debug!(
                    "Filter {:?}; {}s left in the window",
                    state.filter.phase(),
                    remaining.as_secs()
                );
                // Keep retrying rate-limited fields against the last confirmed reading.
                if state.engine.has_pending_retry()
                    && let Some(previous) = state.last_forwarded
                {
                    state.engine.reconcile(&previous).await;
                }
                TickOutcome::Held
            }
        }
    }

    /// Polls on a fixed interval until the task is aborted. Ticks run as
    /// their own tasks so a slow one shows up as skipped, not as a late
    /// timer. Dropping this future aborts any tick still in flight.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = JoinSet::new();
        loop {
            ticker.tick().await;
            while let Some(finished) = ticks.try_join_next() {
                if let Err(error) = finished
                    && error.is_panic()
                {
                    tracing::error!("Status tick panicked: {error}");
                }
            }
            let controller = Arc::clone(&self);
            ticks.spawn(async move {
                controller.on_tick().await;
            });
        }
    }
}
