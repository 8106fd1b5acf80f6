use std::time::Duration;
use tokio::time::Instant;

use crate::status::{Observation, OccupancyState};

/// A closing edge waiting out its confirmation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub target: OccupancyState,
    pub started_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Hand the observation to the reconciliation engine now.
    Forward(Observation),
    /// A closing edge is being confirmed; nothing to announce yet.
    Hold { remaining: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPhase {
    StableOpen,
    StableClosed,
    PendingClose,
    Unknown,
}

/// Suppresses single-tick flicker on the closing edge only. Opening and
/// count changes pass straight through.
#[derive(Debug)]
pub struct ConfirmationFilter {
    window: Duration,
    confirmed: OccupancyState,
    pending: Option<PendingTransition>,
}

impl ConfirmationFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            confirmed: OccupancyState::Unknown,
            pending: None,
        }
    }

    #[cfg(test)]
    pub fn confirmed(&self) -> OccupancyState {
        self.confirmed
    }

    #[cfg(test)]
    pub fn pending(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    pub fn phase(&self) -> FilterPhase {
        if self.pending.is_some() {
            return FilterPhase::PendingClose;
        }
        match self.confirmed {
            OccupancyState::Open => FilterPhase::StableOpen,
            OccupancyState::Closed => FilterPhase::StableClosed,
            OccupancyState::Unknown => FilterPhase::Unknown,
        }
    }

    pub fn apply(&mut self, observation: Observation, now: Instant) -> FilterDecision {
        if let Some(pending) = self.pending {
            return match observation.state {
                OccupancyState::Open => {
                    tracing::info!("Space reopened within the confirmation window; closing aborted");
                    self.pending = None;
                    self.forward(observation)
                }
                OccupancyState::Closed => {
                    let elapsed = now.saturating_duration_since(pending.started_at);
                    if elapsed >= self.window {
                        tracing::info!(
                            "Closing confirmed after {}s",
                            elapsed.as_secs()
                        );
                        self.pending = None;
                        self.forward(observation)
                    } else {
                        FilterDecision::Hold {
                            remaining: self.window - elapsed,
                        }
                    }
                }
                OccupancyState::Unknown => {
                    self.pending = None;
                    self.forward(observation)
                }
            };
        }

        if observation.state == OccupancyState::Closed
            && self.confirmed == OccupancyState::Open
            && !self.window.is_zero()
        {
            tracing::info!(
                "Space reported closed; waiting {}s for confirmation",
                self.window.as_secs()
            );
            self.pending = Some(PendingTransition {
                target: OccupancyState::Closed,
                started_at: now,
            });
            return FilterDecision::Hold {
                remaining: self.window,
            };
        }

        self.forward(observation)
    }

    fn forward(&mut self, observation: Observation) -> FilterDecision {
        self.confirmed = observation.state;
        FilterDecision::Forward(observation)
    }
}
