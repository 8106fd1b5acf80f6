use std::sync::Arc;
use std::time::Duration;

use super::avatars::AvatarSet;
use super::cooldown::FieldCooldowns;
use super::render::{self, PresenceLabels};
use super::traits::{PresenceField, PresenceSink};
use crate::error::SinkError;
use crate::status::{Observation, OccupancyState};

/// Sync status of one presence field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldStatus {
    /// The platform shows what was last rendered.
    Synced,
    /// Not yet applied, or rate-limited. Retried on the next cycle.
    #[default]
    Pending,
    /// Rejected by the platform. Retried on the next cycle that changes something.
    Stale,
}

/// What has actually been pushed to the presence surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncedState {
    pub occupancy: OccupancyState,
    pub person_count: Option<u32>,
    /// Last nickname text the platform accepted.
    pub nickname: Option<String>,
    pub nickname_status: FieldStatus,
    pub channel_status: FieldStatus,
    pub avatar_status: FieldStatus,
}

impl Default for AnnouncedState {
    fn default() -> Self {
        Self {
            occupancy: OccupancyState::Unknown,
            person_count: Some(0),
            nickname: None,
            nickname_status: FieldStatus::Pending,
            channel_status: FieldStatus::Pending,
            avatar_status: FieldStatus::Pending,
        }
    }
}

impl AnnouncedState {
    pub fn status(&self, field: PresenceField) -> FieldStatus {
        match field {
            PresenceField::Nickname => self.nickname_status,
            PresenceField::ChannelName => self.channel_status,
            PresenceField::Avatar => self.avatar_status,
        }
    }

    fn status_mut(&mut self, field: PresenceField) -> &mut FieldStatus {
        match field {
            PresenceField::Nickname => &mut self.nickname_status,
            PresenceField::ChannelName => &mut self.channel_status,
            PresenceField::Avatar => &mut self.avatar_status,
        }
    }

    pub fn has_pending_retry(&self) -> bool {
        [
            self.nickname_status,
            self.channel_status,
            self.avatar_status,
        ]
        .contains(&FieldStatus::Pending)
    }
}

/// Result of one field's step in a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to do, or blocked by an earlier step.
    Skipped,
    Applied,
    /// Rate-limited now or still inside an earlier retry-after window.
    Deferred { retry_after: Duration },
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub nickname: StepOutcome,
    pub channel: StepOutcome,
    pub avatar: StepOutcome,
}

impl ReconcileReport {
    fn noop() -> Self {
        Self {
            nickname: StepOutcome::Skipped,
            channel: StepOutcome::Skipped,
            avatar: StepOutcome::Skipped,
        }
    }

    /// True when no external call was made.
    pub fn is_noop(&self) -> bool {
        *self == Self::noop()
    }
}

/// Diffs forwarded observations against [`AnnouncedState`] and pushes the
/// minimal set of updates through a [`PresenceSink`].
///
/// Steps run in order nickname → channel name → avatar. Each step is fault
/// isolated, except that a rate-limited channel rename holds back the
/// occupancy commit and skips the avatar for the cycle.
pub struct ReconciliationEngine {
    sink: Arc<dyn PresenceSink>,
    channel_id: String,
    avatars: AvatarSet,
    announced: AnnouncedState,
    cooldowns: FieldCooldowns,
}

impl ReconciliationEngine {
    pub fn new(sink: Arc<dyn PresenceSink>, channel_id: impl Into<String>, avatars: AvatarSet) -> Self {
        Self {
            sink,
            channel_id: channel_id.into(),
            avatars,
            announced: AnnouncedState::default(),
            cooldowns: FieldCooldowns::new(),
        }
    }

    pub fn announced(&self) -> &AnnouncedState {
        &self.announced
    }

    pub fn has_pending_retry(&self) -> bool {
        self.announced.has_pending_retry()
    }

    pub async fn reconcile(&mut self, observation: &Observation) -> ReconcileReport {
        if observation.state == self.announced.occupancy
            && observation.person_count == self.announced.person_count
            && !self.announced.has_pending_retry()
        {
            tracing::debug!("Presence already shows {}; nothing to do", observation.state);
            return ReconcileReport::noop();
        }

        let state_changed = observation.state != self.announced.occupancy;
        let labels = render::render_labels(observation);
        if state_changed {
            tracing::info!(
                "Announcing space {} (was {})",
                observation.state,
                self.announced.occupancy
            );
        }

        let nickname = self.sync_nickname(&labels).await;
        let channel = self.sync_channel_name(&labels, state_changed).await;
        let channel_blocked = matches!(channel, StepOutcome::Deferred { .. });

        let avatar = if channel_blocked {
            StepOutcome::Skipped
        } else {
            self.sync_avatar(observation.state, state_changed).await
        };

        if !channel_blocked {
            self.announced.occupancy = observation.state;
        }
        if self.announced.nickname_status != FieldStatus::Pending {
            self.announced.person_count = observation.person_count;
        }

        ReconcileReport {
            nickname,
            channel,
            avatar,
        }
    }

    async fn sync_nickname(&mut self, labels: &PresenceLabels) -> StepOutcome {
        let field = PresenceField::Nickname;
        if self.announced.nickname.as_deref() == Some(labels.nickname.as_str())
            && self.announced.nickname_status == FieldStatus::Synced
        {
            return StepOutcome::Skipped;
        }
        if let Some(outcome) = self.deferred_by_cooldown(field) {
            return outcome;
        }

        let sink = Arc::clone(&self.sink);
        let result = sink.set_member_nickname(&labels.nickname).await;
        let outcome = self.settle(field, result);
        if outcome == StepOutcome::Applied {
            self.announced.nickname = Some(labels.nickname.clone());
            tracing::info!("Nickname set to {:?}", labels.nickname);
        }

        if let Err(error) = sink.set_activity(&labels.activity).await {
            tracing::warn!("Activity update via {} failed: {error}", sink.name());
        }
        outcome
    }

    async fn sync_channel_name(&mut self, labels: &PresenceLabels, state_changed: bool) -> StepOutcome {
        let field = PresenceField::ChannelName;
        if !state_changed && self.announced.channel_status == FieldStatus::Synced {
            return StepOutcome::Skipped;
        }
        if let Some(outcome) = self.deferred_by_cooldown(field) {
            return outcome;
        }

        let sink = Arc::clone(&self.sink);
        let result = sink
            .set_channel_name(&self.channel_id, &labels.channel_name)
            .await;
        let outcome = self.settle(field, result);
        if outcome == StepOutcome::Applied {
            tracing::info!("Channel renamed to {:?}", labels.channel_name);
        }
        outcome
    }

    async fn sync_avatar(&mut self, state: OccupancyState, state_changed: bool) -> StepOutcome {
        let field = PresenceField::Avatar;
        if !state_changed && self.announced.avatar_status == FieldStatus::Synced {
            return StepOutcome::Skipped;
        }
        if let Some(outcome) = self.deferred_by_cooldown(field) {
            return outcome;
        }
        let Some(image) = self.avatars.image_for(state).map(<[u8]>::to_vec) else {
            tracing::error!("No avatar asset for state {state}; avatar left as is");
            self.announced.avatar_status = FieldStatus::Stale;
            return StepOutcome::Failed;
        };

        let sink = Arc::clone(&self.sink);
        let result = sink.set_own_avatar(&image).await;
        let outcome = self.settle(field, result);
        if outcome == StepOutcome::Applied {
            tracing::info!("Avatar switched to {state}");
        }
        outcome
    }

    fn deferred_by_cooldown(&mut self, field: PresenceField) -> Option<StepOutcome> {
        let retry_after = self.cooldowns.remaining(field)?;
        tracing::debug!(
            "{field} update still rate-limited for {:.1}s",
            retry_after.as_secs_f64()
        );
        *self.announced.status_mut(field) = FieldStatus::Pending;
        Some(StepOutcome::Deferred { retry_after })
    }

    /// Records the result of one sink call into the field status.
    fn settle(&mut self, field: PresenceField, result: Result<(), SinkError>) -> StepOutcome {
        let (status, outcome) = match result {
            Ok(()) => {
                self.cooldowns.clear(field);
                (FieldStatus::Synced, StepOutcome::Applied)
            }
            Err(error) => match error.retry_after() {
                Some(retry_after) => {
                    tracing::warn!(
                        "{field} update rate-limited; retrying in {:.1}s",
                        retry_after.as_secs_f64()
                    );
                    self.cooldowns.set_cooldown(field, retry_after);
                    (FieldStatus::Pending, StepOutcome::Deferred { retry_after })
                }
                None => {
                    tracing::warn!("{field} update via {} failed: {error}", self.sink.name());
                    (FieldStatus::Stale, StepOutcome::Failed)
                }
            },
        };
        *self.announced.status_mut(field) = status;
        outcome
    }
}
