use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::PresenceField;

/// Tracks the retry-after windows the platform advertised per field.
///
/// When an update is rate-limited the engine records a cooldown via
/// [`set_cooldown`](Self::set_cooldown); the field stays pending and is not
/// re-sent until [`remaining`](Self::remaining) returns `None`.
#[derive(Debug, Default)]
pub struct FieldCooldowns {
    cooldowns: HashMap<PresenceField, Instant>,
}

impl FieldCooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cooldown for `field` that expires after `duration`.
    pub fn set_cooldown(&mut self, field: PresenceField, duration: Duration) {
        self.cooldowns.insert(field, Instant::now() + duration);
    }

    /// Remaining cooldown for `field`, or `None` once it has expired.
    pub fn remaining(&self, field: PresenceField) -> Option<Duration> {
        let expires_at = self.cooldowns.get(&field)?;
        let now = Instant::now();
        (now < *expires_at).then(|| *expires_at - now)
    }

    pub fn clear(&mut self, field: PresenceField) {
        self.cooldowns.remove(&field);
    }
}
