use crate::status::{Observation, OccupancyState};

const PERSON_GLYPH: &str = "🧙";

/// Every externally visible value derived from one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceLabels {
    pub nickname: String,
    pub channel_name: String,
    pub activity: Activity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Idle,
}

/// Gateway activity types used by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActivityKind {
    Watching = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub name: String,
    pub kind: ActivityKind,
    pub status: OnlineStatus,
}

fn state_glyph(state: OccupancyState) -> &'static str {
    match state {
        OccupancyState::Open => "🟢",
        OccupancyState::Closed => "🔴",
        OccupancyState::Unknown => "🟡",
    }
}

fn lock_glyph(state: OccupancyState) -> &'static str {
    match state {
        OccupancyState::Open => "🔓",
        OccupancyState::Closed => "🔒",
        OccupancyState::Unknown => "❔",
    }
}

pub fn nickname(observation: &Observation) -> String {
    let glyph = state_glyph(observation.state);
    let title = observation.state.title();
    match (observation.state, observation.person_count) {
        (OccupancyState::Open, Some(count)) => format!("{glyph} {title} ({count} {PERSON_GLYPH})"),
        _ => format!("{glyph} {title}"),
    }
}

/// Depends on the state only, so count changes never rename the channel.
pub fn channel_name(state: OccupancyState) -> String {
    format!(
        "{}{}-space-is-{state}",
        state_glyph(state),
        lock_glyph(state)
    )
}

pub fn activity(state: OccupancyState) -> Activity {
    Activity {
        name: format!("the Space (*{state}*)"),
        kind: ActivityKind::Watching,
        status: if state == OccupancyState::Open {
            OnlineStatus::Online
        } else {
            OnlineStatus::Idle
        },
    }
}

pub fn render_labels(observation: &Observation) -> PresenceLabels {
    PresenceLabels {
        nickname: nickname(observation),
        channel_name: channel_name(observation.state),
        activity: activity(observation.state),
    }
}
