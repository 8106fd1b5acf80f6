use serde::{Deserialize, Serialize};

/// Occupancy of the physical space as reported by the feed.
///
/// `Unknown` is also what the presence surface shows while status updates
/// are disabled.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OccupancyState {
    Open,
    Closed,
    #[default]
    Unknown,
}

impl OccupancyState {
    /// Capitalized name used in human-facing labels.
    pub fn title(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
            Self::Unknown => "Unknown",
        }
    }
}

/// One poll's normalized reading. Produced fresh each tick, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub state: OccupancyState,
    /// `None` only when no count is meaningful (status updates disabled).
    pub person_count: Option<u32>,
}

impl Observation {
    pub fn new(state: OccupancyState, person_count: Option<u32>) -> Self {
        Self {
            state,
            person_count,
        }
    }

    pub fn open(person_count: u32) -> Self {
        Self::new(OccupancyState::Open, Some(person_count))
    }

    pub fn closed(person_count: u32) -> Self {
        Self::new(OccupancyState::Closed, Some(person_count))
    }

    pub fn unknown() -> Self {
        Self::new(OccupancyState::Unknown, None)
    }
}
