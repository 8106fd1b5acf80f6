use std::path::Path;

use crate::status::OccupancyState;

/// Avatar images, one per occupancy state, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct AvatarSet {
    open: Option<Vec<u8>>,
    closed: Option<Vec<u8>>,
    unknown: Option<Vec<u8>>,
}

impl AvatarSet {
    pub fn new(open: Option<Vec<u8>>, closed: Option<Vec<u8>>, unknown: Option<Vec<u8>>) -> Self {
        Self {
            open,
            closed,
            unknown,
        }
    }

    /// Reads `glider_{state}.png` from `dir`. Missing files degrade the
    /// avatar step instead of aborting startup.
    pub fn load(dir: &Path) -> Self {
        let read = |state: OccupancyState, required: bool| {
            let path = dir.join(format!("glider_{state}.png"));
            match std::fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(error) if required => {
                    tracing::error!("Avatar asset {} unavailable: {error}", path.display());
                    None
                }
                Err(_) => {
                    tracing::debug!("Optional avatar asset {} not found", path.display());
                    None
                }
            }
        };

        Self {
            open: read(OccupancyState::Open, true),
            closed: read(OccupancyState::Closed, true),
            unknown: read(OccupancyState::Unknown, false),
        }
    }

    /// Image for `state`; `Unknown` falls back to the closed image.
    pub fn image_for(&self, state: OccupancyState) -> Option<&[u8]> {
        match state {
            OccupancyState::Open => self.open.as_deref(),
            OccupancyState::Closed => self.closed.as_deref(),
            OccupancyState::Unknown => self.unknown.as_deref().or(self.closed.as_deref()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.open.is_some() && self.closed.is_some()
    }
}
