//! Status feed: normalized observations and the adapters producing them.

pub mod space_api;
pub mod traits;
pub mod types;

pub use space_api::{SpaceApiSource, parse_status_document};
pub use traits::StatusSource;
pub use types::{Observation, OccupancyState};
