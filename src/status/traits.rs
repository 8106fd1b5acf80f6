use std::future::Future;
use std::pin::Pin;

use super::Observation;
use crate::error::FetchError;

/// One blocking read of the occupancy feed per call. Holds no state across
/// calls.
pub trait StatusSource: Send + Sync {
    /// Human-readable source name for logs
    fn name(&self) -> &str;

    fn poll<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Observation, FetchError>> + Send + 'a>>;
}
