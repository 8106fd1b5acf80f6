//! Voice-channel occupancy: the connector seam and the watchdog keeping the
//! bot parked in its designated channel.

pub mod traits;
pub mod watchdog;

pub use traits::{ResolvedChannel, VoiceConnector, VoiceFuture};
pub use watchdog::{CheckOutcome, ConnectionWatchdog, MembershipPhase};
