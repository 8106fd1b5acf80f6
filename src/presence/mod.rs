//! Presence reconciliation: debounce the feed, diff it against what was last
//! announced, and push only the parts of the presence surface that changed.

pub mod avatars;
pub mod controller;
pub mod cooldown;
pub mod debounce;
pub mod enabled;
pub mod engine;
pub mod render;
pub mod traits;

pub use avatars::AvatarSet;
pub use controller::{PresenceController, TickOutcome};
pub use debounce::{ConfirmationFilter, FilterDecision, FilterPhase};
pub use enabled::EnabledFlag;
pub use engine::{AnnouncedState, FieldStatus, ReconcileReport, ReconciliationEngine, StepOutcome};
pub use render::{Activity, ActivityKind, OnlineStatus, PresenceLabels, render_labels};
pub use traits::{PresenceField, PresenceSink, SinkFuture};
