//! Discord adapters: REST client, gateway session, and the presence-sink and
//! voice-connector implementations built on them.

pub mod gateway;
pub mod http_client;
pub mod router;
pub mod sink;
pub mod types;
pub mod voice;

pub use gateway::{DiscordGateway, GatewayCommander, GatewayEvent, VoiceStateSnapshot};
pub use http_client::{DiscordApiError, DiscordHttpClient};
pub use router::EventRouter;
pub use sink::DiscordPresenceSink;
pub use types::GLIDER_INTENTS;
pub use voice::DiscordVoiceConnector;
