use crate::config::Config;
use crate::presence::{
    AvatarSet, ConfirmationFilter, EnabledFlag, PresenceController, ReconciliationEngine,
};
use crate::status::SpaceApiSource;
use crate::transport::discord::{
    DiscordGateway, DiscordHttpClient, DiscordPresenceSink, DiscordVoiceConnector, EventRouter,
    GLIDER_INTENTS,
};
use crate::voice::ConnectionWatchdog;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

mod supervisor;

use supervisor::spawn_component_supervisor;

const EVENT_QUEUE_CAPACITY: usize = 256;

pub async fn run(config: Arc<Config>) -> Result<()> {
    let initial_backoff = config.reliability.component_initial_backoff_secs.max(1);
    let max_backoff = config
        .reliability
        .component_max_backoff_secs
        .max(initial_backoff);
    let max_restarts = config.reliability.component_max_restarts;

    let http = Arc::new(DiscordHttpClient::new(
        config.discord.bot_token.clone(),
        config.request_timeout(),
    )?);
    let (gateway, commander) =
        DiscordGateway::new(config.discord.bot_token.clone(), GLIDER_INTENTS);
    let gateway = Arc::new(gateway);

    verify_status_channel(&http, &config.discord.status_channel_id).await;

    let sink = Arc::new(DiscordPresenceSink::new(
        Arc::clone(&http),
        commander.clone(),
        config.discord.status_channel_id.clone(),
        config.discord.guild_id.clone(),
    ));
    let avatars = AvatarSet::load(&config.avatar_dir());
    if !avatars.is_complete() {
        tracing::warn!("Avatar set incomplete; avatar updates will be skipped for missing states");
    }
    let engine = ReconciliationEngine::new(sink, config.discord.status_channel_id.clone(), avatars);
    let source = Arc::new(SpaceApiSource::new(
        config.status.endpoint.clone(),
        config.request_timeout(),
    )?);
    let controller = Arc::new(PresenceController::new(
        source,
        EnabledFlag::load(config.enabled_marker_path()),
        ConfirmationFilter::new(config.confirmation_window()),
        engine,
    ));

    let connector = Arc::new(DiscordVoiceConnector::new(Arc::clone(&http), commander));
    let watchdog = Arc::new(ConnectionWatchdog::new(
        connector.clone(),
        config.discord.voice_channel_id.clone(),
        config.reconnect_delay(),
    ));
    let router = EventRouter::new(
        Arc::clone(&http),
        Arc::clone(&controller),
        connector,
        Arc::clone(&watchdog),
        config.command_channel_id(),
        config.discord.username.clone(),
    );

    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let mut handles: Vec<JoinHandle<()>> = vec![tokio::spawn(async move {
        router.run(event_rx).await;
    })];

    let gateway_http = Arc::clone(&http);
    handles.push(spawn_component_supervisor(
        "gateway",
        initial_backoff,
        max_backoff,
        max_restarts,
        move || {
            let gateway = Arc::clone(&gateway);
            let http = Arc::clone(&gateway_http);
            let tx = event_tx.clone();
            async move { gateway.run(&http, &tx).await }
        },
    ));

    let poll_interval = config.poll_interval();
    handles.push(spawn_component_supervisor(
        "presence",
        initial_backoff,
        max_backoff,
        max_restarts,
        move || {
            let controller = Arc::clone(&controller);
            async move {
                controller.run(poll_interval).await;
                Ok(())
            }
        },
    ));

    let watchdog_interval = config.watchdog_interval();
    handles.push(spawn_component_supervisor(
        "watchdog",
        initial_backoff,
        max_backoff,
        max_restarts,
        move || {
            let watchdog = Arc::clone(&watchdog);
            async move {
                watchdog.run(watchdog_interval).await;
                Ok(())
            }
        },
    ));

    println!("◆ glider started");
    println!("   Status feed: {}", config.status.endpoint);
    println!("   Voice channel: {}", config.discord.voice_channel_id);
    println!("   Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

/// A missing status channel is a configuration problem the daemon cannot fix;
/// it is reported and the daemon keeps running.
async fn verify_status_channel(http: &DiscordHttpClient, channel_id: &str) {
    match http.get_channel(channel_id).await {
        Ok(_) => tracing::info!("Status channel {channel_id} found"),
        Err(error) if error.is_not_found() => {
            tracing::error!("Status channel {channel_id} does not exist; channel updates will fail");
        }
        Err(error) => tracing::warn!("Could not verify status channel {channel_id}: {error}"),
    }
}
