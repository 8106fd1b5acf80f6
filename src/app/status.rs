use glider::Config;
use glider::presence::render_labels;
use glider::status::Observation;

pub fn render_status(config: &Config, enabled: bool) -> String {
    let discord = &config.discord;
    let lines = [
        "◆ glider status".to_string(),
        String::new(),
        format!("Version         {}", env!("CARGO_PKG_VERSION")),
        format!("Config          {}", config.config_path.display()),
        format!("Status feed     {}", config.status.endpoint),
        format!(
            "Poll interval   {}s (closing confirmed after {}s)",
            config.status.poll_interval_secs, config.status.confirmation_window_secs
        ),
        String::new(),
        format!(
            "Guild           {}",
            discord.guild_id.as_deref().unwrap_or("(from status channel)")
        ),
        format!("Voice channel   {}", discord.voice_channel_id),
        format!("Status channel  {}", discord.status_channel_id),
        format!("Command channel {}", config.command_channel_id()),
        format!("Avatars         {}", config.avatar_dir().display()),
        String::new(),
        format!(
            "Updates         {}",
            if enabled { "enabled" } else { "disabled" }
        ),
    ];
    lines.join("\n")
}

pub fn render_check(endpoint: &str, observation: &Observation) -> String {
    let labels = render_labels(observation);
    let count = observation
        .person_count
        .map_or_else(|| "-".to_string(), |count| count.to_string());
    [
        format!("◆ {endpoint}"),
        format!("State     {}", observation.state),
        format!("People    {count}"),
        format!("Nickname  {}", labels.nickname),
        format!("Channel   {}", labels.channel_name),
        format!("Activity  Watching {}", labels.activity.name),
    ]
    .join("\n")
}
