use super::types::GliderCommand;

pub fn parse_command(input: &str) -> Option<GliderCommand> {
    match input.trim().to_lowercase().as_str() {
        "!glider on" => Some(GliderCommand::Enable),
        "!glider off" => Some(GliderCommand::Disable),
        "!help" => Some(GliderCommand::Help),
        _ => None,
    }
}
