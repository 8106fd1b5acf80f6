/// Commands an operator can send in the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GliderCommand {
    /// `!glider on`
    Enable,
    /// `!glider off`
    Disable,
    /// `!help`
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The enabled flag was set and an out-of-cycle tick ran.
    Toggled { enabled: bool, changed: bool },
    /// The caller should reply with the help card.
    Help,
}
