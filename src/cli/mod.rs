use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `glider` - mirrors the hackerspace open/closed status onto Discord.
#[derive(Parser, Debug)]
#[command(name = "glider")]
#[command(version)]
#[command(about = "Announces the space status through a Discord bot.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.glider/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Start the bot (default)
    Run,
    /// Poll the status endpoint once and print what would be announced
    Check,
    /// Show configuration and the persisted enabled flag
    Status,
}
