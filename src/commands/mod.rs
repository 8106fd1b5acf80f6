//! Chat commands accepted in the command channel.

pub mod help;
pub mod parser;
pub mod types;

pub use help::{HelpCard, HelpField, help_card};
pub use parser::parse_command;
pub use types::{CommandOutcome, GliderCommand};
