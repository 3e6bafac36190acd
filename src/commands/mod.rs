mod config_cmd;
mod log;
mod login;
mod stats;
mod user;

use clap::ValueEnum;

pub use config_cmd::ConfigCommand;
pub use log::LogCommand;
pub use login::LoginCommand;
pub use stats::StatsCommand;
pub use user::UserCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Error for commands that name a participant who has not joined yet.
pub(crate) fn unknown_participant(email: &str) -> Box<dyn std::error::Error> {
    format!(
        "No participant registered for '{}'. Run `challenge user ensure --email {}` first.",
        email, email
    )
    .into()
}
