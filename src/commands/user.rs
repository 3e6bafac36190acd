use clap::{Args, Subcommand};

use super::OutputFormat;
use study_challenge::{ChallengeBackend, ChallengeService, Clock};

#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Join the challenge, or update your display name
    Ensure {
        /// Email address (case-insensitive)
        #[arg(long, short)]
        email: String,

        /// Display name, defaults to the part of the email before '@'
        #[arg(long, short)]
        name: Option<String>,
    },

    /// List all participants
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl UserCommand {
    pub async fn run<B: ChallengeBackend, C: Clock>(
        &self,
        service: &ChallengeService<B, C>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            UserSubcommand::Ensure { email, name } => {
                let user = service.find_or_create_user(email, name.as_deref()).await?;

                println!("Participant: {}", user);
                println!("ID: {}", user.id);
                Ok(())
            }
            UserSubcommand::List { format } => {
                let users = service.all_users().await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&users)?);
                    }
                    OutputFormat::Text => {
                        if users.is_empty() {
                            println!("No participants yet.");
                            return Ok(());
                        }

                        for user in &users {
                            println!("  {}", user);
                        }
                        println!("\nTotal: {} participant(s)", users.len());
                    }
                }
                Ok(())
            }
        }
    }
}
