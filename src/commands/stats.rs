use clap::Args;
use serde::Serialize;

use super::{unknown_participant, OutputFormat};
use study_challenge::{ChallengeBackend, ChallengeService, Clock, StreakStats};

/// Show streak statistics
#[derive(Args)]
pub struct StatsCommand {
    /// Participant email; omit to show standings for everyone
    #[arg(long, short)]
    email: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct UserStatsOutput<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(flatten)]
    stats: StreakStats,
}

impl StatsCommand {
    pub async fn run<B: ChallengeBackend, C: Clock>(
        &self,
        service: &ChallengeService<B, C>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.email {
            Some(email) => {
                let user = service
                    .find_user(email)
                    .await?
                    .ok_or_else(|| unknown_participant(email))?;
                let stats = service.user_stats(user.id).await?;

                match self.format {
                    OutputFormat::Json => {
                        let output = UserStatsOutput {
                            name: &user.name,
                            email: &user.email,
                            stats,
                        };
                        println!("{}", serde_json::to_string_pretty(&output)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", user.name);
                        println!("{}", "-".repeat(user.name.len()));
                        println!("  Current streak: {} day(s)", stats.streak);
                        println!("  Total logs:     {}", stats.total_logs);
                    }
                }
            }
            None => {
                let standings = service.standings().await?;

                match self.format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&standings)?);
                    }
                    OutputFormat::Text => {
                        if standings.is_empty() {
                            println!("No participants yet.");
                            return Ok(());
                        }

                        println!("  {:20} {:>7} {:>6}", "Name", "Streak", "Logs");
                        for standing in &standings {
                            println!(
                                "  {:20} {:>7} {:>6}",
                                standing.user.name,
                                standing.stats.streak,
                                standing.stats.total_logs
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
