use chrono::NaiveDate;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use super::{unknown_participant, OutputFormat};
use study_challenge::models::DATE_FORMAT;
use study_challenge::{ChallengeBackend, ChallengeService, Clock, Photo, StudyLog};

#[derive(Args)]
pub struct LogCommand {
    #[command(subcommand)]
    pub command: LogSubcommand,
}

#[derive(Subcommand)]
pub enum LogSubcommand {
    /// Submit a day's study log
    Submit {
        /// Participant email
        #[arg(long, short)]
        email: String,

        /// Display name (only used when joining or renaming)
        #[arg(long, short)]
        name: Option<String>,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<String>,

        /// What you studied
        #[arg(long, short)]
        text: String,

        /// Photo of your work
        #[arg(long, short)]
        photo: Option<PathBuf>,
    },

    /// List a participant's logs, newest first
    List {
        /// Participant email
        #[arg(long, short)]
        email: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the latest logs from everyone
    Recent {
        /// Number of entries, defaults to `recent_limit` from config
        #[arg(long, short)]
        limit: Option<usize>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl LogCommand {
    pub async fn run<B: ChallengeBackend, C: Clock>(
        &self,
        service: &ChallengeService<B, C>,
        default_limit: usize,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            LogSubcommand::Submit {
                email,
                name,
                date,
                text,
                photo,
            } => {
                let date = match date {
                    Some(d) => NaiveDate::parse_from_str(d, DATE_FORMAT)
                        .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", d))?,
                    None => service.today(),
                };
                let photo = match photo {
                    Some(path) => Some(read_photo(path).await?),
                    None => None,
                };

                let user = service.find_or_create_user(email, name.as_deref()).await?;
                let log = service
                    .submit_log(user.id, date, text, photo.as_ref())
                    .await?;

                println!("Logged study for {}:", user.name);
                println!();
                print_log_details(&log);
                if photo.is_some() && log.photo_url.is_none() {
                    println!("(photo upload failed; saved without photo)");
                }
                Ok(())
            }
            LogSubcommand::List { email, format } => {
                let user = service
                    .find_user(email)
                    .await?
                    .ok_or_else(|| unknown_participant(email))?;
                let logs = service.user_logs(user.id).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&logs)?);
                    }
                    OutputFormat::Text => {
                        if logs.is_empty() {
                            println!("No logs yet for {}", user.name);
                            return Ok(());
                        }

                        for log in &logs {
                            println!("{}", log);
                        }
                        println!("Total: {} log(s)", logs.len());
                    }
                }
                Ok(())
            }
            LogSubcommand::Recent { limit, format } => {
                let logs = service
                    .recent_logs(Some(limit.unwrap_or(default_limit)))
                    .await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&logs)?);
                    }
                    OutputFormat::Text => {
                        if logs.is_empty() {
                            println!("No logs yet.");
                            return Ok(());
                        }

                        for recent in &logs {
                            let photo = if recent.log.photo_url.is_some() {
                                " [photo]"
                            } else {
                                ""
                            };
                            println!(
                                "  {}  {:16} {}{}",
                                recent.log.date,
                                recent.author_name(),
                                recent.log.study_text,
                                photo
                            );
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

async fn read_photo(path: &Path) -> Result<Photo, Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read photo '{}': {}", path.display(), e))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());

    Ok(Photo::new(file_name, bytes))
}

fn print_log_details(log: &StudyLog) {
    println!("  Date: {}", log.date);
    println!("  Study: {}", log.study_text);
    if let Some(url) = &log.photo_url {
        println!("  Photo: {}", url);
    }
    println!();
    println!("Log ID: {}", log.id);
}
