use clap::{Args, Subcommand};

use super::OutputFormat;
use study_challenge::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!("Config file: {} (not found)", config.config_path.display());
                        }
                        println!();

                        println!(
                            "supabase_url: {}",
                            config.supabase_url.value.as_deref().unwrap_or("(not set)")
                        );
                        println!("  source: {}", config.supabase_url.source);
                        println!();

                        println!(
                            "supabase_anon_key: {}",
                            config
                                .masked_anon_key()
                                .unwrap_or_else(|| "(not set)".to_string())
                        );
                        println!("  source: {}", config.supabase_anon_key.source);
                        println!();

                        let token = match config.access_token.value {
                            Some(_) => "(saved)",
                            None => "(not set)",
                        };
                        println!("access_token: {}", token);
                        println!("  source: {}", config.access_token.source);
                        println!();

                        println!("photo_bucket: {}", config.photo_bucket.value);
                        println!("  source: {}", config.photo_bucket.source);
                        println!();

                        println!("recent_limit: {}", config.recent_limit.value);
                        println!("  source: {}", config.recent_limit.source);
                    }
                }
                Ok(())
            }
        }
    }
}
