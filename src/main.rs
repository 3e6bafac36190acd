use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{ConfigCommand, LogCommand, LoginCommand, StatsCommand, UserCommand};
use study_challenge::{ChallengeService, Config, LocalClock, SupabaseClient};

#[derive(Parser)]
#[command(name = "challenge")]
#[command(version)]
#[command(about = "Track the daily study challenge", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an anonymous session
    Login(LoginCommand),

    /// Join the challenge and list participants
    User(UserCommand),

    /// Submit and browse study logs
    Log(LogCommand),

    /// Show streaks
    Stats(StatsCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "study_challenge=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let backend = SupabaseClient::from_config(&config)?;
    tracing::debug!("Using backend at {}", backend.base_url());
    let service = ChallengeService::new(backend, LocalClock);

    match command {
        Commands::Login(cmd) => cmd.run(&service, &config).await?,
        Commands::User(cmd) => cmd.run(&service).await?,
        Commands::Log(cmd) => cmd.run(&service, config.recent_limit.value).await?,
        Commands::Stats(cmd) => cmd.run(&service).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
