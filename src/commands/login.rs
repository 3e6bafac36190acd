use clap::Args;

use study_challenge::{ChallengeBackend, ChallengeService, Clock, Config};

/// Start an anonymous session for a participant
#[derive(Args)]
pub struct LoginCommand {
    /// Participant email, stored as session metadata
    #[arg(long, short)]
    email: String,
}

impl LoginCommand {
    pub async fn run<B: ChallengeBackend, C: Clock>(
        &self,
        service: &ChallengeService<B, C>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let session = service.sign_in(&self.email).await?;
        Config::save_access_token(&config.config_path, &session.access_token)?;
        tracing::info!("Saved access token to {}", config.config_path.display());

        println!("Signed in anonymously.");
        println!("  Session user: {}", session.user_id);
        if let Some(expires_in) = session.expires_in {
            println!("  Expires in:   {}s", expires_in);
        }
        println!("  Token saved:  {}", config.config_path.display());

        Ok(())
    }
}
