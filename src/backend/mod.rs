//! Remote collaborators of the challenge client.
//!
//! [`ChallengeBackend`] describes everything the client needs from the hosted
//! backend: anonymous sign-in, the `challenge_users` and `challenge_logs`
//! tables, and the photo bucket. [`SupabaseClient`] talks to a real Supabase
//! project over REST; [`InMemoryBackend`] keeps everything in process.

mod memory;
mod supabase;

pub use memory::InMemoryBackend;
pub use supabase::SupabaseClient;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{ChallengeUser, NewStudyLog, Photo, RecentLog, Session, StudyLog};

/// Errors returned by a backend.
#[derive(Debug)]
pub enum BackendError {
    /// Backend URL or key missing from config
    NotConfigured,
    /// Transport-level failure
    Http(String),
    /// Backend answered with a non-success status
    Api { status: u16, message: String },
    /// Response body did not match the expected shape
    Decode(String),
    /// Insert or update returned no row
    EmptyResponse(&'static str),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotConfigured => write!(
                f,
                "Backend not configured. Set supabase_url and supabase_anon_key in config."
            ),
            BackendError::Http(e) => write!(f, "HTTP error: {}", e),
            BackendError::Api { status, message } => {
                write!(f, "Backend returned {}: {}", status, message)
            }
            BackendError::Decode(e) => write!(f, "Unexpected response: {}", e),
            BackendError::EmptyResponse(table) => {
                write!(f, "Backend returned no row from {}", table)
            }
        }
    }
}

impl std::error::Error for BackendError {}

#[async_trait]
pub trait ChallengeBackend: Send + Sync {
    /// Starts an anonymous session tagged with the participant's email.
    async fn sign_in_anonymously(&self, email: &str) -> Result<Session, BackendError>;

    /// Looks up a participant by (already normalized) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<ChallengeUser>, BackendError>;

    async fn insert_user(&self, email: &str, name: &str) -> Result<ChallengeUser, BackendError>;

    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<ChallengeUser, BackendError>;

    /// All participants, oldest first.
    async fn list_users(&self) -> Result<Vec<ChallengeUser>, BackendError>;

    async fn insert_log(&self, log: &NewStudyLog) -> Result<StudyLog, BackendError>;

    /// A participant's logs, newest date first.
    async fn list_logs(&self, user_id: Uuid) -> Result<Vec<StudyLog>, BackendError>;

    /// Most recently created logs across all participants.
    async fn list_recent_logs(&self, limit: usize) -> Result<Vec<RecentLog>, BackendError>;

    /// Stores a photo at `path` inside the photo bucket.
    async fn upload_photo(&self, path: &str, photo: &Photo) -> Result<(), BackendError>;

    /// Public URL of an object in the photo bucket.
    fn public_url(&self, path: &str) -> String;
}
