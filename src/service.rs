//! Challenge operations over an injected backend and clock.

use chrono::NaiveDate;
use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::backend::{BackendError, ChallengeBackend};
use crate::config::DEFAULT_RECENT_LIMIT;
use crate::models::{
    default_name, normalize_email, ChallengeUser, NewStudyLog, Photo, RecentLog, Session,
    StudyLog, DATE_FORMAT,
};
use crate::streak::{Clock, StreakCalculator, StreakStats};

/// Upper bound on per-participant log fetches in flight at once.
pub const STANDINGS_CONCURRENCY: usize = 4;

/// Errors returned by [`ChallengeService`] operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Email was empty after trimming
    InvalidEmail,
    /// Study text was empty after trimming
    EmptyStudyText,
    /// Backend call failed
    Backend(BackendError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::InvalidEmail => write!(f, "Email cannot be empty"),
            ServiceError::EmptyStudyText => write!(f, "Study text cannot be empty"),
            ServiceError::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Backend(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackendError> for ServiceError {
    fn from(e: BackendError) -> Self {
        ServiceError::Backend(e)
    }
}

/// A participant together with their current streak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub user: ChallengeUser,
    pub stats: StreakStats,
}

/// Entry point for every challenge operation.
pub struct ChallengeService<B, C> {
    backend: B,
    calculator: StreakCalculator<C>,
}

impl<B: ChallengeBackend, C: Clock> ChallengeService<B, C> {
    pub fn new(backend: B, clock: C) -> Self {
        Self {
            backend,
            calculator: StreakCalculator::new(clock),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Today's date according to the service clock.
    pub fn today(&self) -> NaiveDate {
        self.calculator.clock().today()
    }

    /// Starts an anonymous session tagged with the participant's email.
    pub async fn sign_in(&self, email: &str) -> Result<Session, ServiceError> {
        let email = checked_email(email)?;
        let session = self.backend.sign_in_anonymously(&email).await?;
        tracing::info!("Signed in {} as {}", email, session.user_id);
        Ok(session)
    }

    /// Looks up a participant without creating one.
    pub async fn find_user(&self, email: &str) -> Result<Option<ChallengeUser>, ServiceError> {
        let email = checked_email(email)?;
        Ok(self.backend.find_user_by_email(&email).await?)
    }

    /// Returns the participant registered under `email`, creating it if needed.
    ///
    /// Lookup ignores case. A new participant without a name is named after
    /// the local part of the email. When `name` is given and differs from the
    /// stored one, the stored name is updated.
    pub async fn find_or_create_user(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<ChallengeUser, ServiceError> {
        let email = checked_email(email)?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        if let Some(existing) = self.backend.find_user_by_email(&email).await? {
            return match name {
                Some(name) if name != existing.name => {
                    tracing::info!("Renaming {} from '{}' to '{}'", email, existing.name, name);
                    Ok(self.backend.update_user_name(existing.id, name).await?)
                }
                _ => Ok(existing),
            };
        }

        let name = name.map(str::to_string).unwrap_or_else(|| default_name(&email));
        let user = self.backend.insert_user(&email, &name).await?;
        tracing::info!("Registered {} as '{}'", email, user.name);
        Ok(user)
    }

    /// Records a day's study, uploading the photo first when one is given.
    ///
    /// Text that is blank after trimming is rejected; otherwise it is stored
    /// as entered. A failed upload does not fail the submission: the log is stored
    /// without a photo.
    pub async fn submit_log(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        study_text: &str,
        photo: Option<&Photo>,
    ) -> Result<StudyLog, ServiceError> {
        if study_text.trim().is_empty() {
            return Err(ServiceError::EmptyStudyText);
        }

        let photo_url = match photo {
            Some(photo) => self.upload_photo(user_id, date, photo).await,
            None => None,
        };

        let new_log = NewStudyLog::new(user_id, date, study_text).with_photo_url(photo_url);
        let log = self.backend.insert_log(&new_log).await?;
        tracing::info!("Logged study for {} on {}", user_id, log.date);
        Ok(log)
    }

    async fn upload_photo(&self, user_id: Uuid, date: NaiveDate, photo: &Photo) -> Option<String> {
        let path = photo_path(user_id, date, photo, rand::random());
        match self.backend.upload_photo(&path, photo).await {
            Ok(()) => Some(self.backend.public_url(&path)),
            Err(e) => {
                tracing::warn!("Photo upload failed, saving log without photo: {}", e);
                None
            }
        }
    }

    /// A participant's logs, newest date first.
    pub async fn user_logs(&self, user_id: Uuid) -> Result<Vec<StudyLog>, ServiceError> {
        Ok(self.backend.list_logs(user_id).await?)
    }

    /// All participants, oldest first.
    pub async fn all_users(&self) -> Result<Vec<ChallengeUser>, ServiceError> {
        Ok(self.backend.list_users().await?)
    }

    /// Newest logs across all participants, with author names.
    ///
    /// `None` uses the default feed size.
    pub async fn recent_logs(&self, limit: Option<usize>) -> Result<Vec<RecentLog>, ServiceError> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        Ok(self.backend.list_recent_logs(limit).await?)
    }

    /// Current streak and total log count for a participant.
    pub async fn user_stats(&self, user_id: Uuid) -> Result<StreakStats, ServiceError> {
        let logs = self.user_logs(user_id).await?;
        let stats = self.calculator.stats(&logs);
        tracing::debug!(
            "Stats for {}: streak {} over {} log(s)",
            user_id,
            stats.streak,
            stats.total_logs
        );
        Ok(stats)
    }

    /// Every participant with their stats, longest streak first.
    ///
    /// Ties keep registration order. At most [`STANDINGS_CONCURRENCY`]
    /// participants are fetched at a time.
    pub async fn standings(&self) -> Result<Vec<Standing>, ServiceError> {
        let users = self.all_users().await?;
        let fetches = users.iter().map(|user| self.user_stats(user.id));
        let stats: Vec<StreakStats> = stream::iter(fetches)
            .buffered(STANDINGS_CONCURRENCY)
            .try_collect()
            .await?;

        let mut standings: Vec<Standing> = users
            .into_iter()
            .zip(stats)
            .map(|(user, stats)| Standing { user, stats })
            .collect();
        standings.sort_by(|a, b| b.stats.streak.cmp(&a.stats.streak));
        Ok(standings)
    }
}

fn checked_email(email: &str) -> Result<String, ServiceError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ServiceError::InvalidEmail);
    }
    Ok(email)
}

/// Object path for a photo: `{user_id}/{date}-{nonce}.{ext}`.
fn photo_path(user_id: Uuid, date: NaiveDate, photo: &Photo, nonce: u32) -> String {
    format!(
        "{}/{}-{}.{}",
        user_id,
        date.format(DATE_FORMAT),
        nonce,
        photo.extension()
    )
}
