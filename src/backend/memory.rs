//! In-process backend.
//!
//! Keeps users, logs and uploaded photos in memory. Used as a test double for
//! [`crate::ChallengeService`]; the CLI always talks to Supabase.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{BackendError, ChallengeBackend};
use crate::models::{ChallengeUser, LogAuthor, NewStudyLog, Photo, RecentLog, Session, StudyLog};

const PUBLIC_BASE: &str = "memory://study-photos";

#[derive(Debug, Default)]
struct State {
    users: Vec<ChallengeUser>,
    logs: Vec<StudyLog>,
    photos: HashMap<String, Photo>,
    /// Insert counter used to give rows strictly increasing `created_at`.
    sequence: i64,
    fail_uploads: bool,
}

impl State {
    fn next_created_at(&mut self) -> DateTime<Utc> {
        self.sequence += 1;
        DateTime::<Utc>::default() + Duration::seconds(self.sequence)
    }
}

/// [`ChallengeBackend`] backed by in-memory collections.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent photo upload fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.lock().fail_uploads = fail;
    }

    /// Paths of all stored photos.
    pub fn photo_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().photos.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Inserts a log row verbatim, bypassing validation.
    pub fn seed_log(&self, user_id: Uuid, date: &str, study_text: &str) -> StudyLog {
        let mut state = self.lock();
        let created_at = state.next_created_at();
        let log = StudyLog {
            id: Uuid::new_v4(),
            user_id,
            date: date.to_string(),
            study_text: study_text.to_string(),
            photo_url: None,
            created_at: Some(created_at),
        };
        state.logs.push(log.clone());
        log
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the collections intact.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChallengeBackend for InMemoryBackend {
    async fn sign_in_anonymously(&self, email: &str) -> Result<Session, BackendError> {
        tracing::debug!("Anonymous in-memory session for {}", email);
        Ok(Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: None,
            expires_in: None,
            user_id: Uuid::new_v4(),
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<ChallengeUser>, BackendError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, email: &str, name: &str) -> Result<ChallengeUser, BackendError> {
        let mut state = self.lock();
        if state.users.iter().any(|u| u.email == email) {
            return Err(BackendError::Api {
                status: 409,
                message: format!("duplicate email: {}", email),
            });
        }

        let created_at = state.next_created_at();
        let user = ChallengeUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Some(created_at),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<ChallengeUser, BackendError> {
        let mut state = self.lock();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(BackendError::EmptyResponse("challenge_users"))?;
        user.name = name.to_string();
        Ok(user.clone())
    }

    async fn list_users(&self) -> Result<Vec<ChallengeUser>, BackendError> {
        let mut users = self.lock().users.clone();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn insert_log(&self, log: &NewStudyLog) -> Result<StudyLog, BackendError> {
        let mut state = self.lock();
        if !state.users.iter().any(|u| u.id == log.user_id) {
            return Err(BackendError::Api {
                status: 409,
                message: format!("unknown user_id: {}", log.user_id),
            });
        }

        let created_at = state.next_created_at();
        let stored = StudyLog {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            date: log.date.clone(),
            study_text: log.study_text.clone(),
            photo_url: log.photo_url.clone(),
            created_at: Some(created_at),
        };
        state.logs.push(stored.clone());
        Ok(stored)
    }

    async fn list_logs(&self, user_id: Uuid) -> Result<Vec<StudyLog>, BackendError> {
        let mut logs: Vec<StudyLog> = self
            .lock()
            .logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(logs)
    }

    async fn list_recent_logs(&self, limit: usize) -> Result<Vec<RecentLog>, BackendError> {
        let state = self.lock();
        let mut logs = state.logs.clone();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let recent = logs
            .into_iter()
            .take(limit)
            .map(|log| {
                let author = state
                    .users
                    .iter()
                    .find(|u| u.id == log.user_id)
                    .map(|u| LogAuthor {
                        name: u.name.clone(),
                        email: u.email.clone(),
                    });
                RecentLog { log, author }
            })
            .collect();
        Ok(recent)
    }

    async fn upload_photo(&self, path: &str, photo: &Photo) -> Result<(), BackendError> {
        let mut state = self.lock();
        if state.fail_uploads {
            return Err(BackendError::Api {
                status: 503,
                message: "storage unavailable".to_string(),
            });
        }
        state.photos.insert(path.to_string(), photo.clone());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", PUBLIC_BASE, path)
    }
}
