//! Study Challenge client library
//!
//! Data access for the daily study challenge: participants, study logs with
//! optional photos, the recent feed, and streak statistics. Remote calls go
//! through a [`ChallengeBackend`]; [`ChallengeService`] combines one with a
//! [`Clock`] to expose the challenge operations.

pub mod backend;
pub mod config;
pub mod models;
pub mod service;
pub mod streak;

pub use backend::{BackendError, ChallengeBackend, InMemoryBackend, SupabaseClient};
pub use config::{Config, ConfigError};
pub use models::{ChallengeUser, NewStudyLog, Photo, RecentLog, Session, StudyLog};
pub use service::{ChallengeService, ServiceError, Standing};
pub use streak::{compute_stats, Clock, FixedClock, LocalClock, StreakCalculator, StreakStats};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
