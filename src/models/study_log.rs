use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Canonical calendar date format used for `date` columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single day's study submission as stored in `challenge_logs`.
///
/// `date` is kept as the raw string the backend returned. Rows with a
/// malformed date are still listed and counted, they just never extend a
/// streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: String,
    pub study_text: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl StudyLog {
    /// The log's calendar date, if it is well formed.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

impl fmt::Display for StudyLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.date)?;
        writeln!(f, "{}", "-".repeat(10))?;
        writeln!(f, "{}", self.study_text)?;
        if let Some(url) = &self.photo_url {
            writeln!(f, "Photo: {}", url)?;
        }
        Ok(())
    }
}

/// Insert payload for `challenge_logs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStudyLog {
    pub user_id: Uuid,
    pub date: String,
    pub study_text: String,
    pub photo_url: Option<String>,
}

impl NewStudyLog {
    pub fn new(user_id: Uuid, date: NaiveDate, study_text: impl Into<String>) -> Self {
        Self {
            user_id,
            date: date.format(DATE_FORMAT).to_string(),
            study_text: study_text.into(),
            photo_url: None,
        }
    }

    pub fn with_photo_url(mut self, photo_url: Option<String>) -> Self {
        self.photo_url = photo_url;
        self
    }
}

/// Author columns embedded into a recent-feed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogAuthor {
    pub name: String,
    pub email: String,
}

/// A log row from the recent feed, joined with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentLog {
    #[serde(flatten)]
    pub log: StudyLog,
    #[serde(rename = "challenge_users", default)]
    pub author: Option<LogAuthor>,
}

impl RecentLog {
    pub fn author_name(&self) -> &str {
        self.author.as_ref().map_or("unknown", |a| a.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log(date: &str) -> StudyLog {
        StudyLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date: date.to_string(),
            study_text: "Read chapter 3".to_string(),
            photo_url: None,
            created_at: None,
        }
    }

    #[test]
    fn test_parsed_date() {
        let log = sample_log("2025-01-31");
        assert_eq!(
            log.parsed_date(),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
    }

    #[test]
    fn test_parsed_date_malformed() {
        assert!(sample_log("31/01/2025").parsed_date().is_none());
        assert!(sample_log("").parsed_date().is_none());
    }

    #[test]
    fn test_new_study_log_formats_date() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let new_log = NewStudyLog::new(Uuid::nil(), date, "Flashcards");
        assert_eq!(new_log.date, "2025-02-03");
        assert!(new_log.photo_url.is_none());

        let json = serde_json::to_value(&new_log).unwrap();
        assert_eq!(json["study_text"], "Flashcards");
        assert!(json["photo_url"].is_null());
    }

    #[test]
    fn test_recent_log_with_embedded_author() {
        let json = r#"{
            "id": "6b0f7d4e-1f2a-4c3b-8a9d-0e1f2a3b4c5d",
            "user_id": "2f1c3b7e-5a43-4a8f-9d0c-8d3f7f3b2a11",
            "date": "2025-03-02",
            "study_text": "Practiced kanji",
            "photo_url": "https://example.supabase.co/storage/v1/object/public/study-photos/a.jpg",
            "created_at": "2025-03-02T21:04:11+00:00",
            "challenge_users": { "name": "Bob", "email": "bob@example.com" }
        }"#;

        let recent: RecentLog = serde_json::from_str(json).unwrap();
        assert_eq!(recent.author_name(), "Bob");
        assert_eq!(recent.log.date, "2025-03-02");
        assert!(recent.log.photo_url.is_some());
    }

    #[test]
    fn test_recent_log_without_author() {
        let json = r#"{
            "id": "6b0f7d4e-1f2a-4c3b-8a9d-0e1f2a3b4c5d",
            "user_id": "2f1c3b7e-5a43-4a8f-9d0c-8d3f7f3b2a11",
            "date": "2025-03-02",
            "study_text": "Practiced kanji",
            "challenge_users": null
        }"#;

        let recent: RecentLog = serde_json::from_str(json).unwrap();
        assert_eq!(recent.author_name(), "unknown");
    }

    #[test]
    fn test_study_log_display() {
        let mut log = sample_log("2025-01-01");
        log.photo_url = Some("https://img".to_string());

        let output = format!("{}", log);
        assert!(output.contains("2025-01-01"));
        assert!(output.contains("Read chapter 3"));
        assert!(output.contains("Photo: https://img"));
    }
}
