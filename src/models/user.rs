use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A challenge participant as stored in `challenge_users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Trims and lowercases an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Default display name for a new participant: the local part of the email.
pub fn default_name(email: &str) -> String {
    match email.split_once('@') {
        Some((local, _)) if !local.is_empty() => local.to_string(),
        _ => email.to_string(),
    }
}

impl fmt::Display for ChallengeUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_default_name_uses_local_part() {
        assert_eq!(default_name("alice@example.com"), "alice");
    }

    #[test]
    fn test_default_name_without_at_sign() {
        assert_eq!(default_name("alice"), "alice");
        assert_eq!(default_name("@example.com"), "@example.com");
    }

    #[test]
    fn test_deserialize_postgrest_row() {
        let json = r#"{
            "id": "2f1c3b7e-5a43-4a8f-9d0c-8d3f7f3b2a11",
            "email": "bob@example.com",
            "name": "Bob",
            "created_at": "2025-03-01T08:15:00.123456+00:00"
        }"#;

        let user: ChallengeUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.name, "Bob");
        assert!(user.created_at.is_some());
        assert_eq!(user.to_string(), "Bob <bob@example.com>");
    }
}
