use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An auth session returned by anonymous sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user_id: Uuid,
}
