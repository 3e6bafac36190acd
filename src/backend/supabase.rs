//! REST client for a Supabase project.
//!
//! Tables are reached through PostgREST under `/rest/v1`, sign-in through
//! GoTrue under `/auth/v1` and photos through the storage API under
//! `/storage/v1`. Every request carries the project's anon key as the `apikey`
//! header. The bearer token is the signed-in session's access token when one
//! is set, and the anon key otherwise.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::{BackendError, ChallengeBackend};
use crate::config::Config;
use crate::models::{ChallengeUser, NewStudyLog, Photo, RecentLog, Session, StudyLog};

const USERS_TABLE: &str = "challenge_users";
const LOGS_TABLE: &str = "challenge_logs";
/// Embedded join returning the author of each log.
const RECENT_SELECT: &str = "*,challenge_users(name,email)";

/// GoTrue sign-in response; only the fields a [`Session`] needs.
#[derive(Debug, Deserialize)]
struct SignInResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: SignInUser,
}

#[derive(Debug, Deserialize)]
struct SignInUser {
    id: Uuid,
}

/// Supabase-backed implementation of [`ChallengeBackend`].
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    /// Session JWT sent as the bearer token in place of the anon key
    access_token: Option<String>,
    bucket: String,
}

impl SupabaseClient {
    /// Creates a client for the project at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            access_token: None,
            bucket: bucket.into(),
        }
    }

    /// Creates a client from config.
    ///
    /// Returns an error if the project URL or anon key is missing. A saved
    /// access token, if any, is used for every table and storage call.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let url = config
            .supabase_url
            .value
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or(BackendError::NotConfigured)?;
        let anon_key = config
            .supabase_anon_key
            .value
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(BackendError::NotConfigured)?;

        let client = Self::new(url, anon_key, config.photo_bucket.value.clone());
        Ok(match &config.access_token.value {
            Some(token) if !token.trim().is_empty() => client.with_access_token(token),
            _ => client,
        })
    }

    /// Authenticates later requests as a signed-in user.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Builds a PostgREST URL for `table` with URL-encoded query parameters.
    fn rest_url(&self, table: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, endpoint)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_object_path(path)
        )
    }

    /// Starts a request authenticated with `bearer`.
    fn request_as(&self, method: Method, url: &str, bearer: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    /// Starts a request as the signed-in user, or anonymously without a session.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.request_as(method, url, bearer)
    }

    /// Request that asks PostgREST to echo the written rows.
    fn write_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.request(method, url)
            .header("Prefer", HeaderValue::from_static("return=representation"))
    }

    fn sign_in_request(&self, email: &str) -> RequestBuilder {
        self.request_as(Method::POST, &self.auth_url("signup"), &self.anon_key)
            .json(&serde_json::json!({ "data": { "email": email } }))
    }

    fn find_user_request(&self, email: &str) -> RequestBuilder {
        let url = self.rest_url(
            USERS_TABLE,
            &[
                ("select", "*".to_string()),
                ("email", format!("eq.{}", email)),
                ("limit", "1".to_string()),
            ],
        );
        self.request(Method::GET, &url)
    }

    fn insert_user_request(&self, email: &str, name: &str) -> RequestBuilder {
        self.write_request(Method::POST, &self.rest_url(USERS_TABLE, &[]))
            .json(&serde_json::json!([{ "email": email, "name": name }]))
    }

    fn update_user_name_request(&self, id: Uuid, name: &str) -> RequestBuilder {
        let url = self.rest_url(USERS_TABLE, &[("id", format!("eq.{}", id))]);
        self.write_request(Method::PATCH, &url)
            .json(&serde_json::json!({ "name": name }))
    }

    fn list_users_request(&self) -> RequestBuilder {
        let url = self.rest_url(
            USERS_TABLE,
            &[
                ("select", "*".to_string()),
                ("order", "created_at.asc".to_string()),
            ],
        );
        self.request(Method::GET, &url)
    }

    fn insert_log_request(&self, log: &NewStudyLog) -> RequestBuilder {
        self.write_request(Method::POST, &self.rest_url(LOGS_TABLE, &[]))
            .json(&[log])
    }

    fn list_logs_request(&self, user_id: Uuid) -> RequestBuilder {
        let url = self.rest_url(
            LOGS_TABLE,
            &[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "date.desc".to_string()),
            ],
        );
        self.request(Method::GET, &url)
    }

    fn recent_logs_request(&self, limit: usize) -> RequestBuilder {
        let url = self.rest_url(
            LOGS_TABLE,
            &[
                ("select", RECENT_SELECT.to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        );
        self.request(Method::GET, &url)
    }

    fn upload_request(&self, path: &str, photo: &Photo) -> RequestBuilder {
        self.request(Method::POST, &self.object_url(path))
            .header(CONTENT_TYPE, photo.content_type.as_str())
            .body(photo.bytes.clone())
    }

    async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        })
    }

    async fn fetch_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, BackendError> {
        Self::send(builder)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Sends a write and returns the single row PostgREST echoed back.
    async fn fetch_one<T: DeserializeOwned>(
        builder: RequestBuilder,
        table: &'static str,
    ) -> Result<T, BackendError> {
        let rows: Vec<T> = Self::fetch_json(builder).await?;
        rows.into_iter()
            .next()
            .ok_or(BackendError::EmptyResponse(table))
    }
}

/// Percent-encodes each segment of an object path, keeping the separators.
fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Pulls a human-readable message out of a Supabase error body.
///
/// PostgREST uses `message`, GoTrue `msg` or `error_description`, and the
/// storage API `error`. Anything else is returned as-is.
fn api_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl ChallengeBackend for SupabaseClient {
    async fn sign_in_anonymously(&self, email: &str) -> Result<Session, BackendError> {
        let response: SignInResponse = Self::fetch_json(self.sign_in_request(email)).await?;
        Ok(Session {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            user_id: response.user.id,
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<ChallengeUser>, BackendError> {
        let users: Vec<ChallengeUser> = Self::fetch_json(self.find_user_request(email)).await?;
        Ok(users.into_iter().next())
    }

    async fn insert_user(&self, email: &str, name: &str) -> Result<ChallengeUser, BackendError> {
        Self::fetch_one(self.insert_user_request(email, name), USERS_TABLE).await
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<ChallengeUser, BackendError> {
        Self::fetch_one(self.update_user_name_request(id, name), USERS_TABLE).await
    }

    async fn list_users(&self) -> Result<Vec<ChallengeUser>, BackendError> {
        Self::fetch_json(self.list_users_request()).await
    }

    async fn insert_log(&self, log: &NewStudyLog) -> Result<StudyLog, BackendError> {
        Self::fetch_one(self.insert_log_request(log), LOGS_TABLE).await
    }

    async fn list_logs(&self, user_id: Uuid) -> Result<Vec<StudyLog>, BackendError> {
        Self::fetch_json(self.list_logs_request(user_id)).await
    }

    async fn list_recent_logs(&self, limit: usize) -> Result<Vec<RecentLog>, BackendError> {
        Self::fetch_json(self.recent_logs_request(limit)).await
    }

    async fn upload_photo(&self, path: &str, photo: &Photo) -> Result<(), BackendError> {
        Self::send(self.upload_request(path, photo)).await?;
        tracing::debug!("Uploaded {} bytes to {}", photo.bytes.len(), path);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_object_path(path)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, ConfigValue};
    use tempfile::tempdir;

    fn client() -> SupabaseClient {
        SupabaseClient::new("https://abc.supabase.co/", "anon-key", "study-photos")
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(client().base_url(), "https://abc.supabase.co");
    }

    #[test]
    fn test_rest_url_without_params() {
        assert_eq!(
            client().rest_url("challenge_logs", &[]),
            "https://abc.supabase.co/rest/v1/challenge_logs"
        );
    }

    #[test]
    fn test_rest_url_encodes_filter_values() {
        let url = client().rest_url(
            "challenge_users",
            &[
                ("email", "eq.alice+test@example.com".to_string()),
                ("limit", "1".to_string()),
            ],
        );
        assert_eq!(
            url,
            "https://abc.supabase.co/rest/v1/challenge_users?email=eq.alice%2Btest%40example.com&limit=1"
        );
    }

    #[test]
    fn test_rest_url_encodes_embedded_select() {
        let url = client().rest_url("challenge_logs", &[("select", RECENT_SELECT.to_string())]);
        assert_eq!(
            url,
            "https://abc.supabase.co/rest/v1/challenge_logs?select=%2A%2Cchallenge_users%28name%2Cemail%29"
        );
    }

    #[test]
    fn test_auth_and_storage_urls() {
        let client = client();
        assert_eq!(
            client.auth_url("signup"),
            "https://abc.supabase.co/auth/v1/signup"
        );
        assert_eq!(
            client.object_url("u1/2025-01-01-7.jpg"),
            "https://abc.supabase.co/storage/v1/object/study-photos/u1/2025-01-01-7.jpg"
        );
        assert_eq!(
            client.public_url("u1/2025-01-01-7.jpg"),
            "https://abc.supabase.co/storage/v1/object/public/study-photos/u1/2025-01-01-7.jpg"
        );
    }

    #[test]
    fn test_object_paths_are_percent_encoded() {
        let client = client();
        assert_eq!(
            client.object_url("u1/2025-01-01-7.j#g"),
            "https://abc.supabase.co/storage/v1/object/study-photos/u1/2025-01-01-7.j%23g"
        );
        assert_eq!(
            client.public_url("u1/desk photo?.png"),
            "https://abc.supabase.co/storage/v1/object/public/study-photos/u1/desk%20photo%3F.png"
        );
    }

    fn header<'a>(request: &'a reqwest::Request, name: &str) -> Option<&'a str> {
        request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn json_body(request: &reqwest::Request) -> serde_json::Value {
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_requests_use_anon_key_without_session() {
        let request = client().list_users_request().build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://abc.supabase.co/rest/v1/challenge_users?select=%2A&order=created_at.asc"
        );
        assert_eq!(header(&request, "apikey"), Some("anon-key"));
        assert_eq!(header(&request, "authorization"), Some("Bearer anon-key"));
        assert_eq!(header(&request, "prefer"), None);
    }

    #[test]
    fn test_session_token_replaces_bearer() {
        let client = client().with_access_token("session-jwt");

        let request = client.list_logs_request(Uuid::nil()).build().unwrap();
        assert_eq!(header(&request, "apikey"), Some("anon-key"));
        assert_eq!(header(&request, "authorization"), Some("Bearer session-jwt"));

        // Sign-up always goes out anonymously.
        let request = client.sign_in_request("a@example.com").build().unwrap();
        assert_eq!(header(&request, "authorization"), Some("Bearer anon-key"));
    }

    #[test]
    fn test_sign_in_request_body() {
        let request = client().sign_in_request("a@example.com").build().unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().as_str(), "https://abc.supabase.co/auth/v1/signup");
        assert_eq!(
            json_body(&request),
            serde_json::json!({ "data": { "email": "a@example.com" } })
        );
    }

    #[test]
    fn test_find_user_request_filters_by_email() {
        let request = client().find_user_request("a@example.com").build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://abc.supabase.co/rest/v1/challenge_users?select=%2A&email=eq.a%40example.com&limit=1"
        );
        assert!(request.body().is_none());
    }

    #[test]
    fn test_insert_user_request_posts_array() {
        let request = client()
            .insert_user_request("a@example.com", "a")
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://abc.supabase.co/rest/v1/challenge_users"
        );
        assert_eq!(header(&request, "prefer"), Some("return=representation"));
        assert_eq!(
            json_body(&request),
            serde_json::json!([{ "email": "a@example.com", "name": "a" }])
        );
    }

    #[test]
    fn test_update_user_name_request_patches_by_id() {
        let id = Uuid::nil();
        let request = client().update_user_name_request(id, "Alice").build().unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(
            request.url().as_str(),
            format!("https://abc.supabase.co/rest/v1/challenge_users?id=eq.{}", id)
        );
        assert_eq!(header(&request, "prefer"), Some("return=representation"));
        assert_eq!(json_body(&request), serde_json::json!({ "name": "Alice" }));
    }

    #[test]
    fn test_insert_log_request_posts_array() {
        let user_id = Uuid::nil();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let log = NewStudyLog::new(user_id, date, "Read chapter 3")
            .with_photo_url(Some("https://cdn/p.jpg".to_string()));

        let request = client().insert_log_request(&log).build().unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://abc.supabase.co/rest/v1/challenge_logs"
        );
        assert_eq!(header(&request, "prefer"), Some("return=representation"));
        assert_eq!(
            json_body(&request),
            serde_json::json!([{
                "user_id": user_id,
                "date": "2025-06-10",
                "study_text": "Read chapter 3",
                "photo_url": "https://cdn/p.jpg"
            }])
        );
    }

    #[test]
    fn test_feed_requests() {
        let user_id = Uuid::nil();
        let request = client().list_logs_request(user_id).build().unwrap();
        assert_eq!(
            request.url().as_str(),
            format!(
                "https://abc.supabase.co/rest/v1/challenge_logs?select=%2A&user_id=eq.{}&order=date.desc",
                user_id
            )
        );

        let request = client().recent_logs_request(5).build().unwrap();
        assert_eq!(
            request.url().query(),
            Some("select=%2A%2Cchallenge_users%28name%2Cemail%29&order=created_at.desc&limit=5")
        );
    }

    #[test]
    fn test_upload_request_sends_raw_bytes() {
        let photo = Photo::new("desk.png", vec![1, 2, 3]);
        let request = client()
            .upload_request("u1/2025-06-10-7.png", &photo)
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://abc.supabase.co/storage/v1/object/study-photos/u1/2025-06-10-7.png"
        );
        assert_eq!(header(&request, "content-type"), Some("image/png"));
        assert_eq!(
            request.body().and_then(|b| b.as_bytes()),
            Some(&[1u8, 2, 3][..])
        );
    }

    #[test]
    fn test_api_error_message_postgrest() {
        let body = r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key value violates unique constraint"}"#;
        assert_eq!(
            api_error_message(body),
            "duplicate key value violates unique constraint"
        );
    }

    #[test]
    fn test_api_error_message_gotrue() {
        assert_eq!(
            api_error_message(r#"{"code":422,"msg":"Anonymous sign-ins are disabled"}"#),
            "Anonymous sign-ins are disabled"
        );
        assert_eq!(
            api_error_message(r#"{"error":"invalid_grant","error_description":"Invalid token"}"#),
            "Invalid token"
        );
    }

    #[test]
    fn test_api_error_message_storage() {
        assert_eq!(
            api_error_message(r#"{"statusCode":"404","error":"Bucket not found"}"#),
            "Bucket not found"
        );
    }

    #[test]
    fn test_api_error_message_plain_text() {
        assert_eq!(api_error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(api_error_message(""), "no response body");
    }

    #[test]
    fn test_sign_in_response_decodes() {
        let json = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": { "id": "2f1c3b7e-5a43-4a8f-9d0c-8d3f7f3b2a11", "is_anonymous": true }
        }"#;

        let response: SignInResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "jwt");
        assert_eq!(response.expires_in, Some(3600));
        assert_eq!(
            response.user.id.to_string(),
            "2f1c3b7e-5a43-4a8f-9d0c-8d3f7f3b2a11"
        );
    }

    #[test]
    fn test_from_config_requires_url_and_key() {
        let temp_dir = tempdir().unwrap();
        let mut config = Config::load(Some(temp_dir.path().join("missing.yaml"))).unwrap();
        config.supabase_url = ConfigValue::new(None, ConfigSource::Default);
        config.supabase_anon_key = ConfigValue::new(None, ConfigSource::Default);

        assert!(matches!(
            SupabaseClient::from_config(&config),
            Err(BackendError::NotConfigured)
        ));

        config.supabase_url = ConfigValue::new(
            Some("https://abc.supabase.co".to_string()),
            ConfigSource::File,
        );
        config.supabase_anon_key = ConfigValue::new(Some("key".to_string()), ConfigSource::File);

        let client = SupabaseClient::from_config(&config).unwrap();
        assert_eq!(client.bucket(), "study-photos");
        assert_eq!(client.access_token, None);

        config.access_token =
            ConfigValue::new(Some("saved-jwt".to_string()), ConfigSource::File);
        let client = SupabaseClient::from_config(&config).unwrap();
        assert_eq!(client.access_token.as_deref(), Some("saved-jwt"));
    }
}
