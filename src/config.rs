use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default bucket for study photos.
pub const DEFAULT_PHOTO_BUCKET: &str = "study-photos";
/// Default number of entries in the recent feed.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Supabase project URL (e.g. "https://abc.supabase.co")
    pub supabase_url: ConfigValue<Option<String>>,
    /// Supabase anon (public) key
    #[serde(skip_serializing)]
    pub supabase_anon_key: ConfigValue<Option<String>>,
    /// Access token saved by `login`
    #[serde(skip_serializing)]
    pub access_token: ConfigValue<Option<String>>,
    /// Storage bucket for study photos
    pub photo_bucket: ConfigValue<String>,
    /// Default size of the recent feed
    pub recent_limit: ConfigValue<usize>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Path that was looked up, whether or not it exists
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    access_token: Option<String>,
    photo_bucket: Option<String>,
    recent_limit: Option<usize>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut supabase_url = ConfigValue::new(None, ConfigSource::Default);
        let mut supabase_anon_key = ConfigValue::new(None, ConfigSource::Default);
        let mut access_token = ConfigValue::new(None, ConfigSource::Default);
        let mut photo_bucket =
            ConfigValue::new(DEFAULT_PHOTO_BUCKET.to_string(), ConfigSource::Default);
        let mut recent_limit = ConfigValue::new(DEFAULT_RECENT_LIMIT, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.supabase_url {
                supabase_url = ConfigValue::new(Some(url), ConfigSource::File);
            }
            if let Some(key) = file_config.supabase_anon_key {
                supabase_anon_key = ConfigValue::new(Some(key), ConfigSource::File);
            }
            if let Some(token) = file_config.access_token {
                access_token = ConfigValue::new(Some(token), ConfigSource::File);
            }
            if let Some(bucket) = file_config.photo_bucket {
                photo_bucket = ConfigValue::new(bucket, ConfigSource::File);
            }
            if let Some(limit) = file_config.recent_limit {
                recent_limit = ConfigValue::new(limit, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(url) = std::env::var("CHALLENGE_SUPABASE_URL") {
            supabase_url = ConfigValue::new(Some(url), ConfigSource::Environment);
        }
        if let Ok(key) = std::env::var("CHALLENGE_SUPABASE_ANON_KEY") {
            supabase_anon_key = ConfigValue::new(Some(key), ConfigSource::Environment);
        }
        if let Ok(token) = std::env::var("CHALLENGE_ACCESS_TOKEN") {
            access_token = ConfigValue::new(Some(token), ConfigSource::Environment);
        }
        if let Ok(bucket) = std::env::var("CHALLENGE_PHOTO_BUCKET") {
            photo_bucket = ConfigValue::new(bucket, ConfigSource::Environment);
        }
        // An unparsable limit keeps the lower-priority value.
        if let Some(limit) = std::env::var("CHALLENGE_RECENT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            recent_limit = ConfigValue::new(limit, ConfigSource::Environment);
        }

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            access_token,
            photo_bucket,
            recent_limit,
            config_file,
            config_path: path,
        })
    }

    /// Stores `token` as `access_token` in the YAML file at `path`.
    ///
    /// Other keys in the file are kept. The file and its directory are
    /// created if missing.
    pub fn save_access_token(path: &Path, token: &str) -> Result<(), ConfigError> {
        let mut doc: serde_yaml::Value = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
            serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?
        } else {
            serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
        };

        // An empty file parses as null.
        if doc.is_null() {
            doc = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
        }
        let serde_yaml::Value::Mapping(map) = &mut doc else {
            return Err(ConfigError::NotAMapping(path.to_path_buf()));
        };
        map.insert(
            serde_yaml::Value::String("access_token".to_string()),
            serde_yaml::Value::String(token.to_string()),
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))?;
        }
        let contents = serde_yaml::to_string(&doc)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))
    }

    /// Anon key with everything but the last four characters hidden.
    pub fn masked_anon_key(&self) -> Option<String> {
        self.supabase_anon_key.value.as_ref().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            let visible = chars.len().min(4);
            let tail: String = chars[chars.len() - visible..].iter().collect();
            format!("{}{}", "*".repeat(chars.len() - visible), tail)
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/study-challenge/
    /// - macOS: ~/Library/Application Support/study-challenge/
    /// - Windows: %APPDATA%/study-challenge/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("study-challenge")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    WriteError(PathBuf, std::io::Error),
    NotAMapping(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::WriteError(path, e) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), e)
            }
            ConfigError::NotAMapping(path) => {
                write!(f, "Config file '{}' is not a YAML mapping", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
