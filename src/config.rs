/// Service configuration
///
/// Everything is overridable through environment variables so the study
/// deployment and local development share one binary.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Assistant service configuration
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// SQLite file holding the fixed retail dataset
    pub dataset_path: PathBuf,

    /// Optional CSV to import into the `superstore` table when it is missing
    pub superstore_csv: Option<PathBuf>,

    /// When true, dataset connections are opened with PRAGMA query_only
    pub readonly_dataset: bool,

    /// JSON file holding user profiles keyed by user id
    pub profiles_path: PathBuf,

    /// JSONL append-only interaction log
    pub interaction_log_path: PathBuf,

    /// SQLite file for chat sessions and explanation feedback
    pub study_db_path: PathBuf,

    /// Completion endpoint base URL (Ollama-compatible)
    pub completion_url: Option<String>,

    /// Model name passed to the completion endpoint
    pub completion_model: Option<String>,

    /// Bound on every completion call; a timeout takes the fallback path
    pub completion_timeout: Duration,

    /// HTTP listen port
    pub port: u16,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/superstore.db"),
            superstore_csv: None,
            readonly_dataset: false,
            profiles_path: PathBuf::from("data/user_profiles.json"),
            interaction_log_path: PathBuf::from("data/interactions.jsonl"),
            study_db_path: PathBuf::from("data/study.db"),
            completion_url: None,
            completion_model: None,
            completion_timeout: Duration::from_secs(30),
            port: 8080,
        }
    }
}

impl AssistantConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var("ASSISTANT_DATASET_PATH") {
            config.dataset_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("ASSISTANT_SUPERSTORE_CSV") {
            config.superstore_csv = Some(PathBuf::from(path));
        }
        if let Ok(value) = env::var("ASSISTANT_READONLY_DATASET") {
            config.readonly_dataset = matches!(value.as_str(), "1" | "true" | "yes");
        }
        if let Ok(path) = env::var("ASSISTANT_PROFILES_PATH") {
            config.profiles_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("ASSISTANT_INTERACTION_LOG") {
            config.interaction_log_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("ASSISTANT_STUDY_DB") {
            config.study_db_path = PathBuf::from(path);
        }
        if let Ok(url) = env::var("ASSISTANT_COMPLETION_URL") {
            config.completion_url = Some(url);
        }
        if let Ok(model) = env::var("ASSISTANT_COMPLETION_MODEL") {
            config.completion_model = Some(model);
        }
        if let Some(secs) = env::var("ASSISTANT_COMPLETION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.completion_timeout = Duration::from_secs(secs);
        }
        if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }

        config
    }
}
