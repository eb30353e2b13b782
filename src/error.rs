/// Unified error type for the assistant service
/// Provides structured error handling with categories for different failure modes
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AssistantError {
    /// Translation errors: no SQL could be extracted from the model output
    #[error("Translation error: {message}")]
    Translation { message: String },

    /// Execution errors: the dataset backend rejected or failed the statement
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        sql: Option<String>,
    },

    /// Completion errors: transport or protocol failures talking to the model
    #[error("Completion error: {message}")]
    Completion {
        message: String,
        context: Option<String>,
    },

    /// Profile errors: missing or corrupt user profile entries
    #[error("Profile error: {message}")]
    Profile {
        message: String,
        user: Option<String>,
    },

    /// Storage errors: file or database I/O for profiles, logs, study rows
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        path: Option<String>,
    },

    /// Configuration errors: invalid or missing settings at startup
    #[error("Config error: {message}")]
    Config { message: String },

    /// Internal errors: should never happen, indicates bug
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AssistantError {
    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation {
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql: None,
        }
    }

    pub fn execution_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql: Some(sql.into()),
        }
    }

    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion {
            message: message.into(),
            context: None,
        }
    }

    pub fn profile(message: impl Into<String>) -> Self {
        Self::Profile {
            message: message.into(),
            user: None,
        }
    }

    pub fn profile_for_user(message: impl Into<String>, user: impl Into<String>) -> Self {
        Self::Profile {
            message: message.into(),
            user: Some(user.into()),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            path: None,
        }
    }

    pub fn storage_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for AssistantError {
    fn from(err: rusqlite::Error) -> Self {
        AssistantError::storage(err.to_string())
    }
}

impl From<std::io::Error> for AssistantError {
    fn from(err: std::io::Error) -> Self {
        AssistantError::storage(err.to_string())
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::internal(format!("serialization failure: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
