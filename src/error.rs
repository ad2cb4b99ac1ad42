use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotekeeperError {
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Slug already in use: {0}")]
    SlugTaken(String),

    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, NotekeeperError>;
