use thiserror::Error;

use crate::orchestration::source::SourceError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Task source error: {0}")]
    Source(#[from] SourceError),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid task status: {0}")]
    InvalidStatus(String),

    #[error("Tracker file is malformed: {0}")]
    TrackerFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
