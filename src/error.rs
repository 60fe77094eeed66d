use std::path::PathBuf;
use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge error: {0}")]
    Generic(String),

    #[error(transparent)]
    Expected(#[from] BridgeExpectedError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors the caller is expected to show to the user rather than treat as bugs.
#[derive(Error, Debug)]
pub enum BridgeExpectedError {
    #[error("{0}")]
    Generic(String),

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Playlist {id} does not exist")]
    PlaylistDoesNotExist { id: String },

    #[error("Could not find a playlist id in {url}")]
    InvalidPlaylistUrl { url: String },

    #[error("A micro-playlist named '{name}' already exists.")]
    SubGroupAlreadyExists { name: String },

    #[error("Original micro-playlist not found.")]
    SubGroupDoesNotExist { name: String },

    #[error("Parent playlist not found.")]
    ParentPlaylistNotFound { id: String },

    #[error("Download directory is not set")]
    DownloadDirectoryNotSet,

    #[error("Configuration file not found ({path})")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to decode configuration file: {0}")]
    ConfigDecode(String),

    #[error("Invalid value for {key} in configuration file: {message}")]
    InvalidConfigValue { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, BridgeError>;
