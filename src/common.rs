/// The common module holds the record types shared by every layer (artists, tracks, playlists)
/// along with the filename sanitizers and the logging bootstrap.
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::hash::Hash;
use std::sync::{Mutex, OnceLock};

use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{BridgeError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decoration the remote service appends to auto-generated artist channels.
pub const CHANNEL_SUFFIX: &str = " - Topic";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
}

impl Artist {
    pub fn new(name: impl Into<String>) -> Self {
        Artist { name: name.into() }
    }

    /// The name as shown to the user and written into filenames.
    pub fn display_name(&self) -> String {
        strip_channel_suffix(&self.name)
    }

    /// The name used for artist identity comparisons.
    pub fn canonical_name(&self) -> String {
        canonical_artist(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "videoId", default)]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default, deserialize_with = "deserialize_year", skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl Track {
    pub fn new(video_id: impl Into<String>, title: impl Into<String>, artists: &[&str]) -> Self {
        Track {
            video_id: video_id.into(),
            title: title.into(),
            artists: artists.iter().map(|a| Artist::new(*a)).collect(),
            year: None,
        }
    }

    /// Decoration-stripped artist names in credit order, empty names dropped.
    pub fn artist_names(&self) -> Vec<String> {
        self.artists.iter().map(|a| a.display_name()).filter(|n| !n.is_empty()).collect()
    }

    /// Case-folded artist identities.
    pub fn artist_keys(&self) -> BTreeSet<String> {
        self.artists.iter().map(|a| a.canonical_name()).filter(|n| !n.is_empty()).collect()
    }

    pub fn artists_display(&self) -> String {
        self.artist_names().join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn video_ids(&self) -> BTreeSet<&str> {
        self.tracks.iter().map(|t| t.video_id.as_str()).collect()
    }

    /// 1-based position of a track within the playlist, by first occurrence.
    pub fn position_of(&self, video_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.video_id == video_id).map(|i| i + 1)
    }
}

// The fetch layer hands the year over as either a string or a bare number.
fn deserialize_year<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub fn strip_channel_suffix(name: &str) -> String {
    name.replace(CHANNEL_SUFFIX, "").trim().to_string()
}

pub fn canonical_artist(name: &str) -> String {
    strip_channel_suffix(name).to_lowercase().replace(" - topic", "").trim().to_string()
}

static ILLEGAL_FS_CHARS_REGEX: OnceLock<Regex> = OnceLock::new();

fn illegal_fs_chars_regex() -> &'static Regex {
    ILLEGAL_FS_CHARS_REGEX.get_or_init(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap())
}

/// Replace every character that is illegal in a path component with an underscore.
pub fn sanitize(name: &str) -> String {
    illegal_fs_chars_regex().replace_all(name, "_").into_owned()
}

/// The stricter sanitizer older downloads were named with: alphanumerics and a little
/// punctuation survive, everything else is dropped, trailing whitespace is trimmed.
pub fn sanitize_legacy(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-' | '(' | ')' | ','))
        .collect();
    kept.trim_end().to_string()
}

pub fn uniq<T: Clone + Eq + Hash>(xs: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for x in xs {
        if seen.insert(x.clone()) {
            result.push(x);
        }
    }
    result
}

static LOGGING_INITIALIZED: OnceLock<Mutex<HashSet<Option<String>>>> = OnceLock::new();
static FILE_LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn initialize_logging(logger_name: Option<&str>, output: &str) -> Result<()> {
    {
        let mut initialized = LOGGING_INITIALIZED
            .get_or_init(|| Mutex::new(HashSet::new()))
            .lock()
            .map_err(|_| BridgeError::Generic("logging registry poisoned".to_string()))?;
        if !initialized.insert(logger_name.map(|s| s.to_string())) {
            return Ok(());
        }
    }

    let log_despite_testing = std::env::var("LOG_TEST").is_ok();
    let is_testing = std::env::var("CARGO_TEST").is_ok();
    if is_testing && !log_despite_testing {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let install = |e: tracing::subscriber::SetGlobalDefaultError| BridgeError::Generic(format!("failed to install logger: {e}"));

    match output {
        "stderr" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(!log_despite_testing)
                .with_thread_ids(log_despite_testing)
                .with_line_number(log_despite_testing)
                .with_file(log_despite_testing)
                .finish();
            tracing::subscriber::set_global_default(subscriber).map_err(install)?;
        }
        "file" => {
            let proj_dirs = ProjectDirs::from("", "", "tunebridge")
                .ok_or_else(|| BridgeError::Generic("Failed to get project directories".to_string()))?;
            let log_dir = if cfg!(target_os = "macos") {
                proj_dirs.cache_dir()
            } else {
                proj_dirs.state_dir().unwrap_or(proj_dirs.cache_dir())
            };
            fs::create_dir_all(log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .max_log_files(10)
                .filename_prefix(logger_name.unwrap_or("tunebridge"))
                .filename_suffix("log")
                .build(log_dir)
                .map_err(|e| BridgeError::Generic(format!("failed to open log file: {e}")))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // Dropping the guard stops the writer thread, so it lives as long as the process.
            let _ = FILE_LOG_GUARD.set(guard);

            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber).map_err(install)?;
        }
        other => {
            return Err(BridgeError::Generic(format!("unknown log output {other}, expected stderr or file")));
        }
    }

    tracing::debug!("logging initialized for tunebridge {}", VERSION);
    Ok(())
}
