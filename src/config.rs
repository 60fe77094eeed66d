/// The config module loads, validates and rewrites the `config.json` document.
///
/// Parsing is done key by key rather than through a derived deserializer so that every bad value
/// is reported against the key that holds it, and so that unrecognized keys can be warned about.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{BridgeExpectedError, Result};

pub const DEFAULT_MAX_WORKERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Numbering {
    #[default]
    None,
    PlaylistOrder,
    ReleaseYear,
}

impl Numbering {
    pub fn as_str(&self) -> &'static str {
        match self {
            Numbering::None => "none",
            Numbering::PlaylistOrder => "playlist_order",
            Numbering::ReleaseYear => "release_year",
        }
    }
}

impl FromStr for Numbering {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(Numbering::None),
            "playlist_order" => Ok(Numbering::PlaylistOrder),
            "release_year" => Ok(Numbering::ReleaseYear),
            _ => Err(format!("must be one of none, playlist_order, release_year: got {s}")),
        }
    }
}

impl fmt::Display for Numbering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameOrder {
    #[default]
    TrackArtist,
    ArtistTrack,
}

impl NameOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameOrder::TrackArtist => "track_artist",
            NameOrder::ArtistTrack => "artist_track",
        }
    }
}

impl FromStr for NameOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "track_artist" => Ok(NameOrder::TrackArtist),
            "artist_track" => Ok(NameOrder::ArtistTrack),
            _ => Err(format!("must be one of track_artist, artist_track: got {s}")),
        }
    }
}

impl fmt::Display for NameOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the naming policy and the match resolver read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamingConfig {
    pub numbering: Numbering,
    pub name_order: NameOrder,
    /// Empty when the user has not picked one yet.
    pub download_directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub naming: NamingConfig,
    pub max_workers: usize,
    pub legacy_matching: bool,
    pub cookies_file: Option<PathBuf>,
    /// Where `playlists.json` and `microplaylists.json` live.
    pub state_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            naming: NamingConfig::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            legacy_matching: true,
            cookies_file: None,
            state_directory: default_state_directory(),
        }
    }
}

/// A settings change. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub download_directory: Option<PathBuf>,
    pub numbering: Option<Numbering>,
    pub name_order: Option<NameOrder>,
    pub max_workers: Option<usize>,
    pub legacy_matching: Option<bool>,
    pub cookies_file: Option<Option<PathBuf>>,
}

pub fn default_config_path() -> PathBuf {
    match ProjectDirs::from("", "", "tunebridge") {
        Some(dirs) => dirs.config_dir().join("config.json"),
        None => PathBuf::from("config.json"),
    }
}

pub fn default_state_directory() -> PathBuf {
    dirs::data_dir().map(|d| d.join("tunebridge")).unwrap_or_else(|| PathBuf::from("."))
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn invalid(key: &str, message: impl Into<String>) -> BridgeExpectedError {
    BridgeExpectedError::InvalidConfigValue { key: key.to_string(), message: message.into() }
}

fn take_string(data: &mut Map<String, Value>, key: &str) -> Result<Option<String>> {
    match data.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(invalid(key, format!("must be a string: got {other}")).into()),
    }
}

impl Config {
    pub fn playlists_path(&self) -> PathBuf {
        self.state_directory.join("playlists.json")
    }

    pub fn subgroups_path(&self) -> PathBuf {
        self.state_directory.join("microplaylists.json")
    }

    /// The configured download root, or an error when none has been chosen.
    pub fn download_directory(&self) -> Result<&Path> {
        if self.naming.download_directory.as_os_str().is_empty() {
            return Err(BridgeExpectedError::DownloadDirectoryNotSet.into());
        }
        Ok(&self.naming.download_directory)
    }

    /// Strictly parse the configuration file. Missing files and bad values are errors.
    pub fn parse(config_path_override: Option<&Path>) -> Result<Config> {
        let cfgpath = config_path_override.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        debug!("parsing configuration at {}", cfgpath.display());
        let text = match fs::read_to_string(&cfgpath) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BridgeExpectedError::ConfigNotFound { path: cfgpath }.into());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json(&text, &cfgpath)
    }

    pub fn from_json(text: &str, cfgpath: &Path) -> Result<Config> {
        let value: Value = serde_json::from_str(text).map_err(|e| BridgeExpectedError::ConfigDecode(format!("{}: {e}", cfgpath.display())))?;
        let mut data = match value {
            Value::Object(map) => map,
            _ => return Err(BridgeExpectedError::ConfigDecode(format!("{}: top level must be an object", cfgpath.display())).into()),
        };

        let mut config = Config::default();

        if let Some(dir) = take_string(&mut data, "download_directory")? {
            config.naming.download_directory = if dir.trim().is_empty() { PathBuf::new() } else { expand_path(dir.trim()) };
        }
        if let Some(numbering) = take_string(&mut data, "numbering")? {
            config.naming.numbering = numbering.parse().map_err(|m: String| invalid("numbering", m))?;
        }
        if let Some(order) = take_string(&mut data, "name_order")? {
            config.naming.name_order = order.parse().map_err(|m: String| invalid("name_order", m))?;
        }
        match data.remove("max_workers") {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) => match n.as_u64() {
                Some(workers) if workers > 0 => config.max_workers = workers as usize,
                _ => return Err(invalid("max_workers", format!("must be a positive integer: got {n}")).into()),
            },
            Some(other) => return Err(invalid("max_workers", format!("must be a positive integer: got {other}")).into()),
        }
        match data.remove("legacy_matching") {
            None | Some(Value::Null) => {}
            Some(Value::Bool(b)) => config.legacy_matching = b,
            Some(other) => return Err(invalid("legacy_matching", format!("must be a bool: got {other}")).into()),
        }
        if let Some(cookies) = take_string(&mut data, "cookies_file")? {
            if !cookies.trim().is_empty() {
                config.cookies_file = Some(expand_path(cookies.trim()));
            }
        }
        if let Some(state) = take_string(&mut data, "state_directory")? {
            if !state.trim().is_empty() {
                config.state_directory = expand_path(state.trim());
            }
        }

        for key in data.keys() {
            warn!("unrecognized key {} in configuration file {}", key, cfgpath.display());
        }

        Ok(config)
    }

    /// Read the configuration, writing a default document when none exists. A document that
    /// fails to parse is left on disk untouched and defaults are used in its place.
    pub fn load_or_create(cfgpath: &Path) -> Result<Config> {
        match Self::parse(Some(cfgpath)) {
            Ok(config) => Ok(config),
            Err(crate::error::BridgeError::Expected(BridgeExpectedError::ConfigNotFound { .. })) => {
                info!("no configuration at {}, writing defaults", cfgpath.display());
                let config = Config::default();
                config.save(cfgpath)?;
                Ok(config)
            }
            Err(crate::error::BridgeError::Expected(e @ (BridgeExpectedError::ConfigDecode(_) | BridgeExpectedError::InvalidConfigValue { .. }))) => {
                warn!("{}. Using defaults.", e);
                Ok(Config::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("download_directory".into(), Value::String(self.naming.download_directory.to_string_lossy().into_owned()));
        map.insert("numbering".into(), Value::String(self.naming.numbering.as_str().into()));
        map.insert("name_order".into(), Value::String(self.naming.name_order.as_str().into()));
        map.insert("max_workers".into(), Value::from(self.max_workers));
        map.insert("legacy_matching".into(), Value::Bool(self.legacy_matching));
        if let Some(cookies) = &self.cookies_file {
            map.insert("cookies_file".into(), Value::String(cookies.to_string_lossy().into_owned()));
        }
        map.insert("state_directory".into(), Value::String(self.state_directory.to_string_lossy().into_owned()));
        Value::Object(map)
    }

    /// Rewrite the whole configuration document.
    pub fn save(&self, cfgpath: &Path) -> Result<()> {
        if let Some(parent) = cfgpath.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(cfgpath, serde_json::to_string_pretty(&self.to_json())?)?;
        debug!("wrote configuration to {}", cfgpath.display());
        Ok(())
    }

    pub fn apply(&mut self, update: SettingsUpdate) -> Result<()> {
        if let Some(workers) = update.max_workers {
            if workers == 0 {
                return Err(invalid("max_workers", "must be a positive integer: got 0").into());
            }
            self.max_workers = workers;
        }
        if let Some(dir) = update.download_directory {
            self.naming.download_directory = dir;
        }
        if let Some(numbering) = update.numbering {
            self.naming.numbering = numbering;
        }
        if let Some(order) = update.name_order {
            self.naming.name_order = order;
        }
        if let Some(legacy) = update.legacy_matching {
            self.legacy_matching = legacy;
        }
        if let Some(cookies) = update.cookies_file {
            self.cookies_file = cookies;
        }
        info!(
            "settings now numbering={} name_order={} max_workers={} legacy_matching={}",
            self.naming.numbering, self.naming.name_order, self.max_workers, self.legacy_matching
        );
        Ok(())
    }
}
