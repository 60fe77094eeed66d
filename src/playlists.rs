/// The playlists module owns the persisted playlist snapshots (`playlists.json`) and the merge
/// that folds a fresh fetch into them.
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::Playlist;
use crate::error::{BridgeExpectedError, Result};
use crate::fetch::FetchError;

static PLAYLIST_ID_REGEX: OnceLock<Regex> = OnceLock::new();

/// Pull the playlist id out of a share URL (`...?list=<id>`).
pub fn extract_playlist_id(url: &str) -> Option<String> {
    let re = PLAYLIST_ID_REGEX.get_or_init(|| Regex::new(r"list=([a-zA-Z0-9_-]+)").unwrap());
    re.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

pub fn require_playlist_id(url: &str) -> Result<String> {
    extract_playlist_id(url).ok_or_else(|| BridgeExpectedError::InvalidPlaylistUrl { url: url.to_string() }.into())
}

#[derive(Debug)]
pub struct PlaylistStore {
    path: PathBuf,
    playlists: BTreeMap<String, Playlist>,
}

impl PlaylistStore {
    /// Load the snapshot document. Missing or corrupt documents give an empty store.
    pub fn load(path: &Path) -> Self {
        let mut playlists: BTreeMap<String, Playlist> = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(playlists) => playlists,
                Err(e) => {
                    warn!("failed to parse playlists at {}: {}. Using defaults.", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("failed to read playlists at {}: {}. Using defaults.", path.display(), e);
                BTreeMap::new()
            }
        };
        for (id, playlist) in playlists.iter_mut() {
            playlist.id = id.clone();
        }
        debug!("loaded {} playlists from {}", playlists.len(), path.display());
        PlaylistStore { path: path.to_path_buf(), playlists }
    }

    pub fn in_memory(path: impl Into<PathBuf>, playlists: BTreeMap<String, Playlist>) -> Self {
        PlaylistStore { path: path.into(), playlists }
    }

    pub fn playlists(&self) -> &BTreeMap<String, Playlist> {
        &self.playlists
    }

    pub fn get(&self, id: &str) -> Option<&Playlist> {
        self.playlists.get(id)
    }

    pub fn require(&self, id: &str) -> Result<&Playlist> {
        self.get(id).ok_or_else(|| BridgeExpectedError::PlaylistDoesNotExist { id: id.to_string() }.into())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.playlists.contains_key(id)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.playlists)?)?;
        debug!("wrote {} playlists to {}", self.playlists.len(), self.path.display());
        Ok(())
    }

    /// Replace the whole snapshot set and persist it.
    pub fn replace_all(&mut self, playlists: BTreeMap<String, Playlist>) -> Result<()> {
        self.playlists = playlists;
        self.save()
    }

    pub fn remove(&mut self, id: &str) -> Result<Option<Playlist>> {
        let removed = self.playlists.remove(id);
        match &removed {
            Some(p) => {
                self.save()?;
                info!("removed playlist {} ({})", p.title, id);
            }
            None => debug!("no-op: playlist {} is not tracked", id),
        }
        Ok(removed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// Only the fetched playlists are touched; everything else is kept.
    Partial,
    /// `live` is the complete remote set; tracked playlists outside it are dropped.
    FullRefresh { live: BTreeSet<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    pub merged: BTreeMap<String, Playlist>,
    /// Newly added video ids per playlist, in fresh playlist order. Playlists with none are absent.
    pub added: BTreeMap<String, Vec<String>>,
    pub removed: Vec<String>,
}

impl SyncOutcome {
    pub fn added_count(&self, id: &str) -> usize {
        self.added.get(id).map(Vec::len).unwrap_or(0)
    }
}

/// Fold `fresh` into `old`. Fresh records replace old ones wholesale. Neither input is modified.
pub fn diff_and_merge(old: &BTreeMap<String, Playlist>, fresh: &BTreeMap<String, Playlist>, mode: &SyncMode) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();

    for (id, playlist) in old {
        if fresh.contains_key(id) {
            continue;
        }
        match mode {
            SyncMode::FullRefresh { live } if !live.contains(id) => outcome.removed.push(id.clone()),
            _ => {
                outcome.merged.insert(id.clone(), playlist.clone());
            }
        }
    }

    for (id, playlist) in fresh {
        if let Some(previous) = old.get(id) {
            let known = previous.video_ids();
            let mut added: Vec<String> = Vec::new();
            for track in &playlist.tracks {
                if !known.contains(track.video_id.as_str()) && !added.contains(&track.video_id) {
                    added.push(track.video_id.clone());
                }
            }
            if !added.is_empty() {
                outcome.added.insert(id.clone(), added);
            }
        }
        let mut playlist = playlist.clone();
        playlist.id = id.clone();
        outcome.merged.insert(id.clone(), playlist);
    }

    outcome
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub synced_at: DateTime<Utc>,
    pub added: BTreeMap<String, Vec<String>>,
    pub removed: Vec<String>,
    pub failures: Vec<(String, String)>,
    titles: BTreeMap<String, String>,
}

impl SyncReport {
    pub fn new(outcome: &SyncOutcome, failures: &[(String, FetchError)]) -> Self {
        let titles = outcome
            .added
            .keys()
            .filter_map(|id| outcome.merged.get(id).map(|p| (id.clone(), p.title.clone())))
            .collect();
        SyncReport {
            synced_at: Utc::now(),
            added: outcome.added.clone(),
            removed: outcome.removed.clone(),
            failures: failures.iter().map(|(id, e)| (id.clone(), e.to_string())).collect(),
            titles,
        }
    }

    pub fn has_new_tracks(&self) -> bool {
        !self.added.is_empty()
    }

    /// One line per playlist that gained tracks, e.g. `'Road Trip': 2 new song(s)`.
    pub fn summary_lines(&self) -> Vec<String> {
        self.added
            .iter()
            .map(|(id, ids)| {
                let title = self.titles.get(id).map(String::as_str).unwrap_or(id);
                let short: String = title.chars().take(30).collect();
                let ellipsis = if short.len() < title.len() { "..." } else { "" };
                format!("'{short}{ellipsis}': {} new song(s)", ids.len())
            })
            .collect()
    }
}
