/// Micro-playlists are user-defined sub-groups of one playlist, selected by artist. This module
/// owns their persisted definitions (`microplaylists.json`) and the classifier that sorts a
/// playlist's tracks into them.
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::common::{canonical_artist, Playlist, Track};
use crate::error::{BridgeExpectedError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGroup {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
}

impl SubGroup {
    pub fn new(name: impl Into<String>, artists: &[&str]) -> Self {
        SubGroup { name: name.into(), artists: artists.iter().map(|a| a.to_string()).collect() }
    }

    pub fn artist_keys(&self) -> BTreeSet<String> {
        self.artists.iter().map(|a| canonical_artist(a)).filter(|a| !a.is_empty()).collect()
    }
}

/// Sub-group definitions keyed by parent playlist id.
pub type SubGroupDefs = BTreeMap<String, Vec<SubGroup>>;

#[derive(Debug)]
pub struct SubGroupStore {
    path: PathBuf,
    groups: SubGroupDefs,
}

impl SubGroupStore {
    /// Load the definitions at `path`. A missing or unreadable document yields an empty store;
    /// entries that do not look like a sub-group are dropped.
    pub fn load(path: &Path) -> Self {
        let groups = match fs::read_to_string(path) {
            Ok(text) => parse_definitions(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SubGroupDefs::new(),
            Err(e) => {
                warn!("failed to read sub-groups at {}: {}. Using defaults.", path.display(), e);
                SubGroupDefs::new()
            }
        };
        SubGroupStore { path: path.to_path_buf(), groups }
    }

    pub fn in_memory(path: impl Into<PathBuf>, groups: SubGroupDefs) -> Self {
        SubGroupStore { path: path.into(), groups }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn definitions(&self) -> &SubGroupDefs {
        &self.groups
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.groups)?)?;
        debug!("wrote {} sub-group parents to {}", self.groups.len(), self.path.display());
        Ok(())
    }

    pub fn for_playlist(&self, parent_id: &str) -> &[SubGroup] {
        self.groups.get(parent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, parent_id: &str, name: &str) -> Option<&SubGroup> {
        self.for_playlist(parent_id).iter().find(|g| g.name == name)
    }

    pub fn add(&mut self, parent_id: &str, name: &str, artists: Vec<String>) -> Result<()> {
        let siblings = self.groups.entry(parent_id.to_string()).or_default();
        if siblings.iter().any(|g| g.name == name) {
            return Err(BridgeExpectedError::SubGroupAlreadyExists { name: name.to_string() }.into());
        }
        siblings.push(SubGroup { name: name.to_string(), artists });
        self.save()?;
        info!("created micro-playlist {} under {}", name, parent_id);
        Ok(())
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, parent_id: &str, name: &str) -> Result<bool> {
        let Some(siblings) = self.groups.get_mut(parent_id) else {
            debug!("no-op: playlist {} has no micro-playlists", parent_id);
            return Ok(false);
        };
        let before = siblings.len();
        siblings.retain(|g| g.name != name);
        if siblings.len() == before {
            debug!("no-op: micro-playlist {} not found under {}", name, parent_id);
            return Ok(false);
        }
        if siblings.is_empty() {
            self.groups.remove(parent_id);
        }
        self.save()?;
        info!("removed micro-playlist {} from {}", name, parent_id);
        Ok(true)
    }

    pub fn update(&mut self, parent_id: &str, original_name: &str, new_name: &str, new_artists: Vec<String>) -> Result<()> {
        let Some(siblings) = self.groups.get_mut(parent_id) else {
            return Err(BridgeExpectedError::ParentPlaylistNotFound { id: parent_id.to_string() }.into());
        };
        if new_name != original_name && siblings.iter().any(|g| g.name == new_name) {
            return Err(BridgeExpectedError::SubGroupAlreadyExists { name: new_name.to_string() }.into());
        }
        let Some(group) = siblings.iter_mut().find(|g| g.name == original_name) else {
            return Err(BridgeExpectedError::SubGroupDoesNotExist { name: original_name.to_string() }.into());
        };
        group.name = new_name.to_string();
        group.artists = new_artists;
        self.save()?;
        info!("updated micro-playlist {} -> {} under {}", original_name, new_name, parent_id);
        Ok(())
    }

    /// Drop every sub-group of a playlist that is no longer tracked.
    pub fn remove_parent(&mut self, parent_id: &str) -> Result<()> {
        if self.groups.remove(parent_id).is_some() {
            self.save()?;
            info!("removed micro-playlists of {}", parent_id);
        }
        Ok(())
    }
}

fn parse_definitions(text: &str, path: &Path) -> SubGroupDefs {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("failed to parse sub-groups at {}: {}. Using defaults.", path.display(), e);
            return SubGroupDefs::new();
        }
    };
    let Value::Object(map) = value else {
        warn!("sub-groups at {} are not an object. Using defaults.", path.display());
        return SubGroupDefs::new();
    };

    let mut groups = SubGroupDefs::new();
    for (parent_id, entries) in map {
        let Value::Array(entries) = entries else {
            warn!("skipping malformed sub-group list for {}", parent_id);
            continue;
        };
        let mut siblings: Vec<SubGroup> = Vec::new();
        for entry in entries {
            match serde_json::from_value::<SubGroup>(entry) {
                Ok(group) if siblings.iter().any(|g| g.name == group.name) => {
                    warn!("dropping duplicate micro-playlist {} under {}", group.name, parent_id);
                }
                Ok(group) => siblings.push(group),
                Err(e) => warn!("skipping malformed micro-playlist under {}: {}", parent_id, e),
            }
        }
        if !siblings.is_empty() {
            groups.insert(parent_id, siblings);
        }
    }
    groups
}

/// Artists a sub-group can be defined over: every credited artist in the playlist, undecorated,
/// sorted and unique.
pub fn playlist_artists(playlist: &Playlist) -> Vec<String> {
    let names: BTreeSet<String> = playlist.tracks.iter().flat_map(|t| t.artist_names()).collect();
    names.into_iter().collect()
}

/// Result of sorting tracks into sub-groups. Buckets keep source playlist order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Classification<'a> {
    pub micro: BTreeMap<(String, String), Vec<&'a Track>>,
    pub residual: BTreeMap<String, Vec<&'a Track>>,
}

impl<'a> Classification<'a> {
    pub fn micro_tracks(&self, parent_id: &str, name: &str) -> &[&'a Track] {
        self.micro.get(&(parent_id.to_string(), name.to_string())).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn residual_tracks(&self, parent_id: &str) -> &[&'a Track] {
        self.residual.get(parent_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Sort every track of every playlist into each of its parent's sub-groups it shares an artist
/// with, or into the parent's residual bucket when it matches none. Only the parent's own
/// sub-groups are consulted.
pub fn classify<'a>(playlists: &'a BTreeMap<String, Playlist>, defs: &SubGroupDefs) -> Classification<'a> {
    let mut result = Classification::default();
    let mut seen: HashSet<(String, Option<String>, &'a str)> = HashSet::new();

    for (parent_id, playlist) in playlists {
        let groups: Vec<(&str, BTreeSet<String>)> = defs
            .get(parent_id)
            .map(|gs| gs.iter().map(|g| (g.name.as_str(), g.artist_keys())).collect())
            .unwrap_or_default();

        for track in &playlist.tracks {
            let keys = track.artist_keys();
            let mut matched = false;
            for (name, group_keys) in &groups {
                if !keys.iter().any(|k| group_keys.contains(k)) {
                    continue;
                }
                matched = true;
                if seen.insert((parent_id.clone(), Some(name.to_string()), track.video_id.as_str())) {
                    result.micro.entry((parent_id.clone(), name.to_string())).or_default().push(track);
                }
            }
            if !matched && seen.insert((parent_id.clone(), None, track.video_id.as_str())) {
                result.residual.entry(parent_id.clone()).or_default().push(track);
            }
        }
    }
    result
}
