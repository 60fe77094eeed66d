/// The fetch module is the boundary to the remote playlist service. The service itself is a
/// collaborator behind the [`PlaylistSource`] trait; failures come back as [`FetchError`] values.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::common::{Playlist, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Private,
    Unlisted,
}

impl Privacy {
    pub fn is_private(&self) -> bool {
        *self != Privacy::Public
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePlaylistSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "privacyStatus", default)]
    pub privacy_status: Privacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchedPlaylist {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl FetchedPlaylist {
    pub fn into_playlist(self, id: &str, is_private: bool) -> Playlist {
        Playlist { id: id.to_string(), title: self.title, is_private, tracks: self.tracks }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("{0}")]
    Remote(String),
}

pub trait PlaylistSource: Send + Sync {
    fn fetch_all_owned_playlists(&self) -> std::result::Result<Vec<RemotePlaylistSummary>, FetchError>;
    fn fetch_playlist(&self, id: &str, is_private: bool) -> std::result::Result<FetchedPlaylist, FetchError>;
}

impl<T: PlaylistSource + ?Sized> PlaylistSource for std::sync::Arc<T> {
    fn fetch_all_owned_playlists(&self) -> std::result::Result<Vec<RemotePlaylistSummary>, FetchError> {
        (**self).fetch_all_owned_playlists()
    }

    fn fetch_playlist(&self, id: &str, is_private: bool) -> std::result::Result<FetchedPlaylist, FetchError> {
        (**self).fetch_playlist(id, is_private)
    }
}

/// A fetch target: playlist id and whether it needs the authenticated endpoint.
pub type FetchTarget = (String, bool);

#[derive(Debug, Default)]
pub struct FetchBatch {
    pub playlists: BTreeMap<String, Playlist>,
    pub failures: Vec<(String, FetchError)>,
}

/// Fetch each target in turn. A failing playlist is recorded and skipped; it never stops the rest.
pub fn fetch_snapshots(source: &dyn PlaylistSource, targets: &[FetchTarget]) -> FetchBatch {
    let mut batch = FetchBatch::default();
    for (id, is_private) in targets {
        match source.fetch_playlist(id, *is_private) {
            Ok(fetched) => {
                info!("fetched playlist {} ({} tracks)", id, fetched.tracks.len());
                batch.playlists.insert(id.clone(), fetched.into_playlist(id, *is_private));
            }
            Err(e) => {
                warn!("failed to fetch playlist {}: {}", id, e);
                batch.failures.push((id.clone(), e));
            }
        }
    }
    batch
}
