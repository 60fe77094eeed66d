use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use tempfile::TempDir;

use crate::common::{Playlist, Track};
use crate::config::Config;
use crate::downloads::{DownloadError, DownloadRequest, TrackDownloader};
use crate::fetch::{FetchError, FetchedPlaylist, PlaylistSource, Privacy, RemotePlaylistSummary};

static INIT: Once = Once::new();

pub fn init() -> TempDir {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    });
    TempDir::new().expect("failed to create temp dir")
}

// A config whose download root and state directory both live in a fresh temp dir.
pub fn config() -> (Config, TempDir) {
    let temp_dir = init();
    let base_path = temp_dir.path();
    fs::create_dir_all(base_path.join("music")).expect("failed to create music dir");
    fs::create_dir_all(base_path.join("state")).expect("failed to create state dir");

    let mut config = Config::default();
    config.naming.download_directory = base_path.join("music");
    config.state_directory = base_path.join("state");
    (config, temp_dir)
}

pub fn track(id: &str, title: &str, artists: &[&str]) -> Track {
    Track::new(id, title, artists)
}

pub fn playlist(id: &str, title: &str, tracks: Vec<Track>) -> Playlist {
    Playlist { id: id.to_string(), title: title.to_string(), is_private: false, tracks }
}

/// Create a small non-empty file, making parent directories as needed.
pub fn touch(path: &Path) -> PathBuf {
    fs::create_dir_all(path.parent().expect("path has no parent")).expect("failed to create parent dir");
    fs::write(path, b"ID3").expect("failed to write file");
    path.to_path_buf()
}

#[derive(Default)]
pub struct StubSource {
    pub owned: Vec<RemotePlaylistSummary>,
    pub playlists: Mutex<HashMap<String, FetchedPlaylist>>,
    pub unauthenticated: bool,
    pub calls: Mutex<Vec<(String, bool)>>,
}

impl StubSource {
    pub fn with_playlist(self, id: &str, title: &str, tracks: Vec<Track>) -> Self {
        self.playlists.lock().unwrap().insert(id.to_string(), FetchedPlaylist { title: title.to_string(), tracks });
        self
    }

    pub fn with_owned(mut self, id: &str, title: &str, privacy_status: Privacy) -> Self {
        self.owned.push(RemotePlaylistSummary { id: id.to_string(), title: title.to_string(), privacy_status });
        self
    }
}

impl PlaylistSource for StubSource {
    fn fetch_all_owned_playlists(&self) -> Result<Vec<RemotePlaylistSummary>, FetchError> {
        if self.unauthenticated {
            return Err(FetchError::NotAuthenticated);
        }
        Ok(self.owned.clone())
    }

    fn fetch_playlist(&self, id: &str, is_private: bool) -> Result<FetchedPlaylist, FetchError> {
        self.calls.lock().unwrap().push((id.to_string(), is_private));
        self.playlists.lock().unwrap().get(id).cloned().ok_or_else(|| FetchError::Remote(format!("playlist {id} not found")))
    }
}

/// Writes a small file for every request except the video ids listed in `fail`.
#[derive(Default)]
pub struct StubDownloader {
    pub fail: HashSet<String>,
    pub requested: Mutex<Vec<String>>,
}

impl StubDownloader {
    pub fn failing(ids: &[&str]) -> Self {
        StubDownloader { fail: ids.iter().map(|s| s.to_string()).collect(), ..Default::default() }
    }
}

impl TrackDownloader for StubDownloader {
    fn download(&self, request: &DownloadRequest, progress: &dyn Fn(&str, &str)) -> Result<(), DownloadError> {
        self.requested.lock().unwrap().push(request.video_id().to_string());
        progress("Downloading (1.0MiB/s)", "50.0%");
        if self.fail.contains(request.video_id()) {
            return Err(DownloadError("Error: video unavailable".to_string()));
        }
        progress("Converting...", "100%");
        fs::write(request.output_path(), b"ID3").map_err(|e| DownloadError(e.to_string()))
    }
}
