/// The library module is the single entry point a front end talks to. It owns the loaded
/// configuration, both state documents, the file index snapshot, and the two collaborators, and
/// sequences them: fetch, merge, persist, classify, resolve, download, rescan.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use tracing::{debug, info};

use crate::common::{uniq, Playlist};
use crate::config::{Config, NamingConfig, SettingsUpdate};
use crate::downloads::{plan_downloads, BatchSummary, CancelHandle, DownloadBatch, DownloadObserver, DownloadPlan, TrackDownloader};
use crate::error::{BridgeExpectedError, Result};
use crate::fetch::{fetch_snapshots, FetchTarget, PlaylistSource, RemotePlaylistSummary};
use crate::file_index::{FileIndex, SharedFileIndex};
use crate::matcher::Resolver;
use crate::microplaylists::{classify, playlist_artists, SubGroup, SubGroupStore};
use crate::playlists::{diff_and_merge, require_playlist_id, PlaylistStore, SyncMode, SyncReport};
use crate::reformat::{reformat, ReformatReport};
use crate::view::{PlaylistView, Selection, TrackStatus};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub plan: DownloadPlan,
    pub summary: BatchSummary,
}

pub struct Library {
    config_path: PathBuf,
    config: RwLock<Config>,
    playlists: Mutex<PlaylistStore>,
    subgroups: Mutex<SubGroupStore>,
    index: SharedFileIndex,
    source: Box<dyn PlaylistSource>,
    downloader: Box<dyn TrackDownloader>,
}

impl Library {
    /// Load (or create) the configuration at `config_path`, then the state documents it points to,
    /// and take a first scan of the download root.
    pub fn open(config_path: &Path, source: Box<dyn PlaylistSource>, downloader: Box<dyn TrackDownloader>) -> Result<Self> {
        let config = Config::load_or_create(config_path)?;
        Ok(Self::with_config(config, config_path, source, downloader))
    }

    pub fn with_config(config: Config, config_path: &Path, source: Box<dyn PlaylistSource>, downloader: Box<dyn TrackDownloader>) -> Self {
        let playlists = PlaylistStore::load(&config.playlists_path());
        let subgroups = SubGroupStore::load(&config.subgroups_path());
        let index = SharedFileIndex::new(FileIndex::build(&config.naming.download_directory));
        info!("opened library with {} playlists", playlists.playlists().len());
        Library {
            config_path: config_path.to_path_buf(),
            config: RwLock::new(config),
            playlists: Mutex::new(playlists),
            subgroups: Mutex::new(subgroups),
            index,
            source,
            downloader,
        }
    }

    fn read_config(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> Config {
        self.read_config().clone()
    }

    /// Apply and persist a settings change. Returns the settings in force before the change, which
    /// is what [`Library::reformat_from`] needs to migrate existing files.
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<Config> {
        let (previous, current) = {
            let mut guard = self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut next = guard.clone();
            next.apply(update)?;
            next.save(&self.config_path)?;
            let previous = std::mem::replace(&mut *guard, next);
            (previous, guard.clone())
        };
        if previous.naming.download_directory != current.naming.download_directory {
            self.index.rebuild(&current.naming.download_directory);
        }
        Ok(previous)
    }

    pub fn rescan(&self) -> Arc<FileIndex> {
        let root = self.read_config().naming.download_directory.clone();
        self.index.rebuild(&root)
    }

    pub fn index(&self) -> Arc<FileIndex> {
        self.index.snapshot()
    }

    pub fn playlists(&self) -> BTreeMap<String, Playlist> {
        lock(&self.playlists).playlists().clone()
    }

    pub fn playlist(&self, id: &str) -> Result<Playlist> {
        lock(&self.playlists).require(id).cloned()
    }

    /// Start tracking the playlist a share URL points at.
    pub fn add_playlist(&self, url: &str) -> Result<SyncReport> {
        let id = require_playlist_id(url)?;
        if lock(&self.playlists).contains(&id) {
            debug!("playlist {} is already tracked, re-syncing", id);
        }
        self.sync_targets(&[(id, false)], None)
    }

    /// Stop tracking a playlist and drop its sub-groups.
    pub fn remove_playlist(&self, id: &str) -> Result<bool> {
        let removed = lock(&self.playlists).remove(id)?;
        lock(&self.subgroups).remove_parent(id)?;
        Ok(removed.is_some())
    }

    /// Re-fetch the given tracked playlists, or all of them when `ids` is empty. Playlists that were
    /// not fetched are left as they are.
    pub fn sync(&self, ids: &[String]) -> Result<SyncReport> {
        let targets: Vec<FetchTarget> = {
            let store = lock(&self.playlists);
            if ids.is_empty() {
                store.playlists().values().map(|p| (p.id.clone(), p.is_private)).collect()
            } else {
                ids.iter().map(|id| (id.clone(), store.get(id).map(|p| p.is_private).unwrap_or(false))).collect()
            }
        };
        self.sync_targets(&targets, None)
    }

    /// Re-enumerate the owned playlists and re-fetch everything tracked. Tracked private playlists
    /// that are no longer owned are removed along with their sub-groups.
    pub fn full_refresh(&self) -> Result<SyncReport> {
        let owned = self.source.fetch_all_owned_playlists()?;
        let owned_privacy: BTreeMap<&str, bool> = owned.iter().map(|s| (s.id.as_str(), s.privacy_status.is_private())).collect();

        let (targets, live) = {
            let store = lock(&self.playlists);
            let mut live: BTreeSet<String> = owned.iter().map(|s| s.id.clone()).collect();
            let mut targets: Vec<FetchTarget> = Vec::new();
            for playlist in store.playlists().values() {
                match owned_privacy.get(playlist.id.as_str()) {
                    Some(is_private) => targets.push((playlist.id.clone(), *is_private)),
                    None if !playlist.is_private => {
                        live.insert(playlist.id.clone());
                        targets.push((playlist.id.clone(), false));
                    }
                    None => {}
                }
            }
            (targets, live)
        };
        self.sync_targets(&targets, Some(live))
    }

    fn sync_targets(&self, targets: &[FetchTarget], live: Option<BTreeSet<String>>) -> Result<SyncReport> {
        let batch = fetch_snapshots(self.source.as_ref(), targets);
        let mode = match live {
            Some(live) => SyncMode::FullRefresh { live },
            None => SyncMode::Partial,
        };

        let outcome = {
            let mut store = lock(&self.playlists);
            let outcome = diff_and_merge(store.playlists(), &batch.playlists, &mode);
            store.replace_all(outcome.merged.clone())?;
            outcome
        };
        if !outcome.removed.is_empty() {
            let mut subgroups = lock(&self.subgroups);
            for id in &outcome.removed {
                subgroups.remove_parent(id)?;
            }
        }

        let report = SyncReport::new(&outcome, &batch.failures);
        for line in report.summary_lines() {
            info!("{}", line);
        }
        Ok(report)
    }

    /// Owned remote playlists that are not tracked yet.
    pub fn untracked_owned_playlists(&self) -> Result<Vec<RemotePlaylistSummary>> {
        let owned = self.source.fetch_all_owned_playlists()?;
        let store = lock(&self.playlists);
        Ok(owned.into_iter().filter(|s| !store.contains(&s.id)).collect())
    }

    pub fn subgroups(&self, parent_id: &str) -> Vec<SubGroup> {
        lock(&self.subgroups).for_playlist(parent_id).to_vec()
    }

    pub fn artists_for(&self, parent_id: &str) -> Result<Vec<String>> {
        let store = lock(&self.playlists);
        Ok(playlist_artists(store.require(parent_id)?))
    }

    /// Define a sub-group. Without an explicit name it is named after its artists. Returns the name.
    pub fn add_subgroup(&self, parent_id: &str, name: Option<&str>, artists: &[String]) -> Result<String> {
        if !lock(&self.playlists).contains(parent_id) {
            return Err(BridgeExpectedError::ParentPlaylistNotFound { id: parent_id.to_string() }.into());
        }
        let artists = normalize_artists(artists)?;
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => artists.join(", "),
        };
        lock(&self.subgroups).add(parent_id, &name, artists)?;
        Ok(name)
    }

    pub fn update_subgroup(&self, parent_id: &str, original_name: &str, new_name: &str, artists: &[String]) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(BridgeExpectedError::Generic("Micro-playlist name cannot be empty.".to_string()).into());
        }
        let artists = normalize_artists(artists)?;
        lock(&self.subgroups).update(parent_id, original_name, new_name, artists)
    }

    pub fn remove_subgroup(&self, parent_id: &str, name: &str) -> Result<bool> {
        lock(&self.subgroups).remove(parent_id, name)
    }

    /// Rescan, then lay out one playlist and hand the view to `f`.
    pub fn with_view<R>(&self, playlist_id: &str, f: impl FnOnce(&PlaylistView<'_>) -> R) -> Result<R> {
        let config = self.config();
        let index = self.rescan();
        let store = lock(&self.playlists);
        let subgroups = lock(&self.subgroups);
        let playlist = store.require(playlist_id)?;
        let classification = classify(store.playlists(), subgroups.definitions());
        let resolver = Resolver::new(&config.naming, &index, config.legacy_matching);
        let view = PlaylistView::build(playlist, subgroups.for_playlist(playlist_id), &classification, &resolver);
        Ok(f(&view))
    }

    /// Download status of every row in a playlist: video id, sub-group, status.
    pub fn track_statuses(&self, playlist_id: &str) -> Result<Vec<(String, Option<String>, TrackStatus)>> {
        self.with_view(playlist_id, |view| view.rows().map(|r| (r.track.video_id.clone(), r.sub_group.clone(), r.status.clone())).collect())
    }

    /// Download whatever in `selection` is not on disk yet. The index is rebuilt afterwards when
    /// anything was written.
    pub fn download(&self, playlist_id: &str, selection: &[Selection], observer: &dyn DownloadObserver, cancel: CancelHandle) -> Result<DownloadReport> {
        let config = self.config();
        config.download_directory()?;
        let index = self.rescan();

        let plan = {
            let store = lock(&self.playlists);
            let subgroups = lock(&self.subgroups);
            let playlist = store.require(playlist_id)?;
            let classification = classify(store.playlists(), subgroups.definitions());
            let resolver = Resolver::new(&config.naming, &index, config.legacy_matching);
            plan_downloads(&resolver, playlist, &classification, selection, config.cookies_file.as_deref())
        };
        if plan.is_empty() {
            info!("no new tracks to download");
            return Ok(DownloadReport { plan, summary: BatchSummary::default() });
        }

        let summary = DownloadBatch::new(self.downloader.as_ref(), observer, cancel, config.max_workers).run(&plan.requests)?;
        if !summary.succeeded.is_empty() {
            self.rescan();
        }
        Ok(DownloadReport { plan, summary })
    }

    /// Rename files on disk to the names the current settings give them.
    pub fn reformat(&self) -> Result<ReformatReport> {
        let current = self.config().naming;
        self.reformat_from(&current)
    }

    /// Find files as `previous` would have named them and rename them to the current scheme. Files
    /// are looked up under the current download root.
    pub fn reformat_from(&self, previous: &NamingConfig) -> Result<ReformatReport> {
        let config = self.config();
        config.download_directory()?;
        let index = self.rescan();
        let previous = NamingConfig { download_directory: config.naming.download_directory.clone(), ..previous.clone() };
        let report = {
            let store = lock(&self.playlists);
            let subgroups = lock(&self.subgroups);
            let resolver = Resolver::new(&previous, &index, config.legacy_matching);
            reformat(&resolver, &config.naming, store.playlists(), subgroups.definitions())
        };
        self.rescan();
        Ok(report)
    }
}

fn normalize_artists(artists: &[String]) -> Result<Vec<String>> {
    let mut artists = uniq(artists.iter().map(|a| a.trim().to_string()).filter(|a| !a.is_empty()).collect());
    if artists.is_empty() {
        return Err(BridgeExpectedError::Generic("Please select at least one artist.".to_string()).into());
    }
    artists.sort();
    Ok(artists)
}
