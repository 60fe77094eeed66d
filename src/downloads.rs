/// The downloads module turns a selection into concrete download requests and runs them on a
/// bounded worker pool. The network fetch and transcode happen in a [`TrackDownloader`]
/// collaborator; this module owns paths, progress accounting and cancellation.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::common::{Playlist, Track};
use crate::error::{BridgeError, Result};
use crate::file_index::AUDIO_EXTENSION;
use crate::matcher::Resolver;
use crate::microplaylists::Classification;
use crate::naming::{directory_for, full_filename};
use crate::view::Selection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub track: Track,
    pub output_dir: PathBuf,
    /// Filename without the extension.
    pub file_stem: String,
    pub cookies_file: Option<PathBuf>,
}

impl DownloadRequest {
    pub fn video_id(&self) -> &str {
        &self.track.video_id
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.{}", self.file_stem, AUDIO_EXTENSION))
    }

    /// Artist and title tags to embed in the output file.
    pub fn tags(&self) -> (String, String) {
        (self.track.artists_display(), self.track.title.clone())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DownloadError(pub String);

pub trait TrackDownloader: Send + Sync {
    /// Fetch, transcode and tag one track into `request.output_path()`. `progress` takes a phase
    /// label and a percentage string.
    fn download(&self, request: &DownloadRequest, progress: &dyn Fn(&str, &str)) -> std::result::Result<(), DownloadError>;
}

impl<T: TrackDownloader + ?Sized> TrackDownloader for Arc<T> {
    fn download(&self, request: &DownloadRequest, progress: &dyn Fn(&str, &str)) -> std::result::Result<(), DownloadError> {
        (**self).download(request, progress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Progress { video_id: String, phase: String, percent: String },
    Finished { video_id: String, success: bool, message: String },
    Overall { completed: usize, total: usize, percent: u8 },
    Estimate(String),
    AllFinished,
}

pub trait DownloadObserver: Send + Sync {
    fn notify(&self, event: DownloadEvent);
}

impl<F> DownloadObserver for F
where
    F: Fn(DownloadEvent) + Send + Sync,
{
    fn notify(&self, event: DownloadEvent) {
        self(event)
    }
}

/// Shared keep-running flag. Clearing it stops tasks that have not started yet.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    keep_running: Arc<AtomicBool>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        CancelHandle { keep_running: Arc::new(AtomicBool::new(true)) }
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.keep_running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.keep_running.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub requests: Vec<DownloadRequest>,
    /// Video ids skipped because a matching file is already on disk.
    pub already_downloaded: Vec<String>,
}

impl DownloadPlan {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Expand a selection within one playlist into download requests. A track is planned at most once
/// per folder, so a track in two sub-groups gets a file in each. Tracks the resolver already finds
/// in that folder are left out.
pub fn plan_downloads(
    resolver: &Resolver<'_>,
    playlist: &Playlist,
    classification: &Classification<'_>,
    selection: &[Selection],
    cookies_file: Option<&Path>,
) -> DownloadPlan {
    let mut picked: Vec<(&Track, Option<String>)> = Vec::new();
    for item in selection {
        match item {
            Selection::Track { video_id, sub_group } => match playlist.tracks.iter().find(|t| &t.video_id == video_id) {
                Some(track) => picked.push((track, sub_group.clone())),
                None => warn!("track {} is not in playlist {}", video_id, playlist.id),
            },
            Selection::SubGroupFolder { name } => {
                picked.extend(classification.micro_tracks(&playlist.id, name).iter().map(|t| (*t, Some(name.clone()))));
            }
            Selection::WholePlaylist => {
                for ((parent, name), tracks) in &classification.micro {
                    if parent == &playlist.id {
                        picked.extend(tracks.iter().map(|t| (*t, Some(name.clone()))));
                    }
                }
                picked.extend(classification.residual_tracks(&playlist.id).iter().map(|t| (*t, None)));
            }
        }
    }

    let naming = resolver.naming();
    let total = playlist.tracks.len();
    let mut seen: HashSet<(&str, Option<String>)> = HashSet::new();
    let mut plan = DownloadPlan::default();
    for (track, sub_group) in picked {
        if !seen.insert((track.video_id.as_str(), sub_group.clone())) {
            continue;
        }
        if let Some(found) = resolver.resolve(track, playlist, sub_group.as_deref()) {
            debug!("skipping {}: already at {}", track.video_id, found.path.display());
            plan.already_downloaded.push(track.video_id.clone());
            continue;
        }
        let position = playlist.position_of(&track.video_id);
        plan.requests.push(DownloadRequest {
            track: track.clone(),
            output_dir: directory_for(&naming.download_directory, &playlist.title, sub_group.as_deref()),
            file_stem: full_filename(naming, track, position, Some(total)),
            cookies_file: cookies_file.map(Path::to_path_buf),
        });
    }
    info!("planned {} downloads for {} ({} already downloaded)", plan.requests.len(), playlist.title, plan.already_downloaded.len());
    plan
}

/// ETA text shown while a batch runs.
pub fn format_estimate(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    if secs == 0 {
        return "Finishing...".to_string();
    }
    format!("{}m {}s remaining", secs / 60, secs % 60)
}

#[derive(Debug, Default)]
struct ProgressCounters {
    completed: usize,
    cumulative: Duration,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Never started because the batch was cancelled.
    pub abandoned: Vec<String>,
    pub cancelled: bool,
}

enum TaskOutcome {
    Succeeded(String),
    Failed(String, String),
    Abandoned(String),
}

pub struct DownloadBatch<'a> {
    downloader: &'a dyn TrackDownloader,
    observer: &'a dyn DownloadObserver,
    cancel: CancelHandle,
    max_workers: usize,
    total: usize,
    counters: Mutex<ProgressCounters>,
}

impl<'a> DownloadBatch<'a> {
    pub fn new(downloader: &'a dyn TrackDownloader, observer: &'a dyn DownloadObserver, cancel: CancelHandle, max_workers: usize) -> Self {
        DownloadBatch { downloader, observer, cancel, max_workers: max_workers.max(1), total: 0, counters: Mutex::new(ProgressCounters::default()) }
    }

    /// Run every request, at most `max_workers` at a time. Individual failures are reported and
    /// never stop the other tasks.
    pub fn run(mut self, requests: &[DownloadRequest]) -> Result<BatchSummary> {
        self.total = requests.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .thread_name(|i| format!("download-{i}"))
            .build()
            .map_err(|e| BridgeError::Generic(format!("failed to start download pool: {e}")))?;
        info!("starting {} downloads on {} workers", self.total, self.max_workers);

        let outcomes: Vec<TaskOutcome> = pool.install(|| requests.par_iter().map(|r| self.run_one(r)).collect());

        let mut summary = BatchSummary { cancelled: !self.cancel.is_running(), ..Default::default() };
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Succeeded(id) => summary.succeeded.push(id),
                TaskOutcome::Failed(id, message) => summary.failed.push((id, message)),
                TaskOutcome::Abandoned(id) => summary.abandoned.push(id),
            }
        }
        if summary.cancelled {
            info!("download batch cancelled: {} abandoned", summary.abandoned.len());
        } else {
            self.observer.notify(DownloadEvent::AllFinished);
        }
        info!("downloads finished: {} succeeded, {} failed", summary.succeeded.len(), summary.failed.len());
        Ok(summary)
    }

    fn run_one(&self, request: &DownloadRequest) -> TaskOutcome {
        let video_id = request.video_id().to_string();
        if !self.cancel.is_running() {
            return TaskOutcome::Abandoned(video_id);
        }
        let started = Instant::now();

        let result = fs::create_dir_all(&request.output_dir)
            .map_err(|e| DownloadError(format!("Error: {e}")))
            .and_then(|_| {
                let progress = |phase: &str, percent: &str| {
                    self.observer.notify(DownloadEvent::Progress { video_id: video_id.clone(), phase: phase.to_string(), percent: percent.to_string() });
                };
                self.downloader.download(request, &progress)
            });

        let output = request.output_path();
        let produced = fs::metadata(&output).map(|m| m.is_file() && m.len() > 0).unwrap_or(false);
        let outcome = match (produced, result) {
            (true, _) => TaskOutcome::Succeeded(video_id.clone()),
            (false, Ok(())) => TaskOutcome::Failed(video_id.clone(), "File is empty or missing.".to_string()),
            (false, Err(e)) => {
                error!("error downloading {}: {}", video_id, e);
                TaskOutcome::Failed(video_id.clone(), e.to_string())
            }
        };
        match &outcome {
            TaskOutcome::Succeeded(_) => {
                self.observer.notify(DownloadEvent::Finished { video_id: video_id.clone(), success: true, message: "Download successful".to_string() });
            }
            TaskOutcome::Failed(_, message) => {
                self.observer.notify(DownloadEvent::Finished { video_id: video_id.clone(), success: false, message: message.clone() });
            }
            TaskOutcome::Abandoned(_) => {}
        }

        self.record(started.elapsed());
        outcome
    }

    fn record(&self, elapsed: Duration) {
        let (completed, remaining) = {
            let mut counters = match self.counters.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            counters.completed += 1;
            counters.cumulative += elapsed;
            let average = counters.cumulative / counters.completed as u32;
            (counters.completed, average * (self.total - counters.completed) as u32)
        };
        let percent = ((completed * 100) / self.total.max(1)) as u8;
        self.observer.notify(DownloadEvent::Overall { completed, total: self.total, percent });
        self.observer.notify(DownloadEvent::Estimate(format_estimate(remaining)));
    }
}
