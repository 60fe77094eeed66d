/// The matcher answers "is this track already on disk, and where?" against one file index snapshot.
///
/// Matching ignores any leading `<digits>_` prefix on the candidate, so files written with or
/// without numbering (or with a stale position) are still recognized. When legacy matching is on,
/// names produced by older sanitizers are tried only after the current rule finds nothing.
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::{Playlist, Track};
use crate::config::NamingConfig;
use crate::file_index::{FileIndex, AUDIO_EXTENSION};
use crate::naming::{base_name, directory_for, legacy_base_names};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMatch {
    pub path: PathBuf,
    pub kind: MatchKind,
}

/// The names a candidate file may be compared under: the part after a numeric prefix (when there
/// is one) and the whole stem.
fn comparison_bases(filename: &str) -> Option<(&str, &str)> {
    let stem = filename.strip_suffix(&format!(".{AUDIO_EXTENSION}"))?;
    let stripped = match stem.split_once('_') {
        Some((head, rest)) if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => stem,
    };
    Some((stripped, stem))
}

pub struct Resolver<'a> {
    naming: &'a NamingConfig,
    index: &'a FileIndex,
    legacy: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(naming: &'a NamingConfig, index: &'a FileIndex, legacy: bool) -> Self {
        Resolver { naming, index, legacy }
    }

    pub fn naming(&self) -> &NamingConfig {
        self.naming
    }

    pub fn resolve(&self, track: &Track, playlist: &Playlist, sub_group: Option<&str>) -> Option<TrackMatch> {
        let target_dir = directory_for(&self.naming.download_directory, &playlist.title, sub_group);
        self.resolve_in(track, &target_dir)
    }

    pub fn resolve_in(&self, track: &Track, target_dir: &Path) -> Option<TrackMatch> {
        let candidates = self.index.files_in(target_dir);
        if candidates.is_empty() {
            return None;
        }

        let expected = base_name(self.naming, track);
        if let Some(found) = find_candidate(candidates.iter(), &[expected]) {
            return Some(TrackMatch { path: target_dir.join(found), kind: MatchKind::Exact });
        }

        if self.legacy {
            let legacy = legacy_base_names(self.naming, track);
            if let Some(found) = find_candidate(candidates.iter(), &legacy) {
                debug!("matched {} to legacy-named file {}", track.video_id, found);
                return Some(TrackMatch { path: target_dir.join(found), kind: MatchKind::Legacy });
            }
        }
        None
    }

    pub fn is_downloaded(&self, track: &Track, playlist: &Playlist, sub_group: Option<&str>) -> bool {
        self.resolve(track, playlist, sub_group).is_some()
    }
}

fn find_candidate<'c>(candidates: impl Iterator<Item = &'c String>, expected: &[String]) -> Option<&'c str> {
    for candidate in candidates {
        let Some((stripped, stem)) = comparison_bases(candidate) else {
            continue;
        };
        if expected.iter().any(|e| e == stripped || e == stem) {
            return Some(candidate.as_str());
        }
    }
    None
}
