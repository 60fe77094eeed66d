/// Reformatting renames files already on disk to the names the current settings would give them.
/// It is how libraries written under an older sanitizer or numbering scheme are migrated: a file
/// is found the way the matcher finds it, then moved to its canonical name in the same directory.
use std::collections::BTreeMap;
use std::fs;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::{Playlist, Track};
use crate::config::NamingConfig;
use crate::file_index::AUDIO_EXTENSION;
use crate::matcher::Resolver;
use crate::microplaylists::{classify, SubGroupDefs};
use crate::naming::full_filename;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReformatReport {
    pub renamed: usize,
    pub unchanged: usize,
    /// Targets that already existed. Those files are left alone.
    pub collisions: usize,
    pub failed: usize,
}

/// Rename every file `current` can resolve to its name under `target`.
pub fn reformat(current: &Resolver<'_>, target: &NamingConfig, playlists: &BTreeMap<String, Playlist>, defs: &SubGroupDefs) -> ReformatReport {
    let classification = classify(playlists, defs);
    let mut report = ReformatReport::default();

    let mut placements: Vec<(&Playlist, &Track, Option<&str>)> = Vec::new();
    for ((parent, name), tracks) in &classification.micro {
        if let Some(playlist) = playlists.get(parent) {
            placements.extend(tracks.iter().map(|t| (playlist, *t, Some(name.as_str()))));
        }
    }
    for (parent, tracks) in &classification.residual {
        if let Some(playlist) = playlists.get(parent) {
            placements.extend(tracks.iter().map(|t| (playlist, *t, None)));
        }
    }

    for (playlist, track, sub_group) in placements {
        let Some(found) = current.resolve(track, playlist, sub_group) else {
            continue;
        };
        let Some(dir) = found.path.parent() else {
            continue;
        };
        let position = playlist.position_of(&track.video_id);
        let stem = full_filename(target, track, position, Some(playlist.tracks.len()));
        let destination = dir.join(format!("{stem}.{AUDIO_EXTENSION}"));

        if destination == found.path {
            report.unchanged += 1;
            continue;
        }
        if destination.exists() {
            warn!("not renaming {}: {} already exists", found.path.display(), destination.display());
            report.collisions += 1;
            continue;
        }
        match fs::rename(&found.path, &destination) {
            Ok(()) => {
                debug!("renamed {} -> {}", found.path.display(), destination.display());
                report.renamed += 1;
            }
            Err(e) => {
                warn!("failed to rename {}: {}", found.path.display(), e);
                report.failed += 1;
            }
        }
    }

    info!("reformat finished: {} renamed, {} unchanged, {} collisions, {} failed", report.renamed, report.unchanged, report.collisions, report.failed);
    report
}
