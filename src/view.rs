/// The view module lays out one playlist the way a front end shows it: sub-group folders first,
/// then the tracks that belong to no sub-group, each row tagged with its download status.
use std::path::PathBuf;

use crate::common::{Playlist, Track};
use crate::matcher::Resolver;
use crate::microplaylists::{Classification, SubGroup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackStatus {
    Downloaded(PathBuf),
    NotDownloaded,
}

impl TrackStatus {
    pub fn is_downloaded(&self) -> bool {
        matches!(self, TrackStatus::Downloaded(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrackStatus::Downloaded(_) => "Downloaded",
            TrackStatus::NotDownloaded => "Not Downloaded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow<'a> {
    pub track: &'a Track,
    pub sub_group: Option<String>,
    pub status: TrackStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewItem<'a> {
    SubGroupFolder { name: String, tracks: Vec<TrackRow<'a>> },
    Track(TrackRow<'a>),
}

/// What the user picked to act on within one playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Track { video_id: String, sub_group: Option<String> },
    SubGroupFolder { name: String },
    WholePlaylist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistView<'a> {
    pub playlist: &'a Playlist,
    pub items: Vec<ViewItem<'a>>,
}

impl<'a> PlaylistView<'a> {
    pub fn build(playlist: &'a Playlist, groups: &[SubGroup], classification: &Classification<'a>, resolver: &Resolver<'_>) -> Self {
        let row = |track: &'a Track, sub_group: Option<&str>| TrackRow {
            track,
            sub_group: sub_group.map(str::to_string),
            status: match resolver.resolve(track, playlist, sub_group) {
                Some(found) => TrackStatus::Downloaded(found.path),
                None => TrackStatus::NotDownloaded,
            },
        };

        let mut names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        names.sort_unstable();

        let mut items = Vec::new();
        for name in names {
            let tracks = classification.micro_tracks(&playlist.id, name).iter().map(|t| row(*t, Some(name))).collect();
            items.push(ViewItem::SubGroupFolder { name: name.to_string(), tracks });
        }
        for track in classification.residual_tracks(&playlist.id) {
            items.push(ViewItem::Track(row(*track, None)));
        }
        PlaylistView { playlist, items }
    }

    pub fn rows(&self) -> impl Iterator<Item = &TrackRow<'a>> {
        self.items.iter().flat_map(|item| match item {
            ViewItem::SubGroupFolder { tracks, .. } => tracks.iter().collect::<Vec<_>>(),
            ViewItem::Track(row) => vec![row],
        })
    }

    pub fn downloaded_count(&self) -> usize {
        self.rows().filter(|r| r.status.is_downloaded()).count()
    }
}
