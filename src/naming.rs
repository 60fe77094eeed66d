/// The naming module derives the canonical filename of a track. Everything here is pure: the same
/// track and config always produce the same name, and nothing touches the filesystem.
use std::path::{Path, PathBuf};

use crate::common::{sanitize, sanitize_legacy, Track};
use crate::config::{NameOrder, NamingConfig, Numbering};

/// The prefix-independent identity of a track on disk.
pub fn base_name(naming: &NamingConfig, track: &Track) -> String {
    let artists: Vec<String> = track.artist_names().iter().map(|a| sanitize(a)).collect();
    join_parts(naming.name_order, &sanitize(&track.title), &artists.join(", "))
}

fn join_parts(order: NameOrder, title: &str, artists: &str) -> String {
    let parts = match order {
        NameOrder::TrackArtist => [title, artists],
        NameOrder::ArtistTrack => [artists, title],
    };
    parts.iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join("_")
}

pub fn prefix(naming: &NamingConfig, track: &Track, position: Option<usize>, total: Option<usize>) -> String {
    match naming.numbering {
        Numbering::None => String::new(),
        Numbering::ReleaseYear => track.year.clone().unwrap_or_default(),
        Numbering::PlaylistOrder => match (position, total) {
            (Some(position), Some(total)) if position > 0 => {
                let width = total.to_string().len();
                format!("{position:0width$}")
            }
            _ => String::new(),
        },
    }
}

/// Filename without the extension.
pub fn full_filename(naming: &NamingConfig, track: &Track, position: Option<usize>, total: Option<usize>) -> String {
    let base = base_name(naming, track);
    let prefix = prefix(naming, track, position, total);
    if prefix.is_empty() {
        base
    } else {
        format!("{prefix}_{base}")
    }
}

pub fn directory_for(root: &Path, playlist_title: &str, sub_group: Option<&str>) -> PathBuf {
    let mut dir = root.join(sanitize(playlist_title));
    if let Some(sub_group) = sub_group {
        dir.push(sanitize(sub_group));
    }
    dir
}

/// Base names a track may have been saved under by older releases or another name order: artist
/// credits with or without the channel decoration under the stricter legacy sanitizer, or the
/// decorated credits under the current sanitizer. Names in the configured order come first. The
/// current base name is excluded.
pub fn legacy_base_names(naming: &NamingConfig, track: &Track) -> Vec<String> {
    let current = base_name(naming, track);
    let stripped: Vec<String> = track.artist_names().iter().map(|a| sanitize(a)).collect();
    let raw_artists: Vec<String> = track.artists.iter().map(|a| a.name.trim().to_string()).filter(|n| !n.is_empty()).collect();
    let decorated: Vec<String> = raw_artists.iter().map(|a| sanitize(a)).collect();
    let other = match naming.name_order {
        NameOrder::TrackArtist => NameOrder::ArtistTrack,
        NameOrder::ArtistTrack => NameOrder::TrackArtist,
    };

    let mut result: Vec<String> = Vec::new();
    for order in [naming.name_order, other] {
        let names = [
            join_parts(order, &sanitize(&track.title), &stripped.join(", ")),
            sanitize_legacy(&join_parts(order, &track.title, &track.artist_names().join(", "))),
            sanitize_legacy(&join_parts(order, &track.title, &raw_artists.join(", "))),
            join_parts(order, &sanitize(&track.title), &decorated.join(", ")),
        ];
        for name in names {
            if !name.is_empty() && name != current && !result.contains(&name) {
                result.push(name);
            }
        }
    }
    result
}
