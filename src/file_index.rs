/// The file index is a point-in-time picture of which `.mp3` files sit in which directory under
/// the download root. It is never patched in place: a rebuild produces a new index which is then
/// swapped in whole, so readers holding the previous snapshot keep a consistent view.
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const AUDIO_EXTENSION: &str = "mp3";

static EMPTY: BTreeSet<String> = BTreeSet::new();

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndex {
    root: PathBuf,
    directories: HashMap<PathBuf, BTreeSet<String>>,
}

impl FileIndex {
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        FileIndex { root: root.into(), directories: HashMap::new() }
    }

    /// Walk `root` and record every directory holding at least one `.mp3` file. A missing root
    /// gives an empty index.
    pub fn build(root: &Path) -> Self {
        let mut index = FileIndex::empty(root);
        if root.as_os_str().is_empty() || !root.is_dir() {
            debug!("download root {} does not exist, index is empty", root.display());
            return index;
        }

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(AUDIO_EXTENSION) {
                continue;
            }
            let (Some(dir), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) else {
                continue;
            };
            index.directories.entry(dir.to_path_buf()).or_default().insert(name.to_string());
        }

        info!("indexed {} audio files in {} directories under {}", index.file_count(), index.directory_count(), root.display());
        index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filenames recorded for `directory`, sorted. Does not touch the disk.
    pub fn files_in(&self, directory: &Path) -> &BTreeSet<String> {
        self.directories.get(directory).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, path: &Path) -> bool {
        match (path.parent(), path.file_name().and_then(|n| n.to_str())) {
            (Some(dir), Some(name)) => self.files_in(dir).contains(name),
            _ => false,
        }
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn file_count(&self) -> usize {
        self.directories.values().map(BTreeSet::len).sum()
    }
}

/// Holder for the current index snapshot.
#[derive(Debug, Default)]
pub struct SharedFileIndex {
    current: RwLock<Arc<FileIndex>>,
}

impl SharedFileIndex {
    pub fn new(index: FileIndex) -> Self {
        SharedFileIndex { current: RwLock::new(Arc::new(index)) }
    }

    /// The snapshot every query in one batch should read from.
    pub fn snapshot(&self) -> Arc<FileIndex> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, index: FileIndex) -> Arc<FileIndex> {
        let index = Arc::new(index);
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&index),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&index),
        }
        index
    }

    /// Scan `root` without holding the lock, then swap the result in.
    pub fn rebuild(&self, root: &Path) -> Arc<FileIndex> {
        self.replace(FileIndex::build(root))
    }
}
