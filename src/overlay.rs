//! # Local Overlay Store
//!
//! The user's locally authored songs, persisted as one JSON blob under
//! [`OVERLAY_KEY`] in a [`BlobStore`]. The overlay has the same
//! `{entries, songs}` shape as the baseline catalog and is layered over it
//! with [`crate::catalog::merge`].
//!
//! Loading never fails: a missing, unparseable or partly malformed blob is
//! read as much as possible and the rest is dropped with a warning. Saving is
//! read-modify-write with no locking; concurrent writers race and the last
//! one wins.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::ast::{SearchIndexEntry, SongContent};
use crate::catalog::Catalog;
use crate::error::SheetError;

/// Storage key of the overlay blob
pub const OVERLAY_KEY: &str = "local_content_index";

/// Key-value text storage for the overlay
pub trait BlobStore {
    /// `Ok(None)` when nothing is stored under `key`
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> io::Result<()>;

    /// Where `key` lives, for error messages
    fn location(&self, key: &str) -> PathBuf {
        PathBuf::from(key)
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.location(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Written to a temp file in the same directory, then renamed into place
    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value.as_bytes())?;
        temp.persist(self.location(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn location(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

/// In-process store, for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RefCell<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.blobs.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.blobs.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes the overlay catalog through a [`BlobStore`]
#[derive(Debug)]
pub struct OverlayStore<S> {
    store: S,
}

impl<S: BlobStore> OverlayStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current overlay; empty when absent or unreadable
    pub fn load(&self) -> Catalog {
        let text = match self.store.read(OVERLAY_KEY) {
            Ok(Some(text)) => text,
            Ok(None) => return Catalog::default(),
            Err(e) => {
                warn!(error = %e, "could not read local overlay");
                return Catalog::default();
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(mut root)) => Catalog {
                entries: lenient_entries(root.remove("entries")),
                songs: lenient_songs(root.remove("songs")),
            },
            Ok(_) => {
                warn!("local overlay is not an object, ignoring it");
                Catalog::default()
            }
            Err(e) => {
                warn!(error = %e, "local overlay is not valid JSON, ignoring it");
                Catalog::default()
            }
        }
    }

    /// Replace the stored overlay
    pub fn save(&self, overlay: &Catalog) -> Result<(), SheetError> {
        let json = serde_json::to_string(overlay)?;
        self.store
            .write(OVERLAY_KEY, &json)
            .map_err(|e| SheetError::io(self.store.location(OVERLAY_KEY), e))?;
        debug!(songs = overlay.songs.len(), "saved local overlay");
        Ok(())
    }

    /// Insert or replace one song and persist the result.
    ///
    /// Returns the updated overlay even when the write fails; the failure is
    /// logged.
    pub fn save_song(&self, song: SongContent) -> Catalog {
        let mut overlay = self.load();
        let id = song.frontmatter.id.clone();
        overlay.upsert_song(song);
        if let Err(e) = self.save(&overlay) {
            warn!(song = %id, error = %e, "could not persist local overlay");
        }
        overlay
    }
}

/// `entries` if it is an array; elements that are not entries are dropped
fn lenient_entries(value: Option<Value>) -> Vec<SearchIndexEntry> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "dropping malformed overlay entry");
                None
            }
        })
        .collect()
}

/// `songs` if it is an object; values that are not songs are dropped
fn lenient_songs(value: Option<Value>) -> BTreeMap<String, SongContent> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.into_iter()
        .filter_map(|(id, song)| match serde_json::from_value(song) {
            Ok(song) => Some((id, song)),
            Err(e) => {
                warn!(song = %id, error = %e, "dropping malformed overlay song");
                None
            }
        })
        .collect()
}
