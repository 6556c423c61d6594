//! Hash-keyed reconciliation of one observed file against the catalog.
//!
//! A file's identity is its content hash, not its location. For each observed file the
//! engine looks at every stored row carrying the same hash, in store order, and stops at
//! the first one it can account for:
//!
//! * same `(path, filename)`: an in-place edit when the file is newer, otherwise a
//!   liveness touch (cleanup mode) or nothing;
//! * the row's own file has vanished from disk: the file was moved here, so the row
//!   follows it;
//! * otherwise the row describes another live copy and the search continues.
//!
//! When no row accounts for the file, a row at the same location (left behind by an edit
//! that changed the hash) is treated like a same-location match. Otherwise a new row is
//! inserted.

use crate::error::Error;
use crate::hasher::ContentHasher;
use crate::storage::models::now_timestamp;
use crate::storage::{CatalogStore, SongRecord};
use crate::tags::TagReader;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// What reconciliation did to the catalog. Each variant carries the affected row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted(i64),
    /// Same location, newer file: every column rewritten.
    Updated(i64),
    /// Row re-pointed at the file's new location.
    Moved(i64),
    /// Only `lastseen` refreshed.
    Touched(i64),
    /// Matching row left as is.
    Unchanged(i64),
}

impl Outcome {
    pub fn row_id(&self) -> i64 {
        match *self {
            Outcome::Inserted(id)
            | Outcome::Updated(id)
            | Outcome::Moved(id)
            | Outcome::Touched(id)
            | Outcome::Unchanged(id) => id,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Outcome::Unchanged(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Touch `lastseen` on unchanged files so the cleanup sweep keeps them.
    pub cleanup: bool,
    /// Write freshly computed hashes back into the file's tag.
    pub persist_hashes: bool,
}

pub struct Reconciler {
    tags: Box<dyn TagReader>,
    hasher: Box<dyn ContentHasher>,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(
        tags: Box<dyn TagReader>,
        hasher: Box<dyn ContentHasher>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            tags,
            hasher,
            options,
        }
    }

    pub fn set_persist_hashes(&mut self, enabled: bool) {
        self.options.persist_hashes = enabled;
    }

    /// Build the candidate row for `dir/filename` from the filesystem and its tags.
    pub fn build_candidate(&self, dir: &Path, filename: &str) -> Result<SongRecord, Error> {
        let full_path = dir.join(filename);
        let metadata = fs::metadata(&full_path)?;
        let tags = self.tags.read(&full_path)?;

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let content_hash = match tags.stored_hash {
            Some(hash) => hash,
            None => {
                let hash = self.hasher.compute(&full_path).map_err(|e| match e {
                    Error::Io(io) => Error::Hash {
                        path: full_path.clone(),
                        message: io.to_string(),
                    },
                    other => other,
                })?;
                if self.options.persist_hashes {
                    // A failed write only loses the cache; the hash itself is good.
                    if let Err(e) = self.hasher.store_in_tag(&full_path, &hash) {
                        warn!("Could not store hash in {}: {}", full_path.display(), e);
                    }
                }
                hash
            }
        };

        Ok(SongRecord {
            id: 0,
            path: dir.to_string_lossy().into_owned(),
            filename: filename.to_string(),
            content_hash,
            artist: tags.artist,
            title: tags.title,
            album: tags.album,
            genre: tags.genre,
            trackno: tags.trackno,
            year: tags.year,
            bitrate: tags.bitrate,
            length: tags.length,
            samplerate: tags.samplerate,
            bitrate_class: tags.bitrate_class,
            mtime,
            size: metadata.len() as i64,
            lastupdate: String::new(),
            lastseen: String::new(),
        })
    }

    /// Reconcile `dir/filename` against `store`. Store errors propagate untouched.
    pub fn reconcile(
        &self,
        store: &dyn CatalogStore,
        dir: &Path,
        filename: &str,
    ) -> Result<Outcome, Error> {
        let candidate = self.build_candidate(dir, filename)?;
        self.apply(store, &candidate)
    }

    /// Decide and apply insert / update / move / touch / no-op for an already built
    /// candidate.
    pub fn apply(&self, store: &dyn CatalogStore, candidate: &SongRecord) -> Result<Outcome, Error> {
        let matches = store.find_by_hash(&candidate.content_hash)?;

        for row in &matches {
            if row.same_location(candidate) {
                return self.settle_same_location(store, row, candidate);
            }

            if !row.full_path().exists() {
                store.update(row.id, candidate, &now_timestamp())?;
                info!(
                    "Moved {}/{} -> {}/{} (row {})",
                    row.path, row.filename, candidate.path, candidate.filename, row.id
                );
                return Ok(Outcome::Moved(row.id));
            }
        }

        // No row shares the hash, but one may still sit at this location with the
        // content it had before an edit.
        if let Some(row) = store
            .find_by_location(&candidate.path, &candidate.filename)?
            .into_iter()
            .next()
        {
            return self.settle_same_location(store, &row, candidate);
        }

        let id = store.insert(candidate, &now_timestamp())?;
        info!("Added {}/{} (row {})", candidate.path, candidate.filename, id);
        Ok(Outcome::Inserted(id))
    }

    /// Edit when the file is newer than `row`, otherwise a touch (cleanup mode) or nothing.
    fn settle_same_location(
        &self,
        store: &dyn CatalogStore,
        row: &SongRecord,
        candidate: &SongRecord,
    ) -> Result<Outcome, Error> {
        if candidate.mtime > row.mtime {
            store.update(row.id, candidate, &now_timestamp())?;
            info!("Updated {}/{} (row {})", candidate.path, candidate.filename, row.id);
            return Ok(Outcome::Updated(row.id));
        }
        if self.options.cleanup {
            store.touch_last_seen(row.id, &now_timestamp())?;
            debug!("Touched {}/{} (row {})", row.path, row.filename, row.id);
            return Ok(Outcome::Touched(row.id));
        }
        Ok(Outcome::Unchanged(row.id))
    }
}
