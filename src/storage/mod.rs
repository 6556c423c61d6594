pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{BitrateClass, SongRecord};
pub use sqlite::SqliteCatalog;

use crate::error::Error;

/// Table the catalog lives in.
pub const SONGS_TABLE: &str = "songs";

/// The relational catalog as seen by the engine.
///
/// Every write takes the timestamp to stamp into `lastupdate`/`lastseen`, so callers
/// control the clock. Only the daemon-loop flow holds a store; implementations need not
/// be `Sync`.
pub trait CatalogStore: Send {
    /// Trivial round trip used by the connectivity supervisor.
    fn ping(&self) -> Result<(), Error>;

    /// Drop the current connection and open a new one.
    fn reconnect(&mut self) -> Result<(), Error>;

    fn has_table_meta(&self) -> bool;

    /// Read and cache the column layout of the songs table.
    fn load_table_meta(&mut self) -> Result<(), Error>;

    /// All rows carrying `content_hash`, in store order.
    fn find_by_hash(&self, content_hash: &str) -> Result<Vec<SongRecord>, Error>;

    /// Rows at exactly `(path, filename)`, in store order.
    fn find_by_location(&self, path: &str, filename: &str) -> Result<Vec<SongRecord>, Error>;

    /// Insert `song`, returning the store-assigned id.
    fn insert(&self, song: &SongRecord, now: &str) -> Result<i64, Error>;

    /// Overwrite every column of row `id` with `song`.
    fn update(&self, id: i64, song: &SongRecord, now: &str) -> Result<(), Error>;

    /// Refresh `lastseen` only.
    fn touch_last_seen(&self, id: i64, now: &str) -> Result<(), Error>;

    /// Delete rows at exactly `(path, filename)`.
    fn delete_by_location(&self, path: &str, filename: &str) -> Result<usize, Error>;

    /// Delete rows whose `lastseen` is strictly earlier than `watermark`.
    fn delete_seen_before(&self, watermark: &str) -> Result<usize, Error>;

    fn count(&self) -> Result<i64, Error>;
}
