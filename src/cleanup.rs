use crate::error::Error;
use crate::storage::CatalogStore;
use tracing::info;

/// Delete every row whose `lastseen` predates `watermark`, the timestamp taken when the
/// preceding full scan started.
///
/// Only valid right after a complete scan in cleanup mode: every file the scan met had
/// its `lastseen` refreshed, so anything older was not found.
pub fn sweep_stale(store: &dyn CatalogStore, watermark: &str) -> Result<usize, Error> {
    let removed = store.delete_seen_before(watermark)?;
    info!("Cleanup removed {} stale row(s) last seen before {}", removed, watermark);
    Ok(removed)
}
