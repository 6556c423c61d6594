use crate::error::Error;
use crate::shutdown::ShutdownToken;
use crate::storage::CatalogStore;
use std::time::Duration;
use tracing::{info, warn};

/// Make sure `store` answers before it is used.
///
/// A failed ping starts an unbounded retry loop: reconnect, load the table metadata if it
/// is not cached yet, ping again, and wait `retry_interval` between attempts. The loop
/// only gives up when `shutdown` is triggered, returning `Error::Cancelled`.
pub fn ensure_connected(
    store: &mut dyn CatalogStore,
    shutdown: &ShutdownToken,
    retry_interval: Duration,
) -> Result<(), Error> {
    let first_error = match store.ping() {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!("Catalog unreachable: {}", first_error);

    let mut attempt: u64 = 0;
    loop {
        if shutdown.is_triggered() {
            warn!("Shutdown requested while reconnecting to the catalog");
            return Err(Error::Cancelled);
        }
        attempt += 1;

        match try_reconnect(store) {
            Ok(()) => {
                info!("Catalog connection restored after {} attempt(s)", attempt);
                return Ok(());
            }
            Err(e) => warn!(
                "Reconnect attempt {} failed: {}; retrying in {}s",
                attempt,
                e,
                retry_interval.as_secs()
            ),
        }

        if !shutdown.sleep(retry_interval) {
            warn!("Shutdown requested while reconnecting to the catalog");
            return Err(Error::Cancelled);
        }
    }
}

fn try_reconnect(store: &mut dyn CatalogStore) -> Result<(), Error> {
    store.reconnect()?;
    if !store.has_table_meta() {
        store.load_table_meta()?;
    }
    store.ping()
}
