pub mod walk;

pub use walk::{is_mp3, mp3_files, PathFilter};

use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::reconcile::Outcome;
use crate::shutdown::ShutdownToken;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// Counters for one traversal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStats {
    pub files_seen: usize,
    pub processed: usize,
    pub failed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub moved: usize,
    pub touched: usize,
    pub unchanged: usize,
    /// Shutdown was observed before the walk finished.
    pub interrupted: bool,
    pub duration: Duration,
}

impl ScanStats {
    pub fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Inserted(_) => self.inserted += 1,
            Outcome::Updated(_) => self.updated += 1,
            Outcome::Moved(_) => self.moved += 1,
            Outcome::Touched(_) => self.touched += 1,
            Outcome::Unchanged(_) => self.unchanged += 1,
        }
    }
}

/// Walk `root` and hand every accepted `.mp3` file to `visit`, one at a time.
///
/// The shutdown token is checked between files; a triggered token ends the walk early
/// with `interrupted` set. Per-file failures are logged and counted, never propagated.
/// A `Cancelled` error from `visit` also ends the walk.
pub fn traverse<F>(
    root: &Path,
    filter: &PathFilter,
    shutdown: &ShutdownToken,
    reporter: &dyn ProgressReporter,
    progress_interval: usize,
    mut visit: F,
) -> ScanStats
where
    F: FnMut(&Path) -> Result<Outcome, Error>,
{
    let started = Instant::now();
    let mut stats = ScanStats::default();
    reporter.on_scan_start(root);

    for path in mp3_files(root, filter) {
        if shutdown.is_triggered() {
            stats.interrupted = true;
            break;
        }
        stats.files_seen += 1;

        match visit(&path) {
            Ok(outcome) => stats.record(&outcome),
            Err(Error::Cancelled) => {
                stats.interrupted = true;
                break;
            }
            Err(e) if e.is_per_file() => {
                stats.failed += 1;
                warn!("Skipping {}: {}", path.display(), e);
            }
            Err(e) => {
                stats.failed += 1;
                error!("Failed to reconcile {}: {}", path.display(), e);
            }
        }

        if progress_interval > 0 && stats.files_seen % progress_interval == 0 {
            reporter.on_scan_progress(stats.files_seen, &path);
        }
    }

    stats.duration = started.elapsed();
    reporter.on_scan_complete(&stats);
    stats
}
