use crate::scanner::ScanStats;
use std::path::Path;
use tracing::info;

/// Trait for reporting traversal progress.
///
/// The daemon logs through `LogReporter`; tests may supply their own.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send {
    fn on_scan_start(&self, _root: &Path) {}
    fn on_scan_progress(&self, _files_processed: usize, _current_path: &Path) {}
    fn on_scan_complete(&self, _stats: &ScanStats) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Reports progress through `tracing` at info level.
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn on_scan_start(&self, root: &Path) {
        info!("Scanning {}", root.display());
    }

    fn on_scan_progress(&self, files_processed: usize, current_path: &Path) {
        info!(
            "{} files processed (at {})",
            files_processed,
            current_path.display()
        );
    }

    fn on_scan_complete(&self, stats: &ScanStats) {
        info!(
            "Scan finished in {:.2}s: {} seen, {} inserted, {} updated, {} moved, {} touched, {} unchanged, {} failed{}",
            stats.duration.as_secs_f64(),
            stats.files_seen,
            stats.inserted,
            stats.updated,
            stats.moved,
            stats.touched,
            stats.unchanged,
            stats.failed,
            if stats.interrupted { " (interrupted)" } else { "" },
        );
    }
}
