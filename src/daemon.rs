use crate::cleanup;
use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::{LogReporter, ProgressReporter};
use crate::queue::WorkQueue;
use crate::reconcile::{Outcome, Reconciler};
use crate::scanner::{self, is_mp3, PathFilter, ScanStats};
use crate::shutdown::ShutdownToken;
use crate::storage::models::{now_timestamp, split_location};
use crate::storage::CatalogStore;
use crate::supervisor;
use crate::watcher::{ChangeNotifier, EventRouter};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Result of a full scan, including the cleanup sweep when it ran.
#[derive(Debug, Clone)]
pub struct FullScanResult {
    pub stats: ScanStats,
    /// `lastseen` threshold captured before the walk started.
    pub watermark: String,
    /// `None` when cleanup was disabled or skipped.
    pub removed_stale: Option<usize>,
}

/// Everything the engine needs, owned by the daemon-loop flow. Only the work queue and the
/// deletion sender are handed to the notifier thread.
pub struct Daemon {
    config: AppConfig,
    store: Box<dyn CatalogStore>,
    reconciler: Reconciler,
    filter: PathFilter,
    queue: Arc<WorkQueue>,
    deletions_tx: Sender<PathBuf>,
    deletions_rx: Receiver<PathBuf>,
    shutdown: ShutdownToken,
    reporter: Box<dyn ProgressReporter>,
}

impl Daemon {
    pub fn new(
        config: AppConfig,
        store: Box<dyn CatalogStore>,
        reconciler: Reconciler,
        shutdown: ShutdownToken,
    ) -> Self {
        let filter = PathFilter::new(&config.ignore_patterns);
        let (deletions_tx, deletions_rx) = mpsc::channel();
        Self {
            config,
            store,
            reconciler,
            filter,
            queue: Arc::new(WorkQueue::new()),
            deletions_tx,
            deletions_rx,
            shutdown,
            reporter: Box::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    pub fn queue(&self) -> Arc<WorkQueue> {
        Arc::clone(&self.queue)
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Router feeding this daemon's queue and deletion channel.
    pub fn event_router(&self) -> EventRouter {
        EventRouter::new(
            Arc::clone(&self.queue),
            self.deletions_tx.clone(),
            self.filter.clone(),
        )
    }

    pub fn start_notifier(&self) -> Result<ChangeNotifier, Error> {
        ChangeNotifier::start(&self.config.root_dir, self.event_router())
    }

    /// Connectivity check followed by reconciliation of one file.
    pub fn sync_file(&mut self, file: &Path) -> Result<Outcome, Error> {
        let (dir, filename) = split_location(file)
            .ok_or_else(|| Error::Other(format!("Not a file path: {}", file.display())))?;
        supervisor::ensure_connected(
            self.store.as_mut(),
            &self.shutdown,
            self.config.reconnect_interval(),
        )?;
        self.reconciler
            .reconcile(self.store.as_ref(), Path::new(&dir), &filename)
    }

    /// Walk `dir`, reconciling every `.mp3` file synchronously.
    pub fn scan_dir(&mut self, dir: &Path) -> ScanStats {
        let filter = self.filter.clone();
        let shutdown = self.shutdown.clone();
        let reporter = std::mem::replace(&mut self.reporter, Box::new(LogReporter));
        let progress_interval = self.config.progress_interval;

        let stats = scanner::traverse(
            dir,
            &filter,
            &shutdown,
            reporter.as_ref(),
            progress_interval,
            |path| self.sync_file(path),
        );

        self.reporter = reporter;
        stats
    }

    /// Full scan of the root, then the cleanup sweep when cleanup mode is on and the scan
    /// ran to completion without per-file failures.
    pub fn full_scan(&mut self) -> Result<FullScanResult, Error> {
        let watermark = now_timestamp();
        let root = self.config.root_dir.clone();
        info!("Full scan of {} started at {}", root.display(), watermark);

        let stats = self.scan_dir(&root);

        let removed_stale = if !self.config.cleanup {
            None
        } else if stats.interrupted {
            warn!("Scan was interrupted, skipping cleanup");
            None
        } else if stats.failed > 0 {
            // Rows of files that failed were not touched and would be swept while the
            // files still exist.
            warn!("{} file(s) failed during the scan, skipping cleanup", stats.failed);
            None
        } else {
            supervisor::ensure_connected(
                self.store.as_mut(),
                &self.shutdown,
                self.config.reconnect_interval(),
            )?;
            Some(cleanup::sweep_stale(self.store.as_ref(), &watermark)?)
        };

        Ok(FullScanResult {
            stats,
            watermark,
            removed_stale,
        })
    }

    /// Optional full scan and cleanup, after which computed hashes may be written back
    /// into tags.
    pub fn startup(&mut self) -> Result<Option<FullScanResult>, Error> {
        let result = if self.config.full_scan {
            Some(self.full_scan()?)
        } else {
            None
        };
        if self.config.write_hash_tags {
            self.reconciler.set_persist_hashes(true);
            debug!("Hash tag persistence enabled");
        }
        Ok(result)
    }

    /// Apply every pending deletion. Returns the number of rows removed.
    pub fn apply_deletions(&mut self) -> Result<usize, Error> {
        let mut removed = 0;
        while let Ok(path) = self.deletions_rx.try_recv() {
            let Some((dir, filename)) = split_location(&path) else {
                continue;
            };
            supervisor::ensure_connected(
                self.store.as_mut(),
                &self.shutdown,
                self.config.reconnect_interval(),
            )?;
            match self.store.delete_by_location(&dir, &filename) {
                Ok(0) => debug!("No row for deleted {}", path.display()),
                Ok(deleted) => {
                    info!("Removed {} row(s) for deleted {}", deleted, path.display());
                    removed += deleted;
                }
                Err(e) => error!("Failed to remove row for {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }

    /// Process one dequeued path. Directories are traversed, `.mp3` files reconciled,
    /// anything else skipped. Failures are logged and the item dropped.
    pub fn process_item(&mut self, path: &Path) -> Result<(), Error> {
        if path.is_dir() {
            self.scan_dir(path);
            return Ok(());
        }
        if !is_mp3(path) {
            debug!("Skipping non-mp3 {}", path.display());
            return Ok(());
        }
        match self.sync_file(path) {
            Ok(outcome) if outcome.is_write() => {
                debug!("{} -> {:?}", path.display(), outcome);
                Ok(())
            }
            Ok(_) => {
                trace!("{} unchanged", path.display());
                Ok(())
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) if e.is_per_file() => {
                warn!("Skipping {}: {}", path.display(), e);
                Ok(())
            }
            Err(e) => {
                error!("Failed to reconcile {}: {}", path.display(), e);
                Ok(())
            }
        }
    }

    /// Drain the work queue one item at a time. Returns the number of items taken.
    pub fn drain_queue(&mut self) -> Result<usize, Error> {
        let mut taken = 0;
        while !self.shutdown.is_triggered() {
            self.apply_deletions()?;
            let Some(path) = self.queue.pop() else {
                break;
            };
            taken += 1;
            self.process_item(&path)?;
        }
        Ok(taken)
    }

    /// Drain, sleep when idle, repeat until shutdown. The notifier, if any, is stopped on
    /// the way out whatever the reason.
    pub fn run(&mut self, notifier: Option<ChangeNotifier>) -> Result<(), Error> {
        info!("Entering daemon loop");
        let result = self.run_loop();

        if let Some(notifier) = notifier {
            notifier.stop();
        }
        match result {
            Ok(()) | Err(Error::Cancelled) => {
                info!("Daemon loop stopped");
                Ok(())
            }
            Err(e) => {
                error!("Daemon loop failed: {}", e);
                self.shutdown.trigger();
                Err(e)
            }
        }
    }

    fn run_loop(&mut self) -> Result<(), Error> {
        let idle = self.config.idle_interval();
        while !self.shutdown.is_triggered() {
            let taken = self.drain_queue()?;
            if taken > 0 {
                debug!("Drained {} queued item(s)", taken);
            }
            self.shutdown.sleep(idle);
        }
        Ok(())
    }
}
