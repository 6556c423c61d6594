pub mod cleanup;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod queue;
pub mod reconcile;
pub mod scanner;
pub mod shutdown;
pub mod signals;
pub mod storage;
pub mod supervisor;
pub mod tags;
pub mod watcher;

pub use config::AppConfig;
pub use daemon::{Daemon, FullScanResult};
pub use error::Error;
pub use progress::{LogReporter, ProgressReporter, SilentReporter};
pub use queue::WorkQueue;
pub use reconcile::{Outcome, ReconcileOptions, Reconciler};
pub use scanner::ScanStats;
pub use shutdown::ShutdownToken;
