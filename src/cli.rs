use clap::{Parser, Subcommand};
use music_indexer::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "music-indexer")]
#[command(about = "Keeps a catalog of mp3 files in sync with the filesystem", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Music root to index and watch
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Catalog database file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log filter, e.g. `info` or `music_indexer=debug`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Walk the whole tree at startup
    #[arg(long, global = true)]
    pub full_scan: bool,

    /// Refresh liveness of unchanged files and drop stale rows after a full scan
    #[arg(long, global = true)]
    pub cleanup: bool,

    /// Store computed content hashes in the files' tags
    #[arg(long, global = true)]
    pub write_tags: bool,

    /// Do not watch the tree for changes
    #[arg(long, global = true)]
    pub no_watch: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch the music root and keep the catalog in sync (default)
    Run,
    /// Run one full scan and exit
    Scan,
    /// Print the number of catalog rows
    Count,
    /// Print configuration values
    PrintConfig,
}

impl Cli {
    /// Command-line flags take precedence over file and environment values.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(db) = &self.db {
            config.database_path = db.clone();
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        if self.full_scan {
            config.full_scan = true;
        }
        if self.cleanup {
            config.cleanup = true;
        }
        if self.write_tags {
            config.write_hash_tags = true;
        }
        if self.no_watch {
            config.watch = false;
        }
    }
}
