use crate::error::Error;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DATABASE_PATH: &str = "music_index.db";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Root of the music tree to index and watch.
    pub root_dir: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Walk the whole tree at startup before draining events.
    #[serde(default)]
    pub full_scan: bool,
    /// Touch `lastseen` on unchanged files and sweep stale rows after a full scan.
    #[serde(default)]
    pub cleanup: bool,
    /// Persist computed hashes into the file's tag once the startup scan is over.
    #[serde(default)]
    pub write_hash_tags: bool,
    #[serde(default = "default_true")]
    pub watch: bool,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_idle_interval_secs")]
    pub idle_interval_secs: u64,
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_true() -> bool {
    true
}

fn default_idle_interval_secs() -> u64 {
    5
}

fn default_reconnect_interval_secs() -> u64 {
    20
}

fn default_progress_interval() -> usize {
    100
}

impl AppConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            database_path: default_database_path(),
            log_file: None,
            full_scan: false,
            cleanup: false,
            write_hash_tags: false,
            watch: true,
            ignore_patterns: Vec::new(),
            idle_interval_secs: default_idle_interval_secs(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
            progress_interval: default_progress_interval(),
        }
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    /// The root must be an existing directory before any background work starts.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.root_dir.is_dir() {
            return Err(Error::InvalidRoot(self.root_dir.clone()));
        }
        Ok(())
    }
}

/// Layered load: `Config.toml` (or `path`) first, then `INDEXER_*` environment variables.
/// `root_override` wins over both, so a root given on the command line needs no file.
pub fn load_configuration(
    path: Option<&Path>,
    root_override: Option<&Path>,
) -> Result<AppConfig, ConfigError> {
    let file_source = match path {
        Some(p) => ConfigFile::from(p).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(
            Environment::with_prefix("INDEXER")
                .list_separator(",")
                .with_list_parse_key("ignore_patterns")
                .try_parsing(true),
        )
        .set_override_option(
            "root_dir",
            root_override.map(|root| root.to_string_lossy().into_owned()),
        )?
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
