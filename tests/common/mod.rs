#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use music_indexer::hasher::ContentHasher;
use music_indexer::storage::SqliteCatalog;
use music_indexer::tags::{AudioTags, TagReader};
use music_indexer::{
    AppConfig, Daemon, Error, ReconcileOptions, Reconciler, ShutdownToken, SilentReporter,
};

/// Tags derived from the file name so rows are easy to tell apart.
pub struct NameTags;

impl TagReader for NameTags {
    fn read(&self, path: &Path) -> Result<AudioTags, Error> {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(AudioTags {
            title,
            artist: "Test Artist".to_string(),
            bitrate: 192,
            samplerate: 44100,
            ..AudioTags::default()
        })
    }
}

/// `NameTags` that can be switched to fail every read.
#[derive(Clone, Default)]
pub struct SwitchableTags {
    pub failing: Arc<AtomicBool>,
}

impl SwitchableTags {
    pub fn fail_from_now_on(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl TagReader for SwitchableTags {
    fn read(&self, path: &Path) -> Result<AudioTags, Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Tag {
                path: path.to_path_buf(),
                message: "unreadable frame".to_string(),
            });
        }
        NameTags.read(path)
    }
}

/// Hashes the whole file and counts tag writes.
#[derive(Clone, Default)]
pub struct BytesHasher {
    pub stored: Arc<AtomicUsize>,
}

impl BytesHasher {
    pub fn stored_count(&self) -> usize {
        self.stored.load(Ordering::SeqCst)
    }
}

impl ContentHasher for BytesHasher {
    fn compute(&self, path: &Path) -> Result<String, Error> {
        let data = fs::read(path)?;
        Ok(blake3::hash(&data).to_hex().to_string())
    }

    fn store_in_tag(&self, _path: &Path, _hash: &str) -> Result<(), Error> {
        self.stored.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn hash_of(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

pub fn write_song(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Push the file's modification time into the future without touching its bytes.
pub fn bump_mtime(path: &Path) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
}

/// Layout:
///   root/
///     rock/
///       one.mp3      ("song one")
///       two.mp3      ("song two")
///     jazz/
///       three.MP3    ("song three")
///       notes.txt
pub fn create_music_tree(root: &Path) {
    write_song(&root.join("rock"), "one.mp3", b"song one");
    write_song(&root.join("rock"), "two.mp3", b"song two");
    write_song(&root.join("jazz"), "three.MP3", b"song three");
    write_song(&root.join("jazz"), "notes.txt", b"not audio");
}

pub fn test_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::new(root);
    config.idle_interval_secs = 0;
    config.reconnect_interval_secs = 0;
    config
}

pub fn test_daemon(config: AppConfig) -> (Daemon, BytesHasher) {
    test_daemon_with_tags(config, Box::new(NameTags))
}

pub fn test_daemon_with_tags(
    config: AppConfig,
    tags: Box<dyn TagReader>,
) -> (Daemon, BytesHasher) {
    let hasher = BytesHasher::default();
    let reconciler = Reconciler::new(
        tags,
        Box::new(hasher.clone()),
        ReconcileOptions {
            cleanup: config.cleanup,
            persist_hashes: false,
        },
    );
    let store = SqliteCatalog::open_in_memory().unwrap();
    let daemon = Daemon::new(config, Box::new(store), reconciler, ShutdownToken::new())
        .with_reporter(Box::new(SilentReporter));
    (daemon, hasher)
}
