use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::WalkDir;

const MP3_EXTENSION: &str = "mp3";

/// Case-insensitive `.mp3` check on the path's extension.
pub fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(MP3_EXTENSION))
        .unwrap_or(false)
}

/// Glob ignore list applied to both traversal and notifier events.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    ignore_patterns: Vec<Pattern>,
}

impl PathFilter {
    pub fn new(ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        Self { ignore_patterns }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }

    /// A path worth reconciling: `.mp3` and not ignored.
    pub fn accepts(&self, path: &Path) -> bool {
        is_mp3(path) && !self.is_ignored(path)
    }
}

/// Lazily enumerate every accepted `.mp3` file under `root`. Symlinks are not followed;
/// unreadable entries are logged and skipped.
pub fn mp3_files<'a>(root: &Path, filter: &'a PathFilter) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| !filter.is_ignored(entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Error walking directory: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_mp3(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_mp3_case_insensitive() {
        assert!(is_mp3(Path::new("/m/a.mp3")));
        assert!(is_mp3(Path::new("/m/a.MP3")));
        assert!(!is_mp3(Path::new("/m/a.flac")));
        assert!(!is_mp3(Path::new("/m/mp3")));
    }

    #[test]
    fn test_mp3_files_recurses_and_filters() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join("skip")).unwrap();
        fs::write(root.join("top.mp3"), b"x").unwrap();
        fs::write(root.join("a/b/deep.Mp3"), b"x").unwrap();
        fs::write(root.join("a/cover.jpg"), b"x").unwrap();
        fs::write(root.join("skip/hidden.mp3"), b"x").unwrap();

        let filter = PathFilter::new(&["**/skip".to_string()]);
        let mut found: Vec<PathBuf> = mp3_files(root, &filter).collect();
        found.sort();

        assert_eq!(found, vec![root.join("a/b/deep.Mp3"), root.join("top.mp3")]);
    }

    #[test]
    fn test_invalid_glob_is_dropped() {
        let filter = PathFilter::new(&["[".to_string()]);
        assert!(!filter.is_ignored(Path::new("/m/a.mp3")));
        assert!(filter.accepts(Path::new("/m/a.mp3")));
    }
}
