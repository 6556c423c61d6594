use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Tag error for {path}: {message}")]
    Tag { path: PathBuf, message: String },

    #[error("Hash error for {path}: {message}")]
    Hash { path: PathBuf, message: String },

    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Root directory {0} does not exist or is not a directory")]
    InvalidRoot(PathBuf),

    #[error("Catalog table '{0}' is missing or incomplete")]
    MissingTable(String),

    #[error("Log destination {path} cannot be opened: {message}")]
    LogDestination { path: PathBuf, message: String },

    #[error("Operation cancelled by shutdown")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Failures confined to one file: logged and skipped, never fatal.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Tag { .. } | Error::Hash { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_classification() {
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_per_file());

        let tag = Error::Tag {
            path: PathBuf::from("/music/a.mp3"),
            message: "bad frame".to_string(),
        };
        assert!(tag.is_per_file());

        assert!(!Error::Cancelled.is_per_file());
        assert!(!Error::MissingTable("songs".to_string()).is_per_file());
    }
}
