use chrono::Local;
use std::fmt;
use std::path::Path;

/// Format shared by `lastupdate`, `lastseen` and the scan watermark.
/// Lexicographic order of these strings equals chronological order, except across a
/// backward clock change (end of daylight saving): rows stamped in the repeated hour can
/// sort before a watermark taken earlier and be swept by cleanup.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time at second precision.
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitrateClass {
    #[default]
    Constant,
    Variable,
}

impl BitrateClass {
    pub fn as_code(self) -> &'static str {
        match self {
            BitrateClass::Constant => "C",
            BitrateClass::Variable => "V",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "V" => BitrateClass::Variable,
            _ => BitrateClass::Constant,
        }
    }
}

impl fmt::Display for BitrateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// One row of the `songs` table. `id` is 0 for a candidate that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongRecord {
    pub id: i64,
    /// Directory containing the file.
    pub path: String,
    pub filename: String,
    pub content_hash: String,
    pub artist: String,
    pub title: String,
    pub album: String,
    pub genre: String,
    pub trackno: String,
    pub year: i64,
    /// Kilobits per second.
    pub bitrate: i64,
    /// Seconds.
    pub length: f64,
    pub samplerate: i64,
    pub bitrate_class: BitrateClass,
    /// Epoch seconds.
    pub mtime: f64,
    pub size: i64,
    pub lastupdate: String,
    pub lastseen: String,
}

impl SongRecord {
    pub fn same_location(&self, other: &SongRecord) -> bool {
        self.path == other.path && self.filename == other.filename
    }

    pub fn full_path(&self) -> std::path::PathBuf {
        Path::new(&self.path).join(&self.filename)
    }
}

/// Split a file path into the `(path, filename)` pair stored in the catalog.
pub fn split_location(file: &Path) -> Option<(String, String)> {
    let parent = file.parent()?;
    let name = file.file_name()?;
    Some((
        parent.to_string_lossy().into_owned(),
        name.to_string_lossy().into_owned(),
    ))
}
