pub mod audio;

pub use audio::AudioContentHasher;

use crate::error::Error;
use std::path::Path;

/// Computes the path-independent identity of an audio file.
pub trait ContentHasher: Send {
    /// Hex digest of the file's audio content.
    fn compute(&self, path: &Path) -> Result<String, Error>;

    /// Persist `hash` into the file's reserved tag slot.
    fn store_in_tag(&self, path: &Path, hash: &str) -> Result<(), Error>;
}
