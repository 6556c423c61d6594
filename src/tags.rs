//! Audio metadata extraction.
//!
//! `LoftyTagReader` reads the ID3 fields, MPEG stream properties and the reserved
//! content-hash slot of an MP3 file.

use crate::error::Error;
use crate::hasher::audio::id3v2_len;
use crate::storage::BitrateClass;
use lofty::config::ParseOptions;
use lofty::file::AudioFile;
use lofty::mpeg::MpegFile;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// TXXX description under which the content hash is cached in the file.
pub const HASH_TAG_SLOT: &str = "INDEXER_CONTENT_HASH";

/// How far into the audio stream to look for a Xing/VBRI header.
const VBR_PROBE_LEN: u64 = 4096;

/// Metadata pulled from a file's tags and stream header. Absent text fields are empty,
/// absent numeric fields are 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioTags {
    pub artist: String,
    pub title: String,
    pub album: String,
    pub genre: String,
    pub trackno: String,
    pub year: i64,
    pub bitrate: i64,
    pub length: f64,
    pub samplerate: i64,
    pub bitrate_class: BitrateClass,
    /// Hash cached in the reserved tag slot, if any.
    pub stored_hash: Option<String>,
}

pub trait TagReader: Send {
    fn read(&self, path: &Path) -> Result<AudioTags, Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        LoftyTagReader
    }
}

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<AudioTags, Error> {
        let mut file = File::open(path)?;
        let mpeg = MpegFile::read_from(&mut file, ParseOptions::new()).map_err(|e| Error::Tag {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let properties = mpeg.properties();
        let mut tags = AudioTags {
            bitrate: i64::from(properties.audio_bitrate()),
            length: properties.duration().as_secs_f64(),
            samplerate: i64::from(properties.sample_rate()),
            bitrate_class: probe_bitrate_class(&mut file).unwrap_or_default(),
            ..AudioTags::default()
        };

        tags.stored_hash = mpeg
            .id3v2()
            .and_then(|t| t.get_user_text(HASH_TAG_SLOT))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let generic: Option<Tag> = match (mpeg.id3v2(), mpeg.id3v1()) {
            (Some(v2), _) => Some(v2.clone().into()),
            (None, Some(v1)) => Some(v1.clone().into()),
            (None, None) => None,
        };
        if let Some(tag) = generic {
            fill_text_fields(&mut tags, &tag);
        }

        Ok(tags)
    }
}

fn fill_text_fields(tags: &mut AudioTags, tag: &Tag) {
    tags.artist = tag.artist().map(|s| s.trim().to_string()).unwrap_or_default();
    tags.title = tag.title().map(|s| s.trim().to_string()).unwrap_or_default();
    tags.album = tag.album().map(|s| s.trim().to_string()).unwrap_or_default();
    tags.genre = tag.genre().map(|s| s.trim().to_string()).unwrap_or_default();
    tags.trackno = tag
        .get_string(&ItemKey::TrackNumber)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    tags.year = tag.year().map(i64::from).unwrap_or(0);
}

/// `V` when the first frame carries a Xing or VBRI header, `C` otherwise.
/// An "Info" header marks a CBR stream written by the same encoders.
fn probe_bitrate_class<R: Read + Seek>(reader: &mut R) -> std::io::Result<BitrateClass> {
    let mut head = [0u8; 10];
    reader.seek(SeekFrom::Start(0))?;
    let read = reader.read(&mut head)?;
    let offset = id3v2_len(&head[..read]) as u64;

    reader.seek(SeekFrom::Start(offset))?;
    let mut window = Vec::with_capacity(VBR_PROBE_LEN as usize);
    reader.by_ref().take(VBR_PROBE_LEN).read_to_end(&mut window)?;

    let is_vbr = window
        .windows(4)
        .any(|w| w == b"Xing" || w == b"VBRI");
    Ok(if is_vbr {
        BitrateClass::Variable
    } else {
        BitrateClass::Constant
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_probe_detects_xing_header() {
        let mut data = vec![0xFFu8, 0xFB, 0x90, 0x00];
        data.extend_from_slice(&[0u8; 32]);
        data.extend_from_slice(b"Xing");
        data.extend_from_slice(&[0u8; 64]);
        let class = probe_bitrate_class(&mut Cursor::new(data)).unwrap();
        assert_eq!(class, BitrateClass::Variable);
    }

    #[test]
    fn test_probe_defaults_to_constant() {
        let mut data = vec![0xFFu8, 0xFB, 0x90, 0x00];
        data.extend_from_slice(&[0u8; 32]);
        data.extend_from_slice(b"Info");
        let class = probe_bitrate_class(&mut Cursor::new(data)).unwrap();
        assert_eq!(class, BitrateClass::Constant);
    }

    #[test]
    fn test_probe_skips_id3v2() {
        // A "Xing" inside the ID3v2 body must not count.
        let mut data = b"ID3\x04\x00\x00\x00\x00\x00\x08".to_vec();
        data.extend_from_slice(b"Xing\0\0\0\0");
        data.extend_from_slice(&[0xFFu8, 0xFB, 0x90, 0x00, 0, 0, 0, 0]);
        let class = probe_bitrate_class(&mut Cursor::new(data)).unwrap();
        assert_eq!(class, BitrateClass::Constant);
    }
}
