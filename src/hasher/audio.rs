use super::ContentHasher;
use crate::error::Error;
use crate::tags::HASH_TAG_SLOT;
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::id3::v2::Id3v2Tag;
use lofty::mpeg::MpegFile;
use lofty::tag::TagExt;
use std::fs::{self, File};
use std::io;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, trace};

const ID3V2_HEADER_LEN: usize = 10;
const ID3V1_TAG_LEN: usize = 128;

/// Hashes the MPEG audio payload with BLAKE3, leaving out the leading ID3v2 tag and the
/// trailing ID3v1 block. Rewriting tags therefore never changes the digest.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioContentHasher;

impl AudioContentHasher {
    pub fn new() -> Self {
        AudioContentHasher
    }
}

impl ContentHasher for AudioContentHasher {
    fn compute(&self, path: &Path) -> Result<String, Error> {
        let data = read_full_file(path)?;
        let hash = hash_audio(&data);
        trace!("Hashed {} -> {}", path.display(), hash);
        Ok(hash)
    }

    fn store_in_tag(&self, path: &Path, hash: &str) -> Result<(), Error> {
        let tag_error = |e: lofty::error::LoftyError| Error::Tag {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut file = File::open(path)?;
        let mpeg = MpegFile::read_from(&mut file, ParseOptions::new()).map_err(tag_error)?;
        drop(file);

        let mut tag = mpeg.id3v2().cloned().unwrap_or_else(Id3v2Tag::new);
        tag.insert_user_text(HASH_TAG_SLOT.to_string(), hash.to_string());
        tag.save_to_path(path, WriteOptions::default())
            .map_err(tag_error)?;
        debug!("Stored content hash in tag of {}", path.display());
        Ok(())
    }
}

pub fn read_full_file(file: &Path) -> io::Result<Vec<u8>> {
    fs::read(file)
}

/// Lowercase hex BLAKE3 digest of the audio payload of `data`.
pub fn hash_audio(data: &[u8]) -> String {
    let range = audio_payload(data);
    blake3::hash(&data[range]).to_hex().to_string()
}

/// Byte range of `data` that holds audio frames.
pub fn audio_payload(data: &[u8]) -> Range<usize> {
    let start = id3v2_len(data).min(data.len());
    let mut end = data.len();
    if end >= start + ID3V1_TAG_LEN && &data[end - ID3V1_TAG_LEN..end - ID3V1_TAG_LEN + 3] == b"TAG"
    {
        end -= ID3V1_TAG_LEN;
    }
    start..end
}

/// Total length of a leading ID3v2 tag (header, body and optional footer), or 0.
pub fn id3v2_len(data: &[u8]) -> usize {
    if data.len() < ID3V2_HEADER_LEN || &data[..3] != b"ID3" {
        return 0;
    }
    let flags = data[5];
    let size = data[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7f));
    let footer = if flags & 0x10 != 0 { ID3V2_HEADER_LEN } else { 0 };
    ID3V2_HEADER_LEN + size + footer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id3v2_block(body_len: usize) -> Vec<u8> {
        let mut block = b"ID3\x04\x00\x00".to_vec();
        let size = body_len as u32;
        block.extend_from_slice(&[
            ((size >> 21) & 0x7f) as u8,
            ((size >> 14) & 0x7f) as u8,
            ((size >> 7) & 0x7f) as u8,
            (size & 0x7f) as u8,
        ]);
        block.extend(std::iter::repeat(0xAB).take(body_len));
        block
    }

    fn id3v1_block(title: &str) -> Vec<u8> {
        let mut block = b"TAG".to_vec();
        block.extend_from_slice(title.as_bytes());
        block.resize(ID3V1_TAG_LEN, 0);
        block
    }

    #[test]
    fn test_id3v2_len_synchsafe() {
        let block = id3v2_block(300);
        assert_eq!(id3v2_len(&block), 310);
        assert_eq!(id3v2_len(b"\xff\xfb\x90\x00"), 0);
    }

    #[test]
    fn test_hash_ignores_tags() {
        let audio = vec![0xFFu8, 0xFB, 0x90, 0x00, 1, 2, 3, 4, 5, 6];

        let bare = hash_audio(&audio);

        let mut tagged = id3v2_block(64);
        tagged.extend_from_slice(&audio);
        tagged.extend(id3v1_block("some title"));

        let mut retagged = id3v2_block(512);
        retagged.extend_from_slice(&audio);

        assert_eq!(bare, hash_audio(&tagged));
        assert_eq!(bare, hash_audio(&retagged));
    }

    #[test]
    fn test_hash_tracks_audio_changes() {
        let a = vec![0xFFu8, 0xFB, 0x90, 0x00, 1, 2, 3];
        let b = vec![0xFFu8, 0xFB, 0x90, 0x00, 1, 2, 4];
        assert_ne!(hash_audio(&a), hash_audio(&b));
        assert_eq!(hash_audio(&a).len(), 64);
    }

    #[test]
    fn test_compute_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.mp3");
        fs::write(&path, [0xFFu8, 0xFB, 0x90, 0x00, 9, 9]).unwrap();
        let hasher = AudioContentHasher::new();
        assert_eq!(
            hasher.compute(&path).unwrap(),
            hash_audio(&[0xFF, 0xFB, 0x90, 0x00, 9, 9])
        );
        assert!(hasher.compute(&dir.path().join("missing.mp3")).is_err());
    }
}
