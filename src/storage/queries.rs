use super::models::{BitrateClass, SongRecord};
use super::sqlite::SqliteCatalog;
use super::CatalogStore;
use crate::error::Error;
use rusqlite::{params, Row};
use tracing::debug;

const SELECT_SONG: &str = "SELECT id, path, filename, content_hash, artist, title, album, genre, \
     trackno, year, bitrate, length, samplerate, bitratecl, mtime, size, lastupdate, lastseen \
     FROM songs";

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<SongRecord> {
    let bitratecl: String = row.get(13)?;
    Ok(SongRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        filename: row.get(2)?,
        content_hash: row.get(3)?,
        artist: row.get(4)?,
        title: row.get(5)?,
        album: row.get(6)?,
        genre: row.get(7)?,
        trackno: row.get(8)?,
        year: row.get(9)?,
        bitrate: row.get(10)?,
        length: row.get(11)?,
        samplerate: row.get(12)?,
        bitrate_class: BitrateClass::from_code(&bitratecl),
        mtime: row.get(14)?,
        size: row.get(15)?,
        lastupdate: row.get(16)?,
        lastseen: row.get(17)?,
    })
}

impl SqliteCatalog {
    pub fn get_song(&self, id: i64) -> Result<Option<SongRecord>, Error> {
        let mut stmt = self
            .connection()
            .prepare(&format!("{} WHERE id = ?1", SELECT_SONG))?;
        let mut rows = stmt.query_map(params![id], song_from_row)?;
        let song = rows.next().transpose()?;
        Ok(song)
    }

    pub fn all_songs(&self) -> Result<Vec<SongRecord>, Error> {
        let mut stmt = self
            .connection()
            .prepare(&format!("{} ORDER BY id", SELECT_SONG))?;
        let rows = stmt
            .query_map([], song_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl CatalogStore for SqliteCatalog {
    fn ping(&self) -> Result<(), Error> {
        self.ping_connection()
    }

    fn reconnect(&mut self) -> Result<(), Error> {
        self.reopen()
    }

    fn has_table_meta(&self) -> bool {
        self.table_meta().is_some()
    }

    fn load_table_meta(&mut self) -> Result<(), Error> {
        self.read_table_meta()
    }

    fn find_by_hash(&self, content_hash: &str) -> Result<Vec<SongRecord>, Error> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "{} WHERE content_hash = ?1 ORDER BY id",
            SELECT_SONG
        ))?;
        let rows = stmt
            .query_map(params![content_hash], song_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_by_location(&self, path: &str, filename: &str) -> Result<Vec<SongRecord>, Error> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "{} WHERE path = ?1 AND filename = ?2 ORDER BY id",
            SELECT_SONG
        ))?;
        let rows = stmt
            .query_map(params![path, filename], song_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert(&self, song: &SongRecord, now: &str) -> Result<i64, Error> {
        self.connection().execute(
            "INSERT INTO songs (path, filename, content_hash, artist, title, album, genre, \
             trackno, year, bitrate, length, samplerate, bitratecl, mtime, size, lastupdate, lastseen) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
            params![
                song.path,
                song.filename,
                song.content_hash,
                song.artist,
                song.title,
                song.album,
                song.genre,
                song.trackno,
                song.year,
                song.bitrate,
                song.length,
                song.samplerate,
                song.bitrate_class.as_code(),
                song.mtime,
                song.size,
                now,
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Inserted song {} ({}/{})", id, song.path, song.filename);
        Ok(id)
    }

    fn update(&self, id: i64, song: &SongRecord, now: &str) -> Result<(), Error> {
        self.connection().execute(
            "UPDATE songs SET path = ?1, filename = ?2, content_hash = ?3, artist = ?4, \
             title = ?5, album = ?6, genre = ?7, trackno = ?8, year = ?9, bitrate = ?10, \
             length = ?11, samplerate = ?12, bitratecl = ?13, mtime = ?14, size = ?15, \
             lastupdate = ?16, lastseen = ?16 WHERE id = ?17",
            params![
                song.path,
                song.filename,
                song.content_hash,
                song.artist,
                song.title,
                song.album,
                song.genre,
                song.trackno,
                song.year,
                song.bitrate,
                song.length,
                song.samplerate,
                song.bitrate_class.as_code(),
                song.mtime,
                song.size,
                now,
                id,
            ],
        )?;
        debug!("Updated song {} ({}/{})", id, song.path, song.filename);
        Ok(())
    }

    fn touch_last_seen(&self, id: i64, now: &str) -> Result<(), Error> {
        self.connection().execute(
            "UPDATE songs SET lastseen = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    fn delete_by_location(&self, path: &str, filename: &str) -> Result<usize, Error> {
        let deleted = self.connection().execute(
            "DELETE FROM songs WHERE path = ?1 AND filename = ?2",
            params![path, filename],
        )?;
        Ok(deleted)
    }

    fn delete_seen_before(&self, watermark: &str) -> Result<usize, Error> {
        let deleted = self
            .connection()
            .execute("DELETE FROM songs WHERE lastseen < ?1", params![watermark])?;
        Ok(deleted)
    }

    fn count(&self) -> Result<i64, Error> {
        let count: i64 = self
            .connection()
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(count)
    }
}
