use super::SONGS_TABLE;
use crate::error::Error;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Columns the engine reads and writes; `load_table_meta` checks they are all present.
pub(crate) const SONG_COLUMNS: &[&str] = &[
    "id",
    "path",
    "filename",
    "content_hash",
    "artist",
    "title",
    "album",
    "genre",
    "trackno",
    "year",
    "bitrate",
    "length",
    "samplerate",
    "bitratecl",
    "mtime",
    "size",
    "lastupdate",
    "lastseen",
];

#[derive(Debug, Clone)]
pub struct TableMeta {
    pub columns: Vec<String>,
}

pub struct SqliteCatalog {
    conn: Connection,
    location: Option<PathBuf>,
    table_meta: Option<TableMeta>,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        let db = SqliteCatalog {
            conn,
            location: Some(path.to_path_buf()),
            table_meta: None,
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        info!("Catalog opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        let db = SqliteCatalog {
            conn,
            location: None,
            table_meta: None,
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<(), Error> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 16MB cache)");
        Ok(())
    }

    /// Schema version 1 is the only layout so far; `schema.sql` is idempotent.
    fn migrate_schema(&self) -> Result<(), Error> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version < 1 {
            debug!("Schema version {} < 1, creating catalog tables", version);
        }
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version 1)");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_meta(&self) -> Option<&TableMeta> {
        self.table_meta.as_ref()
    }

    pub(crate) fn ping_connection(&self) -> Result<(), Error> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    pub(crate) fn reopen(&mut self) -> Result<(), Error> {
        match &self.location {
            Some(path) => {
                let conn = Connection::open(path)?;
                self.conn = conn;
                self.configure_pragmas()?;
                self.migrate_schema()?;
                info!("Reconnected to catalog at {}", path.display());
            }
            // An in-memory catalog has nothing to reconnect to.
            None => debug!("In-memory catalog, reconnect is a no-op"),
        }
        Ok(())
    }

    pub(crate) fn read_table_meta(&mut self) -> Result<(), Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", SONGS_TABLE))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        let complete = SONG_COLUMNS
            .iter()
            .all(|wanted| columns.iter().any(|c| c == wanted));
        if !complete {
            return Err(Error::MissingTable(SONGS_TABLE.to_string()));
        }

        debug!("Table '{}' has {} columns", SONGS_TABLE, columns.len());
        self.table_meta = Some(TableMeta { columns });
        Ok(())
    }
}
