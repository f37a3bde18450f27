mod queries;

use std::fs;
use std::path::{Path, PathBuf};

use photo_sorter_application::ApplicationError;
use photo_sorter_domain::{ImageId, UndoEntry, UndoRecord};
use rusqlite::Connection;

use crate::migrations::MIGRATIONS;
use queries::EntryRow;

/// Persists the latest move batch so it can be undone by a later process.
/// Only one batch is ever stored.
#[derive(Debug, Clone)]
pub struct SqliteUndoLog {
    path: PathBuf,
}

impl SqliteUndoLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open_connection(&self) -> Result<Connection, ApplicationError> {
        let conn = Connection::open(&self.path)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        Ok(conn)
    }

    pub fn initialize(&self) -> Result<(), ApplicationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ApplicationError::InvalidInput(
                "undo log path must not be empty".to_string(),
            ));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|error| ApplicationError::Io(error.to_string()))?;
            }
        }

        let conn = self.open_connection()?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        for migration in MIGRATIONS {
            conn.execute_batch(migration)
                .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        }
        Ok(())
    }

    /// Drops whatever was stored and keeps `record` as the only batch.
    pub fn replace(&self, record: &UndoRecord, created_at: &str) -> Result<(), ApplicationError> {
        let mut conn = self.open_connection()?;
        let tx = conn
            .transaction()
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        queries::delete_all(&tx).map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        let batch_id = queries::insert_batch(&tx, &path_to_blob(&record.target_dir), created_at)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        for (position, entry) in record.entries.iter().enumerate() {
            let row = EntryRow {
                image_id: entry.image_id.get(),
                original_path: path_to_blob(&entry.original_path),
                moved_path: path_to_blob(&entry.moved_path),
            };
            queries::insert_entry(&tx, batch_id, position, &row)
                .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        }

        tx.commit()
            .map_err(|error| ApplicationError::Persistence(error.to_string()))
    }

    pub fn latest(&self) -> Result<Option<UndoRecord>, ApplicationError> {
        let conn = self.open_connection()?;
        let Some((batch_id, target_dir)) = queries::latest_batch(&conn)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
        else {
            return Ok(None);
        };

        let entries = queries::entries_for_batch(&conn, batch_id)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
            .into_iter()
            .map(|row| -> Result<UndoEntry, ApplicationError> {
                Ok(UndoEntry {
                    image_id: ImageId::new(row.image_id)?,
                    original_path: path_from_blob(row.original_path),
                    moved_path: path_from_blob(row.moved_path),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(UndoRecord {
            target_dir: path_from_blob(target_dir),
            entries,
        }))
    }

    pub fn clear(&self) -> Result<(), ApplicationError> {
        let conn = self.open_connection()?;
        queries::delete_all(&conn).map_err(|error| ApplicationError::Persistence(error.to_string()))
    }
}

#[cfg(unix)]
fn path_to_blob(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_blob(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

// Windows paths are stored as UTF-8.
#[cfg(not(unix))]
fn path_to_blob(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_blob(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(target: &str, ids: &[i64]) -> UndoRecord {
        UndoRecord {
            target_dir: PathBuf::from(target),
            entries: ids
                .iter()
                .map(|value| UndoEntry {
                    image_id: ImageId::new(*value).expect("id"),
                    original_path: PathBuf::from(format!("/photos/{value}.jpg")),
                    moved_path: PathBuf::from(format!("{target}/Alice/{value}.jpg")),
                })
                .collect(),
        }
    }

    fn log(dir: &TempDir) -> SqliteUndoLog {
        let log = SqliteUndoLog::new(dir.path().join("state/undo.sqlite3"));
        log.initialize().expect("initialize");
        log
    }

    #[test]
    fn initialize_creates_schema_idempotently() {
        let dir = TempDir::new().expect("tempdir");
        let undo_log = log(&dir);
        undo_log.initialize().expect("second initialize");

        let conn = Connection::open(dir.path().join("state/undo.sqlite3")).expect("open");
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name LIKE 'undo_%'",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(count, 2);
        assert_eq!(undo_log.latest().expect("latest"), None);
    }

    #[test]
    fn replace_keeps_only_the_latest_batch() {
        let dir = TempDir::new().expect("tempdir");
        let undo_log = log(&dir);
        undo_log
            .replace(&record("/out", &[1, 2]), "1")
            .expect("first batch");
        undo_log
            .replace(&record("/other", &[3, 4, 5]), "2")
            .expect("second batch");

        let latest = undo_log.latest().expect("latest").expect("a batch");
        assert_eq!(latest, record("/other", &[3, 4, 5]));

        undo_log.clear().expect("clear");
        assert_eq!(undo_log.latest().expect("latest"), None);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_round_trip_exactly() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().expect("tempdir");
        let undo_log = log(&dir);
        let raw = |bytes: &[u8]| PathBuf::from(OsStr::from_bytes(bytes));
        let record = UndoRecord {
            target_dir: raw(b"/out/\xff"),
            entries: vec![UndoEntry {
                image_id: ImageId::new(9).expect("id"),
                original_path: raw(b"/photos/caf\xe9.jpg"),
                moved_path: raw(b"/out/\xff/Alice/caf\xe9.jpg"),
            }],
        };
        undo_log.replace(&record, "1").expect("stored");

        assert_eq!(undo_log.latest().expect("latest"), Some(record));
    }
}
