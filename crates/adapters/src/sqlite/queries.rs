use rusqlite::{params, Connection, Result};

pub struct EntryRow {
    pub image_id: i64,
    pub original_path: Vec<u8>,
    pub moved_path: Vec<u8>,
}

pub fn delete_all(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM undo_entries", [])?;
    conn.execute("DELETE FROM undo_batches", [])?;
    Ok(())
}

pub fn insert_batch(conn: &Connection, target_dir: &[u8], created_at: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO undo_batches (target_dir, created_at) VALUES (?1, ?2)",
        params![target_dir, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_entry(conn: &Connection, batch_id: i64, position: usize, entry: &EntryRow) -> Result<()> {
    conn.execute(
        "INSERT INTO undo_entries (batch_id, position, image_id, original_path, moved_path)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            batch_id,
            position as i64,
            entry.image_id,
            entry.original_path,
            entry.moved_path
        ],
    )?;
    Ok(())
}

pub fn latest_batch(conn: &Connection) -> Result<Option<(i64, Vec<u8>)>> {
    let mut stmt = conn.prepare(
        "SELECT id, target_dir
         FROM undo_batches
         ORDER BY id DESC
         LIMIT 1",
    )?;
    let mut rows = stmt.query([])?;
    if let Some(row) = rows.next()? {
        return Ok(Some((row.get(0)?, row.get(1)?)));
    }
    Ok(None)
}

pub fn entries_for_batch(conn: &Connection, batch_id: i64) -> Result<Vec<EntryRow>> {
    let mut stmt = conn.prepare(
        "SELECT image_id, original_path, moved_path
         FROM undo_entries
         WHERE batch_id = ?1
         ORDER BY position",
    )?;
    let rows = stmt.query_map(params![batch_id], |row| {
        Ok(EntryRow {
            image_id: row.get(0)?,
            original_path: row.get(1)?,
            moved_path: row.get(2)?,
        })
    })?;
    rows.collect()
}
