// Paths are raw OS bytes so non-UTF-8 names survive a restart.
pub const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS undo_batches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        target_dir BLOB NOT NULL,
        created_at TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS undo_entries (
        batch_id INTEGER NOT NULL REFERENCES undo_batches(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        image_id INTEGER NOT NULL,
        original_path BLOB NOT NULL,
        moved_path BLOB NOT NULL,
        PRIMARY KEY (batch_id, position)
    );",
];
