pub mod fs;
pub mod migrations;
pub mod presenters;
pub mod sqlite;
pub mod worker;

pub use fs::{read_person_tags, PersonTags, SystemClock, ThumbnailCache, WalkdirFileScanner};
pub use presenters::{present_image_row, present_move_progress, present_scan_event};
pub use sqlite::SqliteUndoLog;
pub use worker::{BackgroundWorker, WorkerSettings};
