use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use photo_sorter_application::{
    ApplicationError, ItemOutcome, MoveEvent, ScanEvent, ScanRequest, SessionWorker, UndoEvent,
};
use photo_sorter_domain::{
    destination_dir, Image, ImageId, MoveBatch, MoveItem, UndoEntry, UndoRecord,
};
use tracing::{debug, error, info, warn};

use crate::fs::{
    free_destination, move_no_replace, read_person_tags, remove_empty_dirs, SystemClock,
    ThumbnailCache, WalkdirFileScanner,
};
use crate::sqlite::SqliteUndoLog;

const COLLISION_RETRIES: usize = 8;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub undo_log_path: PathBuf,
    /// Thumbnails are skipped entirely when unset.
    pub thumbnail_dir: Option<PathBuf>,
}

enum Job {
    Scan {
        request: ScanRequest,
        events: Sender<ScanEvent>,
    },
    Move {
        batch: MoveBatch,
        events: Sender<MoveEvent>,
    },
    Undo {
        events: Sender<UndoEvent>,
    },
}

/// Runs scan, move and undo jobs one at a time on a dedicated thread.
///
/// The latest moved batch is kept in memory and mirrored to the SQLite undo
/// log; the in-memory copy is what undo restores.
pub struct BackgroundWorker {
    submit_tx: mpsc::Sender<Job>,
    cancel: Arc<AtomicBool>,
    journal: Arc<Mutex<Option<UndoRecord>>>,
}

impl BackgroundWorker {
    pub fn spawn(settings: WorkerSettings) -> Result<Self, ApplicationError> {
        let undo_log = SqliteUndoLog::new(settings.undo_log_path);
        undo_log.initialize()?;
        let journal = Arc::new(Mutex::new(undo_log.latest()?));
        let cancel = Arc::new(AtomicBool::new(false));
        let (submit_tx, submit_rx) = mpsc::channel::<Job>();

        let runner = JobRunner {
            cancel: Arc::clone(&cancel),
            journal: Arc::clone(&journal),
            undo_log,
            thumbnails: settings.thumbnail_dir.map(ThumbnailCache::new),
            scanner: WalkdirFileScanner,
            clock: SystemClock,
            next_id: 1,
        };
        thread::Builder::new()
            .name("photo-sorter-worker".to_string())
            .spawn(move || runner.run(submit_rx))
            .map_err(|error| ApplicationError::Worker(format!("failed to start worker: {error}")))?;

        Ok(Self {
            submit_tx,
            cancel,
            journal,
        })
    }

    fn submit(&self, job: Job) -> Result<(), ApplicationError> {
        self.submit_tx
            .send(job)
            .map_err(|error| ApplicationError::Worker(format!("failed to enqueue job: {error}")))
    }
}

impl SessionWorker for BackgroundWorker {
    fn begin_scan(
        &self,
        request: ScanRequest,
        events: Sender<ScanEvent>,
    ) -> Result<(), ApplicationError> {
        self.cancel.store(false, Ordering::SeqCst);
        self.submit(Job::Scan { request, events })
    }

    fn cancel_scan(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn begin_move(
        &self,
        batch: MoveBatch,
        events: Sender<MoveEvent>,
    ) -> Result<(), ApplicationError> {
        self.submit(Job::Move { batch, events })
    }

    fn begin_undo(&self, events: Sender<UndoEvent>) -> Result<(), ApplicationError> {
        self.submit(Job::Undo { events })
    }

    fn latest_undo_record(&self) -> Result<Option<UndoRecord>, ApplicationError> {
        let journal = self
            .journal
            .lock()
            .map_err(|_| ApplicationError::Worker("undo journal lock poisoned".to_string()))?;
        Ok(journal.clone())
    }
}

struct JobRunner {
    cancel: Arc<AtomicBool>,
    journal: Arc<Mutex<Option<UndoRecord>>>,
    undo_log: SqliteUndoLog,
    thumbnails: Option<ThumbnailCache>,
    scanner: WalkdirFileScanner,
    clock: SystemClock,
    next_id: i64,
}

impl JobRunner {
    fn run(mut self, submit_rx: mpsc::Receiver<Job>) {
        while let Ok(job) = submit_rx.recv() {
            match job {
                Job::Scan { request, events } => self.scan(request, events),
                Job::Move { batch, events } => self.move_batch(batch, events),
                Job::Undo { events } => self.undo(events),
            }
        }
        debug!("worker queue closed");
    }

    fn scan(&mut self, request: ScanRequest, events: Sender<ScanEvent>) {
        let files = match self
            .scanner
            .scan_supported(&request.source_dir, request.include_subdirs)
        {
            Ok(files) => files,
            Err(failure) => {
                warn!(%failure, "scan cannot start");
                let _ = events.send(ScanEvent::fatal(0, failure.to_string()));
                return;
            }
        };
        info!(files = files.len(), "scanning");

        let mut scanned = 0;
        for path in files {
            if self.cancel.load(Ordering::SeqCst) {
                info!(scanned, "scan cancelled");
                let _ = events.send(ScanEvent::finished(scanned, true));
                return;
            }
            scanned += 1;
            let event = match self.describe(&path) {
                Ok(image) => ScanEvent::discovered(scanned, image),
                Err(failure) => {
                    warn!(path = %path.display(), %failure, "file skipped");
                    ScanEvent::item_failed(scanned, format!("{}: {failure}", path.display()))
                }
            };
            if events.send(event).is_err() {
                debug!("scan session went away");
                return;
            }
        }
        let _ = events.send(ScanEvent::finished(scanned, false));
    }

    fn describe(&mut self, path: &Path) -> Result<Image, ApplicationError> {
        let tags = read_person_tags(path)?;
        let image_id = ImageId::new(self.next_id)?;
        self.next_id += 1;

        let thumbnail = match self.thumbnails.as_ref().map(|cache| cache.ensure(path, image_id)) {
            Some(Ok(thumb)) => Some(thumb),
            Some(Err(failure)) => {
                debug!(path = %path.display(), %failure, "no thumbnail");
                None
            }
            None => None,
        };
        Ok(Image::new(image_id, path.to_path_buf(), tags.persons, tags.keywords)
            .with_thumbnail(thumbnail))
    }

    fn move_batch(&mut self, batch: MoveBatch, events: Sender<MoveEvent>) {
        let total = batch.len();
        if let Err(failure) = fs::create_dir_all(&batch.target_dir) {
            error!(%failure, target = %batch.target_dir.display(), "cannot create target directory");
            let _ = events.send(MoveEvent::fatal(
                0,
                total,
                format!("cannot create {}: {failure}", batch.target_dir.display()),
            ));
            return;
        }

        let mut entries = Vec::new();
        for item in &batch.items {
            let outcome = match place(item, &batch.target_dir) {
                Ok(destination) => {
                    entries.push(UndoEntry {
                        image_id: item.image_id,
                        original_path: item.source_path.clone(),
                        moved_path: destination.clone(),
                    });
                    ItemOutcome::Moved {
                        image_id: item.image_id,
                        source: item.source_path.clone(),
                        destination,
                    }
                }
                Err(reason) => {
                    warn!(file = %item.source_path.display(), %reason, "move failed");
                    ItemOutcome::Failed {
                        image_id: item.image_id,
                        reason,
                    }
                }
            };
            // Keep going when nobody listens so the journal matches the disk.
            let _ = events.send(MoveEvent::item(
                entries.len(),
                total,
                item.filename.clone(),
                outcome,
            ));
        }

        let moved = entries.len();
        if moved > 0 {
            self.remember(UndoRecord {
                target_dir: batch.target_dir.clone(),
                entries,
            });
        }
        info!(moved, total, "move batch done");
        let _ = events.send(MoveEvent::finished(moved, total));
    }

    fn remember(&self, record: UndoRecord) {
        if let Err(failure) = self.undo_log.replace(&record, &self.clock.now_timestamp_string()) {
            error!(%failure, "undo log not persisted; undo only works in this process");
        }
        match self.journal.lock() {
            Ok(mut journal) => *journal = Some(record),
            Err(_) => error!("undo journal lock poisoned"),
        }
    }

    fn undo(&mut self, events: Sender<UndoEvent>) {
        let record = match self.journal.lock() {
            Ok(mut journal) => journal.take(),
            Err(_) => {
                error!("undo journal lock poisoned");
                None
            }
        };
        if let Err(failure) = self.undo_log.clear() {
            error!(%failure, "could not clear undo log");
        }

        let Some(record) = record else {
            info!("nothing to undo");
            let _ = events.send(UndoEvent {
                restored_count: 0,
                success: true,
                restored: Vec::new(),
            });
            return;
        };

        let mut restored = Vec::new();
        for entry in &record.entries {
            match restore(entry) {
                Ok(()) => restored.push(entry.image_id),
                Err(reason) => {
                    warn!(file = %entry.moved_path.display(), %reason, "could not restore file")
                }
            }
        }
        remove_empty_dirs(&record.target_dir);

        info!(restored = restored.len(), expected = record.len(), "undo done");
        let _ = events.send(UndoEvent {
            restored_count: restored.len(),
            success: restored.len() == record.len(),
            restored,
        });
    }
}

fn place(item: &MoveItem, target_dir: &Path) -> Result<PathBuf, String> {
    if !item.source_path.is_file() {
        return Err(format!("source file is missing: {}", item.source_path.display()));
    }
    let dir = destination_dir(target_dir, &item.person);
    fs::create_dir_all(&dir).map_err(|failure| format!("cannot create {}: {failure}", dir.display()))?;

    // Another writer may claim the free name first.
    for _ in 0..COLLISION_RETRIES {
        let destination = free_destination(&dir, &item.filename);
        match move_no_replace(&item.source_path, &destination) {
            Ok(()) => return Ok(destination),
            Err(failure) if failure.kind() == ErrorKind::AlreadyExists => continue,
            Err(failure) => return Err(failure.to_string()),
        }
    }
    Err(format!("no free destination name for {}", item.filename))
}

fn restore(entry: &UndoEntry) -> Result<(), String> {
    if !entry.moved_path.is_file() {
        return Err("moved file no longer exists".to_string());
    }
    if entry.original_path.exists() {
        return Err("original location is occupied".to_string());
    }
    if let Some(parent) = entry.original_path.parent() {
        fs::create_dir_all(parent).map_err(|failure| failure.to_string())?;
    }
    move_no_replace(&entry.moved_path, &entry.original_path).map_err(|failure| failure.to_string())
}
