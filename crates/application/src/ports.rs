use std::path::PathBuf;
use std::sync::mpsc::Sender;

use photo_sorter_domain::{Image, ImageId, MoveBatch, UndoRecord};

use crate::ApplicationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub source_dir: PathBuf,
    pub include_subdirs: bool,
}

/// One step of a scan stream.
///
/// `error` on a non-final event is a per-file failure; on the `done` event it
/// means the whole scan failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub scanned: usize,
    pub image: Option<Image>,
    pub done: bool,
    pub cancelled: bool,
    pub error: Option<String>,
}

impl ScanEvent {
    pub fn discovered(scanned: usize, image: Image) -> Self {
        Self {
            scanned,
            image: Some(image),
            done: false,
            cancelled: false,
            error: None,
        }
    }

    pub fn item_failed(scanned: usize, error: impl Into<String>) -> Self {
        Self {
            scanned,
            image: None,
            done: false,
            cancelled: false,
            error: Some(error.into()),
        }
    }

    pub fn finished(scanned: usize, cancelled: bool) -> Self {
        Self {
            scanned,
            image: None,
            done: true,
            cancelled,
            error: None,
        }
    }

    pub fn fatal(scanned: usize, error: impl Into<String>) -> Self {
        Self {
            scanned,
            image: None,
            done: true,
            cancelled: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Moved {
        image_id: ImageId,
        source: PathBuf,
        destination: PathBuf,
    },
    Failed {
        image_id: ImageId,
        reason: String,
    },
}

/// Move progress, forwarded verbatim to observers.
///
/// `moved_count` never decreases within a batch and the `done` event is the
/// last one. `error` on the `done` event means the batch failed as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEvent {
    pub moved_count: usize,
    pub total: usize,
    pub current_file: String,
    pub done: bool,
    pub error: Option<String>,
    pub outcome: Option<ItemOutcome>,
}

impl MoveEvent {
    pub fn item(moved_count: usize, total: usize, current_file: String, outcome: ItemOutcome) -> Self {
        let error = match &outcome {
            ItemOutcome::Failed { reason, .. } => Some(reason.clone()),
            ItemOutcome::Moved { .. } => None,
        };
        Self {
            moved_count,
            total,
            current_file,
            done: false,
            error,
            outcome: Some(outcome),
        }
    }

    pub fn finished(moved_count: usize, total: usize) -> Self {
        Self {
            moved_count,
            total,
            current_file: String::new(),
            done: true,
            error: None,
            outcome: None,
        }
    }

    pub fn fatal(moved_count: usize, total: usize, error: impl Into<String>) -> Self {
        Self {
            moved_count,
            total,
            current_file: String::new(),
            done: true,
            error: Some(error.into()),
            outcome: None,
        }
    }
}

/// Single terminal result of an undo request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UndoEvent {
    pub restored_count: usize,
    pub success: bool,
    pub restored: Vec<ImageId>,
}

/// The background collaborator that touches the filesystem.
///
/// Every `begin_*` call returns as soon as the job is queued; results arrive
/// on the given channel in order, ending with a `done` event (or the single
/// undo event). Destination collisions are never overwritten: the worker
/// either picks a free name or fails that one file with a per-item error.
pub trait SessionWorker {
    fn begin_scan(
        &self,
        request: ScanRequest,
        events: Sender<ScanEvent>,
    ) -> Result<(), ApplicationError>;

    fn cancel_scan(&self);

    fn begin_move(&self, batch: MoveBatch, events: Sender<MoveEvent>)
        -> Result<(), ApplicationError>;

    /// Reverses the worker's own record of the last moved batch.
    fn begin_undo(&self, events: Sender<UndoEvent>) -> Result<(), ApplicationError>;

    fn latest_undo_record(&self) -> Result<Option<UndoRecord>, ApplicationError>;
}

/// Presentation-side hooks. Everything defaults to doing nothing.
pub trait SessionObserver {
    fn on_scan_event(&self, _event: &ScanEvent) {}

    fn on_move_progress(&self, _event: &MoveEvent) {}

    fn on_undo_finished(&self, _event: &UndoEvent) {}

    fn on_status(&self, _message: &str) {}
}
