use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use photo_sorter_domain::{Catalog, ImageId, ImageStatus, MoveBatch, UndoEntry, UndoRecord};
use tracing::{debug, error, info, warn};

use crate::{ApplicationError, ItemOutcome, MoveEvent, SessionWorker};

const UNREPORTED_ITEM: &str = "worker finished without reporting this file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveState {
    Idle,
    Validating,
    Running,
    Completed,
    Failed(String),
}

impl Display for MoveState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Validating => write!(f, "validating"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveStarted {
    pub total: usize,
    pub unassigned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSummary {
    pub state: MoveState,
    pub total: usize,
    pub moved: usize,
    pub failed: usize,
    pub unassigned: usize,
    pub undo_record: Option<UndoRecord>,
}

impl MoveSummary {
    pub fn undo_available(&self) -> bool {
        self.undo_record.is_some()
    }

    pub fn status_message(&self) -> String {
        let counts = format!(
            "{} of {} moved, {} failed, {} selected without a person",
            self.moved, self.total, self.failed, self.unassigned
        );
        let undo = if self.undo_available() {
            "undo available"
        } else {
            "nothing to undo"
        };
        match &self.state {
            MoveState::Failed(reason) => format!("Move failed ({reason}): {counts}; {undo}."),
            _ => format!("Move completed: {counts}; {undo}."),
        }
    }
}

/// One move batch, from validation to its terminal summary. There is no
/// cancellation: a dispatched batch always runs to completion or failure.
#[derive(Debug)]
pub struct MoveSession {
    state: MoveState,
    events: Option<Receiver<MoveEvent>>,
    target_dir: std::path::PathBuf,
    pending: HashSet<ImageId>,
    total: usize,
    unassigned: usize,
    failed: usize,
    moved: Vec<UndoEntry>,
    last_progress: Option<MoveEvent>,
}

impl Default for MoveSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveSession {
    pub fn new() -> Self {
        Self {
            state: MoveState::Idle,
            events: None,
            target_dir: Default::default(),
            pending: HashSet::new(),
            total: 0,
            unassigned: 0,
            failed: 0,
            moved: Vec::new(),
            last_progress: None,
        }
    }

    pub fn state(&self) -> &MoveState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MoveState::Running
    }

    pub fn last_progress(&self) -> Option<&MoveEvent> {
        self.last_progress.as_ref()
    }

    pub fn start(
        &mut self,
        target_dir: &Path,
        catalog: &mut Catalog,
        worker: &dyn SessionWorker,
    ) -> Result<MoveStarted, ApplicationError> {
        if self.state != MoveState::Idle {
            return Err(ApplicationError::MoveInProgress);
        }
        if target_dir.as_os_str().is_empty() {
            return Err(ApplicationError::MissingTarget);
        }

        self.state = MoveState::Validating;
        let (batch, unassigned) = MoveBatch::from_selection(catalog, target_dir);
        if batch.is_empty() {
            self.state = MoveState::Idle;
            return Err(ApplicationError::EmptyBatch { unassigned });
        }

        let ids = batch.image_ids();
        catalog.mark_status(&ids, ImageStatus::Moving);

        let (sender, receiver) = mpsc::channel();
        info!(
            target = %target_dir.display(),
            total = ids.len(),
            unassigned,
            "dispatching move batch"
        );
        if let Err(dispatch_error) = worker.begin_move(batch, sender) {
            catalog.mark_status(&ids, ImageStatus::Ready);
            self.state = MoveState::Idle;
            return Err(dispatch_error);
        }

        self.target_dir = target_dir.to_path_buf();
        self.total = ids.len();
        self.unassigned = unassigned;
        self.pending = ids.into_iter().collect();
        self.events = Some(receiver);
        self.state = MoveState::Running;
        Ok(MoveStarted {
            total: self.total,
            unassigned,
        })
    }

    pub fn poll(
        &mut self,
        catalog: &mut Catalog,
        mut observe: impl FnMut(&MoveEvent),
    ) -> Option<MoveSummary> {
        loop {
            let received = match &self.events {
                Some(events) => events.try_recv(),
                None => return None,
            };
            match received {
                Ok(event) => {
                    observe(&event);
                    if let Some(summary) = self.apply(event, catalog) {
                        return Some(summary);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    error!("move worker hung up before finishing");
                    return Some(self.finish(
                        MoveState::Failed("worker stopped without finishing the batch".to_string()),
                        catalog,
                    ));
                }
            }
        }
    }

    pub fn apply(&mut self, event: MoveEvent, catalog: &mut Catalog) -> Option<MoveSummary> {
        if !self.is_running() {
            debug!("ignoring move event for a session that is not running");
            return None;
        }
        debug!(
            moved = event.moved_count,
            total = event.total,
            file = %event.current_file,
            "move progress"
        );

        match &event.outcome {
            Some(ItemOutcome::Moved {
                image_id,
                source,
                destination,
            }) => {
                if self.pending.remove(image_id) {
                    catalog.mark_status([image_id], ImageStatus::Moved);
                    catalog.record_destination(*image_id, destination.clone());
                    self.moved.push(UndoEntry {
                        image_id: *image_id,
                        original_path: source.clone(),
                        moved_path: destination.clone(),
                    });
                } else {
                    warn!(image_id = image_id.get(), "worker reported a file outside the batch");
                }
            }
            Some(ItemOutcome::Failed { image_id, reason }) => {
                if self.pending.remove(image_id) {
                    warn!(image_id = image_id.get(), %reason, "file could not be moved");
                    catalog.mark_status([image_id], ImageStatus::Errored(reason.clone()));
                    self.failed += 1;
                } else {
                    warn!(image_id = image_id.get(), "worker reported a file outside the batch");
                }
            }
            None => {}
        }

        let done = event.done;
        let fatal = if done { event.error.clone() } else { None };
        self.last_progress = Some(event);
        if !done {
            return None;
        }
        let state = match fatal {
            Some(reason) => MoveState::Failed(reason),
            None => MoveState::Completed,
        };
        Some(self.finish(state, catalog))
    }

    fn finish(&mut self, state: MoveState, catalog: &mut Catalog) -> MoveSummary {
        let reason = match &state {
            MoveState::Failed(reason) => reason.clone(),
            _ => UNREPORTED_ITEM.to_string(),
        };
        let leftover: Vec<ImageId> = self.pending.drain().collect();
        if !leftover.is_empty() {
            warn!(count = leftover.len(), %reason, "files left unmoved");
            catalog.mark_status(&leftover, ImageStatus::Errored(reason));
            self.failed += leftover.len();
        }

        self.events = None;
        self.state = state;
        let undo_record = (!self.moved.is_empty()).then(|| UndoRecord {
            target_dir: self.target_dir.clone(),
            entries: std::mem::take(&mut self.moved),
        });
        let summary = MoveSummary {
            state: self.state.clone(),
            total: self.total,
            moved: undo_record.as_ref().map_or(0, UndoRecord::len),
            failed: self.failed,
            unassigned: self.unassigned,
            undo_record,
        };
        info!(state = %summary.state, moved = summary.moved, failed = summary.failed, "move batch finished");
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::fakes::{id, image, FakeWorker};

    fn ready_catalog(values: &[i64]) -> Catalog {
        let mut catalog = Catalog::new();
        for value in values {
            catalog.append(image(*value, &["Alice"])).expect("fresh id");
            catalog
                .update_person(id(*value), "Alice")
                .expect("candidate person");
            catalog.select(id(*value));
        }
        catalog
    }

    #[test]
    fn start_marks_batch_moving_and_counts_unassigned() {
        let worker = FakeWorker::default();
        let mut catalog = ready_catalog(&[1, 2]);
        catalog.append(image(3, &["Bob"])).expect("fresh id");
        catalog.select(id(3));

        let mut session = MoveSession::new();
        let started = session
            .start(Path::new("/sorted"), &mut catalog, &worker)
            .expect("dispatched");
        assert_eq!(started, MoveStarted { total: 2, unassigned: 1 });
        assert_eq!(session.state(), &MoveState::Running);
        assert!(catalog
            .iter()
            .filter(|image| image.id != id(3))
            .all(|image| image.status == ImageStatus::Moving));
        assert_eq!(
            catalog.get(id(3)).map(|image| image.status.clone()),
            Some(ImageStatus::Scanned)
        );

        let batch = worker.last_batch();
        assert_eq!(batch.target_dir, PathBuf::from("/sorted"));
        assert_eq!(batch.image_ids(), vec![id(1), id(2)]);
    }

    #[test]
    fn fatal_batch_errors_pending_files_and_keeps_undo() {
        let worker = FakeWorker::default();
        let mut catalog = ready_catalog(&[1, 2]);
        let mut session = MoveSession::new();
        session
            .start(Path::new("/sorted"), &mut catalog, &worker)
            .expect("dispatched");

        let sender = worker.move_sender();
        sender
            .send(MoveEvent::item(
                1,
                2,
                "img1.jpg".to_string(),
                ItemOutcome::Moved {
                    image_id: id(1),
                    source: PathBuf::from("/photos/img1.jpg"),
                    destination: PathBuf::from("/sorted/Alice/img1.jpg"),
                },
            ))
            .expect("listening");
        sender
            .send(MoveEvent::fatal(1, 2, "target is read-only"))
            .expect("listening");

        let summary = session.poll(&mut catalog, |_| {}).expect("terminal");
        assert_eq!(summary.state, MoveState::Failed("target is read-only".to_string()));
        assert_eq!((summary.moved, summary.failed), (1, 1));
        assert_eq!(
            catalog.get(id(2)).map(|image| image.status.clone()),
            Some(ImageStatus::Errored("target is read-only".to_string()))
        );
        let record = summary.undo_record.expect("one file moved");
        assert_eq!(record.entries[0].moved_path, PathBuf::from("/sorted/Alice/img1.jpg"));
    }

    #[test]
    fn outcomes_outside_the_batch_are_ignored() {
        let worker = FakeWorker::default();
        let mut catalog = ready_catalog(&[1]);
        let mut session = MoveSession::new();
        session
            .start(Path::new("/sorted"), &mut catalog, &worker)
            .expect("dispatched");

        let stray = MoveEvent::item(
            1,
            1,
            "img9.jpg".to_string(),
            ItemOutcome::Moved {
                image_id: id(9),
                source: PathBuf::from("/photos/img9.jpg"),
                destination: PathBuf::from("/sorted/Alice/img9.jpg"),
            },
        );
        assert!(session.apply(stray, &mut catalog).is_none());
        let summary = session
            .apply(MoveEvent::finished(1, 1), &mut catalog)
            .expect("terminal");
        assert_eq!(summary.moved, 0);
        assert_eq!(summary.failed, 1);
        assert!(summary.undo_record.is_none());
        assert_eq!(
            summary.status_message(),
            "Move completed: 0 of 1 moved, 1 failed, 0 selected without a person; nothing to undo."
        );
    }
}
