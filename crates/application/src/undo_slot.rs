use std::sync::mpsc::{self, Receiver, TryRecvError};

use photo_sorter_domain::{ImageId, UndoRecord};
use tracing::{error, info, warn};

use crate::{ApplicationError, SessionWorker, UndoEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoReport {
    pub expected: usize,
    pub restored_count: usize,
    pub restored: Vec<ImageId>,
    pub success: bool,
}

impl UndoReport {
    pub fn nothing_to_undo() -> Self {
        Self {
            expected: 0,
            restored_count: 0,
            restored: Vec::new(),
            success: true,
        }
    }

    pub fn status_message(&self) -> String {
        if self.expected == 0 && self.restored_count == 0 {
            return "Nothing to undo.".to_string();
        }
        if self.success {
            format!("Undo restored {} of {} files.", self.restored_count, self.expected)
        } else {
            format!(
                "Undo restored only {} of {} files; the rest could not be put back.",
                self.restored_count, self.expected
            )
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum UndoDispatch {
    NothingToUndo(UndoReport),
    Dispatched { expected: usize },
}

/// Holds at most one reversible batch. Recording a new batch replaces the
/// old one; an undo attempt always empties the slot, even when only part of
/// the batch could be restored.
#[derive(Debug, Default)]
pub struct UndoSlot {
    record: Option<UndoRecord>,
    pending: Option<(usize, Receiver<UndoEvent>)>,
}

impl UndoSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: UndoRecord) {
        if self.record.replace(record).is_some() {
            info!("replacing previous undo record");
        }
    }

    pub fn current(&self) -> Option<&UndoRecord> {
        self.record.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.record.is_some() && self.pending.is_none()
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    pub fn execute(&mut self, worker: &dyn SessionWorker) -> Result<UndoDispatch, ApplicationError> {
        if self.pending.is_some() {
            return Err(ApplicationError::UndoInProgress);
        }
        let Some(record) = self.record.as_ref() else {
            return Ok(UndoDispatch::NothingToUndo(UndoReport::nothing_to_undo()));
        };

        let expected = record.len();
        let (sender, receiver) = mpsc::channel();
        info!(expected, "dispatching undo");
        worker.begin_undo(sender)?;
        self.record = None;
        self.pending = Some((expected, receiver));
        Ok(UndoDispatch::Dispatched { expected })
    }

    pub fn poll(&mut self, mut observe: impl FnMut(&UndoEvent)) -> Option<UndoReport> {
        let (expected, receiver) = self.pending.as_ref()?;
        let expected = *expected;
        let event = match receiver.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                error!("undo worker hung up without a result");
                UndoEvent::default()
            }
        };
        self.pending = None;
        observe(&event);

        let report = UndoReport {
            expected,
            restored_count: event.restored_count,
            success: event.success && event.restored_count >= expected,
            restored: event.restored,
        };
        if !report.success {
            warn!(
                restored = report.restored_count,
                expected, "undo restored only part of the batch"
            );
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use photo_sorter_domain::UndoEntry;

    use super::*;
    use crate::fakes::{id, FakeWorker};

    fn record(values: &[i64]) -> UndoRecord {
        UndoRecord {
            target_dir: PathBuf::from("/sorted"),
            entries: values
                .iter()
                .map(|value| UndoEntry {
                    image_id: id(*value),
                    original_path: PathBuf::from(format!("/photos/img{value}.jpg")),
                    moved_path: PathBuf::from(format!("/sorted/Alice/img{value}.jpg")),
                })
                .collect(),
        }
    }

    #[test]
    fn execute_empties_the_slot_and_blocks_reentry() {
        let worker = FakeWorker::default();
        let mut slot = UndoSlot::new();
        slot.record(record(&[1, 2]));
        assert!(slot.is_available());

        let dispatch = slot.execute(&worker).expect("dispatched");
        assert_eq!(dispatch, UndoDispatch::Dispatched { expected: 2 });
        assert!(slot.current().is_none());
        assert!(slot.is_running());
        assert!(matches!(
            slot.execute(&worker),
            Err(ApplicationError::UndoInProgress)
        ));
    }

    #[test]
    fn short_restore_is_not_a_success() {
        let worker = FakeWorker::default();
        let mut slot = UndoSlot::new();
        slot.record(record(&[1, 2]));
        slot.execute(&worker).expect("dispatched");
        assert!(slot.poll(|_| {}).is_none());

        worker
            .undo_sender()
            .send(UndoEvent {
                restored_count: 1,
                success: true,
                restored: vec![id(1)],
            })
            .expect("listening");
        let report = slot.poll(|_| {}).expect("terminal");
        assert!(!report.success);
        assert_eq!(
            report.status_message(),
            "Undo restored only 1 of 2 files; the rest could not be put back."
        );
        assert!(!slot.is_running());
        assert!(!slot.is_available());
    }

    #[test]
    fn hang_up_reports_nothing_restored() {
        let worker = FakeWorker::default();
        let mut slot = UndoSlot::new();
        slot.record(record(&[1]));
        slot.execute(&worker).expect("dispatched");
        worker.log.borrow_mut().undo_senders.clear();

        let report = slot.poll(|_| {}).expect("terminal");
        assert_eq!(report.restored_count, 0);
        assert!(!report.success);
    }

    #[test]
    fn empty_slot_has_nothing_to_undo() {
        let worker = FakeWorker::default();
        let mut slot = UndoSlot::new();
        match slot.execute(&worker).expect("accepted") {
            UndoDispatch::NothingToUndo(report) => {
                assert_eq!(report.status_message(), "Nothing to undo.")
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
        assert!(worker.log.borrow().undo_senders.is_empty());
    }
}
