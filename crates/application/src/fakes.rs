use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::Sender;

use photo_sorter_domain::{Image, ImageId, MoveBatch, UndoRecord};

use crate::{
    ApplicationError, MoveEvent, ScanEvent, ScanRequest, SessionObserver, SessionWorker,
    UndoEvent,
};

#[derive(Default)]
pub(crate) struct WorkerLog {
    pub scan_requests: Vec<ScanRequest>,
    pub scan_senders: Vec<Sender<ScanEvent>>,
    pub cancel_calls: usize,
    pub batches: Vec<MoveBatch>,
    pub move_senders: Vec<Sender<MoveEvent>>,
    pub undo_senders: Vec<Sender<UndoEvent>>,
    pub persisted: Option<UndoRecord>,
    pub refuse_dispatch: bool,
}

/// Worker that only records what it was asked to do; tests push the events.
#[derive(Clone, Default)]
pub(crate) struct FakeWorker {
    pub log: Rc<RefCell<WorkerLog>>,
}

impl FakeWorker {
    pub fn scan_sender(&self) -> Sender<ScanEvent> {
        self.log
            .borrow()
            .scan_senders
            .last()
            .cloned()
            .expect("a scan was dispatched")
    }

    pub fn move_sender(&self) -> Sender<MoveEvent> {
        self.log
            .borrow()
            .move_senders
            .last()
            .cloned()
            .expect("a move was dispatched")
    }

    pub fn undo_sender(&self) -> Sender<UndoEvent> {
        self.log
            .borrow()
            .undo_senders
            .last()
            .cloned()
            .expect("an undo was dispatched")
    }

    pub fn last_batch(&self) -> MoveBatch {
        self.log
            .borrow()
            .batches
            .last()
            .cloned()
            .expect("a move was dispatched")
    }

    fn refuse(&self) -> Result<(), ApplicationError> {
        if self.log.borrow().refuse_dispatch {
            return Err(ApplicationError::Worker("worker is gone".to_string()));
        }
        Ok(())
    }
}

impl SessionWorker for FakeWorker {
    fn begin_scan(
        &self,
        request: ScanRequest,
        events: Sender<ScanEvent>,
    ) -> Result<(), ApplicationError> {
        self.refuse()?;
        let mut log = self.log.borrow_mut();
        log.scan_requests.push(request);
        log.scan_senders.push(events);
        Ok(())
    }

    fn cancel_scan(&self) {
        self.log.borrow_mut().cancel_calls += 1;
    }

    fn begin_move(
        &self,
        batch: MoveBatch,
        events: Sender<MoveEvent>,
    ) -> Result<(), ApplicationError> {
        self.refuse()?;
        let mut log = self.log.borrow_mut();
        log.batches.push(batch);
        log.move_senders.push(events);
        Ok(())
    }

    fn begin_undo(&self, events: Sender<UndoEvent>) -> Result<(), ApplicationError> {
        self.refuse()?;
        self.log.borrow_mut().undo_senders.push(events);
        Ok(())
    }

    fn latest_undo_record(&self) -> Result<Option<UndoRecord>, ApplicationError> {
        Ok(self.log.borrow().persisted.clone())
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingObserver {
    pub lines: Rc<RefCell<Vec<String>>>,
}

impl SessionObserver for RecordingObserver {
    fn on_scan_event(&self, event: &ScanEvent) {
        self.lines
            .borrow_mut()
            .push(format!("scan {} done={}", event.scanned, event.done));
    }

    fn on_move_progress(&self, event: &MoveEvent) {
        self.lines.borrow_mut().push(format!(
            "move {}/{} done={}",
            event.moved_count, event.total, event.done
        ));
    }

    fn on_undo_finished(&self, event: &UndoEvent) {
        self.lines
            .borrow_mut()
            .push(format!("undo {}", event.restored_count));
    }

    fn on_status(&self, message: &str) {
        self.lines.borrow_mut().push(format!("status {message}"));
    }
}

pub(crate) fn id(value: i64) -> ImageId {
    ImageId::new(value).expect("positive id")
}

pub(crate) fn image(value: i64, persons: &[&str]) -> Image {
    Image::new(
        id(value),
        PathBuf::from(format!("/photos/img{value}.jpg")),
        persons.iter().map(|person| person.to_string()),
        ["holiday".to_string()],
    )
}
