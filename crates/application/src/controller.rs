use std::path::PathBuf;

use photo_sorter_domain::{Catalog, ImageId, ImageStatus};
use tracing::{info, warn};

use crate::{
    ApplicationError, AssignPersonCommand, CancelScanCommand, MoveSession, MoveStarted,
    MoveSummary, ScanRequest, ScanSession, ScanState, ScanSummary, SelectionCommand,
    SessionObserver, SessionSnapshot, SessionWorker, SnapshotQuery, StartMoveCommand,
    StartScanCommand, UnassignPersonCommand, UndoDispatch, UndoMoveCommand, UndoReport, UndoSlot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoAssignPolicy {
    /// Only images with exactly one candidate person.
    SingleCandidate,
    /// Every image with candidates gets the first one in label order.
    FirstCandidate,
}

/// Process-wide owner of the catalog, the active sessions and the undo slot.
///
/// All methods are meant to be called from one logical thread. Worker
/// results are applied only inside [`SessionController::process_events`],
/// so a snapshot never observes a half-applied event.
pub struct SessionController {
    worker: Box<dyn SessionWorker>,
    observers: Vec<Box<dyn SessionObserver>>,
    catalog: Catalog,
    scan: Option<ScanSession>,
    scan_state: ScanState,
    move_session: Option<MoveSession>,
    undo: UndoSlot,
    status_message: String,
    last_scan: Option<ScanSummary>,
    last_move: Option<MoveSummary>,
    last_undo: Option<UndoReport>,
}

impl SessionController {
    pub fn new(worker: Box<dyn SessionWorker>) -> Self {
        Self {
            worker,
            observers: Vec::new(),
            catalog: Catalog::new(),
            scan: None,
            scan_state: ScanState::Idle,
            move_session: None,
            undo: UndoSlot::new(),
            status_message: "Ready.".to_string(),
            last_scan: None,
            last_move: None,
            last_undo: None,
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// Seeds the undo slot from the batch the worker persisted last, so a
    /// fresh process can still reverse it.
    pub fn bootstrap(&mut self) -> Result<(), ApplicationError> {
        if let Some(record) = self.worker.latest_undo_record()? {
            info!(entries = record.len(), "restored undo record from worker log");
            self.undo.record(record);
            self.set_status("Ready. The last move batch can be undone.".to_string());
        }
        Ok(())
    }

    pub fn start_scan(&mut self, command: StartScanCommand) -> Result<(), ApplicationError> {
        self.ensure_idle()
            .and_then(|()| {
                let mut session = ScanSession::new();
                session.start(
                    ScanRequest {
                        source_dir: PathBuf::from(command.source_dir.trim()),
                        include_subdirs: command.include_subdirs,
                    },
                    &mut self.catalog,
                    self.worker.as_ref(),
                )?;
                self.scan = Some(session);
                Ok(())
            })
            .map_err(|error| self.reject(error))?;

        self.scan_state = ScanState::Running;
        self.set_status(format!("Scanning {}...", command.source_dir.trim()));
        Ok(())
    }

    /// Safe to call at any time; returns whether a running scan was asked
    /// to stop. The session stays running until the worker confirms.
    pub fn cancel_scan(&mut self, _command: CancelScanCommand) -> bool {
        let requested = match self.scan.as_mut() {
            Some(scan) => scan.cancel(self.worker.as_ref()),
            None => false,
        };
        if requested {
            self.set_status("Cancelling scan...".to_string());
        }
        requested
    }

    /// Returns `Ok(false)` when the image is not in the catalog.
    pub fn assign_person(&mut self, command: AssignPersonCommand) -> Result<bool, ApplicationError> {
        Ok(self
            .catalog
            .update_person(command.image_id, &command.person)?)
    }

    pub fn unassign_person(&mut self, command: UnassignPersonCommand) -> bool {
        self.catalog.clear_person(command.image_id)
    }

    pub fn auto_assign(&mut self, policy: AutoAssignPolicy) -> usize {
        let picks: Vec<(ImageId, String)> = self
            .catalog
            .iter()
            .filter(|image| image.status == ImageStatus::Scanned)
            .filter_map(|image| {
                let first = image.persons.iter().next()?;
                match policy {
                    AutoAssignPolicy::SingleCandidate if image.persons.len() != 1 => None,
                    _ => Some((image.id, first.clone())),
                }
            })
            .collect();

        let mut assigned = 0;
        for (image_id, person) in picks {
            if let Ok(true) = self.catalog.update_person(image_id, &person) {
                assigned += 1;
            }
        }
        assigned
    }

    pub fn update_selection(&mut self, command: SelectionCommand) {
        match command {
            SelectionCommand::Select(ids) => {
                for id in ids {
                    self.catalog.select(id);
                }
            }
            SelectionCommand::Deselect(ids) => {
                for id in ids {
                    self.catalog.deselect(id);
                }
            }
            SelectionCommand::SelectAll => self.catalog.select_all(),
            SelectionCommand::Clear => self.catalog.clear_selection(),
        }
    }

    pub fn start_move(&mut self, command: StartMoveCommand) -> Result<MoveStarted, ApplicationError> {
        let started = self
            .ensure_idle()
            .and_then(|()| {
                let mut session = MoveSession::new();
                let started = session.start(
                    &PathBuf::from(command.target_dir.trim()),
                    &mut self.catalog,
                    self.worker.as_ref(),
                )?;
                self.move_session = Some(session);
                Ok(started)
            })
            .map_err(|error| self.reject(error))?;

        self.set_status(format!(
            "Moving {} images into {} ({} selected without a person)...",
            started.total,
            command.target_dir.trim(),
            started.unassigned
        ));
        Ok(started)
    }

    pub fn undo(&mut self, _command: UndoMoveCommand) -> Result<UndoDispatch, ApplicationError> {
        let dispatch = self
            .ensure_idle()
            .and_then(|()| self.undo.execute(self.worker.as_ref()))
            .map_err(|error| self.reject(error))?;

        match &dispatch {
            UndoDispatch::NothingToUndo(report) => {
                self.set_status(report.status_message());
                self.last_undo = Some(report.clone());
            }
            UndoDispatch::Dispatched { expected } => {
                self.set_status(format!("Undoing last move ({expected} files)..."));
            }
        }
        Ok(dispatch)
    }

    /// Applies every worker event delivered so far. Returns `true` when any
    /// session reached a terminal state.
    pub fn process_events(&mut self) -> bool {
        let mut finished = false;
        let observers = &self.observers;

        if let Some(scan) = self.scan.as_mut() {
            if let Some(summary) = scan.poll(&mut self.catalog, |event| {
                observers.iter().for_each(|observer| observer.on_scan_event(event));
            }) {
                self.scan = None;
                self.finish_scan(summary);
                finished = true;
            }
        }

        let observers = &self.observers;
        if let Some(session) = self.move_session.as_mut() {
            if let Some(summary) = session.poll(&mut self.catalog, |event| {
                observers.iter().for_each(|observer| observer.on_move_progress(event));
            }) {
                self.move_session = None;
                self.finish_move(summary);
                finished = true;
            }
        }

        let observers = &self.observers;
        if let Some(report) = self.undo.poll(|event| {
            observers.iter().for_each(|observer| observer.on_undo_finished(event));
        }) {
            self.finish_undo(report);
            finished = true;
        }

        finished
    }

    pub fn snapshot(&self, _query: SnapshotQuery) -> SessionSnapshot {
        let catalog = self.catalog.snapshot();
        SessionSnapshot {
            total_images: catalog.images.len(),
            distinct_persons: self.distinct_person_count(),
            selected_count: catalog.selection.len(),
            images: catalog.images,
            selection: catalog.selection,
            scan_state: self.scan_state.clone(),
            scan_in_progress: self.scan.is_some(),
            move_in_progress: self.move_session.is_some(),
            move_progress: self
                .move_session
                .as_ref()
                .and_then(|session| session.last_progress().cloned()),
            undo_available: self.undo.is_available(),
            undo_in_progress: self.undo.is_running(),
            status_message: self.status_message.clone(),
            last_scan: self.last_scan.clone(),
            last_move: self.last_move.clone(),
            last_undo: self.last_undo.clone(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn total_images(&self) -> usize {
        self.catalog.len()
    }

    pub fn distinct_person_count(&self) -> usize {
        self.catalog.distinct_persons().len()
    }

    pub fn selected_count(&self) -> usize {
        self.catalog.selection_len()
    }

    pub fn undo_available(&self) -> bool {
        self.undo.is_available()
    }

    pub fn is_busy(&self) -> bool {
        self.scan.is_some() || self.move_session.is_some() || self.undo.is_running()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    fn ensure_idle(&self) -> Result<(), ApplicationError> {
        if self.scan.is_some() {
            return Err(ApplicationError::ScanInProgress);
        }
        if self.move_session.is_some() {
            return Err(ApplicationError::MoveInProgress);
        }
        if self.undo.is_running() {
            return Err(ApplicationError::UndoInProgress);
        }
        Ok(())
    }

    fn reject(&mut self, error: ApplicationError) -> ApplicationError {
        warn!(%error, "operation rejected");
        self.set_status(format!("Rejected: {error}"));
        error
    }

    fn finish_scan(&mut self, summary: ScanSummary) {
        self.scan_state = summary.state.clone();
        self.set_status(summary.status_message());
        self.last_scan = Some(summary);
    }

    fn finish_move(&mut self, summary: MoveSummary) {
        if let Some(record) = summary.undo_record.clone() {
            self.undo.record(record);
        }
        self.set_status(summary.status_message());
        self.last_move = Some(summary);
    }

    fn finish_undo(&mut self, report: UndoReport) {
        let reverted: Vec<ImageId> = report
            .restored
            .iter()
            .copied()
            .filter(|id| {
                self.catalog
                    .get(*id)
                    .is_some_and(|image| image.status == ImageStatus::Moved)
            })
            .collect();
        self.catalog.mark_status(&reverted, ImageStatus::Scanned);
        self.set_status(report.status_message());
        self.last_undo = Some(report);
    }

    fn set_status(&mut self, message: String) {
        info!(status = %message);
        for observer in &self.observers {
            observer.on_status(&message);
        }
        self.status_message = message;
    }
}
