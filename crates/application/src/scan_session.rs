use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use photo_sorter_domain::Catalog;
use tracing::{debug, error, info, warn};

use crate::{ApplicationError, ScanEvent, ScanRequest, SessionWorker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed(String),
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed(_))
    }
}

impl Display for ScanState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub state: ScanState,
    pub scanned: usize,
    pub added: usize,
    pub item_errors: usize,
}

impl ScanSummary {
    pub fn status_message(&self) -> String {
        let counts = format!(
            "{} scanned, {} added, {} unreadable",
            self.scanned, self.added, self.item_errors
        );
        match &self.state {
            ScanState::Completed => format!("Scan completed: {counts}."),
            ScanState::Cancelled => format!("Scan cancelled: {counts}; partial results kept."),
            ScanState::Failed(reason) => format!("Scan failed ({reason}): {counts}."),
            ScanState::Idle | ScanState::Running => format!("Scan {}: {counts}.", self.state),
        }
    }
}

/// One scan run, from dispatch to its terminal summary.
#[derive(Debug)]
pub struct ScanSession {
    state: ScanState,
    events: Option<Receiver<ScanEvent>>,
    cancel_requested: bool,
    scanned: usize,
    added: usize,
    item_errors: usize,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            events: None,
            cancel_requested: false,
            scanned: 0,
            added: 0,
            item_errors: 0,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ScanState::Running
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// Dispatches the scan and, once the worker accepted it, discards the
    /// previous catalog generation. Nothing changes when dispatch fails.
    pub fn start(
        &mut self,
        request: ScanRequest,
        catalog: &mut Catalog,
        worker: &dyn SessionWorker,
    ) -> Result<(), ApplicationError> {
        if self.state != ScanState::Idle {
            return Err(ApplicationError::ScanInProgress);
        }
        if request.source_dir.as_os_str().is_empty() {
            return Err(ApplicationError::InvalidInput(
                "source directory must not be empty".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::channel();
        info!(
            source = %request.source_dir.display(),
            include_subdirs = request.include_subdirs,
            "starting scan"
        );
        worker.begin_scan(request, sender)?;

        catalog.clear();
        self.events = Some(receiver);
        self.state = ScanState::Running;
        Ok(())
    }

    /// Returns `false` when there is nothing running to cancel.
    pub fn cancel(&mut self, worker: &dyn SessionWorker) -> bool {
        if !self.is_running() {
            return false;
        }
        if !self.cancel_requested {
            info!("requesting scan cancellation");
            worker.cancel_scan();
            self.cancel_requested = true;
        }
        true
    }

    /// Applies every event already delivered, in arrival order, calling
    /// `observe` for each. Returns the summary once the session terminated;
    /// the event channel is dropped at that point.
    pub fn poll(
        &mut self,
        catalog: &mut Catalog,
        mut observe: impl FnMut(&ScanEvent),
    ) -> Option<ScanSummary> {
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
                    error!("scan worker hung up before finishing");
                    return Some(self.finish(ScanState::Failed(
                        "worker stopped without finishing the scan".to_string(),
                    )));
                }
            }
        }
    }

    pub fn apply(&mut self, event: ScanEvent, catalog: &mut Catalog) -> Option<ScanSummary> {
        if !self.is_running() {
            debug!("ignoring scan event for a session that is not running");
            return None;
        }

        self.scanned = self.scanned.max(event.scanned);
        if let Some(image) = event.image {
            let image_id = image.id;
            match catalog.append(image) {
                Ok(()) => {
                    self.added += 1;
                    debug!(image_id = image_id.get(), scanned = self.scanned, "image discovered");
                }
                Err(violation) => {
                    error!(%violation, "worker sent an image the catalog cannot take");
                    debug_assert!(false, "scan worker violated catalog invariant: {violation}");
                    self.item_errors += 1;
                }
            }
        } else if let (Some(reason), false) = (&event.error, event.done) {
            warn!(%reason, "file could not be scanned");
            self.item_errors += 1;
        }

        if !event.done {
            return None;
        }

        let state = match event.error {
            Some(reason) if !event.cancelled => ScanState::Failed(reason),
            _ if event.cancelled || self.cancel_requested => ScanState::Cancelled,
            _ => ScanState::Completed,
        };
        Some(self.finish(state))
    }

    fn finish(&mut self, state: ScanState) -> ScanSummary {
        self.events = None;
        self.state = state;
        let summary = ScanSummary {
            state: self.state.clone(),
            scanned: self.scanned.max(self.added),
            added: self.added,
            item_errors: self.item_errors,
        };
        info!(state = %summary.state, scanned = summary.scanned, added = summary.added, "scan finished");
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::fakes::{image, FakeWorker};

    fn request() -> ScanRequest {
        ScanRequest {
            source_dir: PathBuf::from("/photos"),
            include_subdirs: true,
        }
    }

    #[test]
    fn start_clears_previous_generation_only_after_dispatch() {
        let worker = FakeWorker::default();
        let mut catalog = Catalog::new();
        catalog.append(image(1, &[])).expect("fresh id");

        worker.log.borrow_mut().refuse_dispatch = true;
        let mut session = ScanSession::new();
        assert!(session.start(request(), &mut catalog, &worker).is_err());
        assert_eq!(catalog.len(), 1);
        assert_eq!(session.state(), &ScanState::Idle);

        worker.log.borrow_mut().refuse_dispatch = false;
        session
            .start(request(), &mut catalog, &worker)
            .expect("dispatched");
        assert!(catalog.is_empty());
        assert!(session.is_running());
        assert!(worker.log.borrow().scan_requests[0].include_subdirs);
    }

    #[test]
    fn unreadable_files_are_counted_not_fatal() {
        let worker = FakeWorker::default();
        let mut catalog = Catalog::new();
        let mut session = ScanSession::new();
        session
            .start(request(), &mut catalog, &worker)
            .expect("dispatched");

        let sender = worker.scan_sender();
        sender
            .send(ScanEvent::discovered(1, image(1, &["Alice"])))
            .expect("listening");
        sender
            .send(ScanEvent::item_failed(2, "truncated file"))
            .expect("listening");
        sender.send(ScanEvent::finished(2, false)).expect("listening");

        let mut seen = 0;
        let summary = session
            .poll(&mut catalog, |_| seen += 1)
            .expect("terminal event delivered");
        assert_eq!(seen, 3);
        assert_eq!(summary.state, ScanState::Completed);
        assert_eq!((summary.scanned, summary.added, summary.item_errors), (2, 1, 1));
        assert_eq!(
            summary.status_message(),
            "Scan completed: 2 scanned, 1 added, 1 unreadable."
        );
    }

    #[test]
    fn fatal_event_fails_the_session() {
        let worker = FakeWorker::default();
        let mut catalog = Catalog::new();
        let mut session = ScanSession::new();
        session
            .start(request(), &mut catalog, &worker)
            .expect("dispatched");
        worker
            .scan_sender()
            .send(ScanEvent::fatal(0, "source directory does not exist"))
            .expect("listening");

        let summary = session.poll(&mut catalog, |_| {}).expect("terminal");
        assert_eq!(
            summary.state,
            ScanState::Failed("source directory does not exist".to_string())
        );
        assert!(session.state().is_terminal());
        assert!(session.poll(&mut catalog, |_| {}).is_none());
    }

    #[test]
    fn cancel_is_a_no_op_before_start() {
        let worker = FakeWorker::default();
        let mut session = ScanSession::new();
        assert!(!session.cancel(&worker));
        assert!(!session.cancel_requested());
        assert_eq!(worker.log.borrow().cancel_calls, 0);
    }
}
