mod controller;
mod error;
mod move_session;
mod ports;
mod scan_session;
mod snapshot;
mod undo_slot;
mod use_cases;

#[cfg(test)]
mod fakes;

pub use controller::{AutoAssignPolicy, SessionController};
pub use error::ApplicationError;
pub use move_session::{MoveSession, MoveStarted, MoveState, MoveSummary};
pub use ports::{
    ItemOutcome, MoveEvent, ScanEvent, ScanRequest, SessionObserver, SessionWorker, UndoEvent,
};
pub use scan_session::{ScanSession, ScanState, ScanSummary};
pub use snapshot::SessionSnapshot;
pub use undo_slot::{UndoDispatch, UndoReport, UndoSlot};
pub use use_cases::{
    AssignPersonCommand, CancelScanCommand, SelectionCommand, SnapshotQuery, StartMoveCommand,
    StartScanCommand, UnassignPersonCommand, UndoMoveCommand,
};
