use photo_sorter_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("target directory must not be empty")]
    MissingTarget,
    #[error("nothing to move: no selected image has a person assigned ({unassigned} selected without one)")]
    EmptyBatch { unassigned: usize },
    #[error("a scan is already running")]
    ScanInProgress,
    #[error("a move batch is already running")]
    MoveInProgress,
    #[error("an undo is already running")]
    UndoInProgress,
    #[error("worker error: {0}")]
    Worker(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("decode error: {0}")]
    Decode(String),
}
