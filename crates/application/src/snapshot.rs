use photo_sorter_domain::{Image, ImageId};

use crate::{MoveEvent, MoveSummary, ScanState, ScanSummary, UndoReport};

/// Everything a presentation layer reads, copied out in one consistent
/// step. Counts are derived from the catalog at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub images: Vec<Image>,
    pub selection: Vec<ImageId>,
    pub scan_state: ScanState,
    pub scan_in_progress: bool,
    pub move_in_progress: bool,
    pub move_progress: Option<MoveEvent>,
    pub undo_available: bool,
    pub undo_in_progress: bool,
    pub status_message: String,
    pub total_images: usize,
    pub distinct_persons: usize,
    pub selected_count: usize,
    pub last_scan: Option<ScanSummary>,
    pub last_move: Option<MoveSummary>,
    pub last_undo: Option<UndoReport>,
}

impl SessionSnapshot {
    pub fn is_idle(&self) -> bool {
        !self.scan_in_progress && !self.move_in_progress && !self.undo_in_progress
    }
}
