use photo_sorter_domain::ImageId;

#[derive(Debug, Clone)]
pub struct StartScanCommand {
    pub source_dir: String,
    pub include_subdirs: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CancelScanCommand;

#[derive(Debug, Clone)]
pub struct AssignPersonCommand {
    pub image_id: ImageId,
    pub person: String,
}

#[derive(Debug, Clone, Copy)]
pub struct UnassignPersonCommand {
    pub image_id: ImageId,
}

#[derive(Debug, Clone)]
pub enum SelectionCommand {
    Select(Vec<ImageId>),
    Deselect(Vec<ImageId>),
    SelectAll,
    Clear,
}

#[derive(Debug, Clone)]
pub struct StartMoveCommand {
    pub target_dir: String,
}

#[derive(Debug, Clone, Default)]
pub struct UndoMoveCommand;

#[derive(Debug, Clone, Default)]
pub struct SnapshotQuery;
