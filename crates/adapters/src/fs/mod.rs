mod clock;
mod metadata;
mod mover;
mod scanner;
mod thumbs;

pub use clock::SystemClock;
pub use metadata::{read_person_tags, PersonTags};
pub use mover::{free_destination, move_no_replace, remove_empty_dirs};
pub use scanner::WalkdirFileScanner;
pub use thumbs::ThumbnailCache;
