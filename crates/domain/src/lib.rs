mod batch;
mod catalog;
mod error;
mod image;

pub use batch::{destination_dir, MoveBatch, MoveItem, UndoEntry, UndoRecord};
pub use catalog::{Catalog, CatalogSnapshot};
pub use error::DomainError;
pub use image::{is_supported_image, Image, ImageId, ImageStatus, IMAGE_EXTENSIONS};
