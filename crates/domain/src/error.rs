use thiserror::Error;

use crate::{ImageId, ImageStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("image id must be positive, got {0}")]
    InvalidImageId(i64),
    #[error("image id {0} is already in the catalog")]
    DuplicateImageId(ImageId),
    #[error("person {person:?} is not a candidate for image {image_id}")]
    PersonNotCandidate { image_id: ImageId, person: String },
    #[error("image {image_id} cannot be assigned while {status}")]
    NotAssignable {
        image_id: ImageId,
        status: ImageStatus,
    },
}
