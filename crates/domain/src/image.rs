use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::DomainError;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "tiff", "tif", "bmp", "gif", "heic", "heif", "avif",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ImageId(i64);

impl ImageId {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::InvalidImageId(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for ImageId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ImageId> for i64 {
    fn from(value: ImageId) -> Self {
        value.0
    }
}

impl Display for ImageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of one image within a session.
///
/// `Ready` always implies a `selected_person`. `Moved` and `Errored` are
/// terminal until an undo returns the image to `Scanned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageStatus {
    Scanned,
    Ready,
    Moving,
    Moved,
    Errored(String),
}

impl ImageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Moved | Self::Errored(_))
    }
}

impl Display for ImageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanned => write!(f, "scanned"),
            Self::Ready => write!(f, "ready"),
            Self::Moving => write!(f, "moving"),
            Self::Moved => write!(f, "moved"),
            Self::Errored(reason) => write!(f, "errored ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub path: PathBuf,
    pub filename: String,
    pub persons: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
    pub thumbnail: Option<PathBuf>,
    pub selected_person: Option<String>,
    pub status: ImageStatus,
    /// Where the file landed after a move; cleared again by undo.
    pub moved_to: Option<PathBuf>,
}

impl Image {
    pub fn new(
        id: ImageId,
        path: PathBuf,
        persons: impl IntoIterator<Item = String>,
        keywords: impl IntoIterator<Item = String>,
    ) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id,
            path,
            filename,
            persons: persons.into_iter().collect(),
            keywords: keywords.into_iter().collect(),
            thumbnail: None,
            selected_person: None,
            status: ImageStatus::Scanned,
            moved_to: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<PathBuf>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.status == ImageStatus::Ready && self.selected_person.is_some()
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}
