use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Catalog, ImageId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveItem {
    pub image_id: ImageId,
    pub source_path: PathBuf,
    pub filename: String,
    pub person: String,
}

/// Validated, ordered input of one move run. Never mutated after dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveBatch {
    pub target_dir: PathBuf,
    pub items: Vec<MoveItem>,
}

impl MoveBatch {
    /// Builds a batch from the selected images that are `Ready`, in catalog
    /// order. The second value counts selected images left out because no
    /// person was assigned to them.
    pub fn from_selection(catalog: &Catalog, target_dir: &Path) -> (Self, usize) {
        let mut items = Vec::new();
        let mut unassigned = 0;
        for image in catalog.selected() {
            match (&image.selected_person, image.is_ready()) {
                (Some(person), true) => items.push(MoveItem {
                    image_id: image.id,
                    source_path: image.path.clone(),
                    filename: image.filename.clone(),
                    person: person.clone(),
                }),
                _ => unassigned += 1,
            }
        }
        (
            Self {
                target_dir: target_dir.to_path_buf(),
                items,
            },
            unassigned,
        )
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn image_ids(&self) -> Vec<ImageId> {
        self.items.iter().map(|item| item.image_id).collect()
    }
}

/// Directory a person's images are moved into: `target_dir/<person>`.
///
/// Path separators and characters most filesystems reject are replaced so a
/// label can never escape `target_dir`.
pub fn destination_dir(target_dir: &Path, person: &str) -> PathBuf {
    let mut name: String = person
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    if name.chars().all(|ch| ch == '.') {
        name = "_".repeat(name.len().max(1));
    }
    target_dir.join(name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoEntry {
    pub image_id: ImageId,
    pub original_path: PathBuf,
    pub moved_path: PathBuf,
}

/// Reversible description of the last completed move batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    pub target_dir: PathBuf,
    pub entries: Vec<UndoEntry>,
}

impl UndoRecord {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
