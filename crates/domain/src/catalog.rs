use std::collections::BTreeSet;
use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::{DomainError, Image, ImageId, ImageStatus};

/// Discovered images in discovery order, plus the selection scoped to them.
///
/// The selection lives here so that clearing the catalog clears it in the
/// same step; it can only ever name ids that are present.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    images: IndexMap<ImageId, Image>,
    selection: IndexSet<ImageId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    pub images: Vec<Image>,
    pub selection: Vec<ImageId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.selection.clear();
    }

    pub fn append(&mut self, image: Image) -> Result<(), DomainError> {
        if self.images.contains_key(&image.id) {
            return Err(DomainError::DuplicateImageId(image.id));
        }
        self.images.insert(image.id, image);
        Ok(())
    }

    /// Returns `Ok(false)` when the id is unknown.
    pub fn update_person(&mut self, id: ImageId, person: &str) -> Result<bool, DomainError> {
        let Some(image) = self.images.get_mut(&id) else {
            return Ok(false);
        };
        if !matches!(image.status, ImageStatus::Scanned | ImageStatus::Ready) {
            return Err(DomainError::NotAssignable {
                image_id: id,
                status: image.status.clone(),
            });
        }
        if !image.persons.contains(person) {
            return Err(DomainError::PersonNotCandidate {
                image_id: id,
                person: person.to_string(),
            });
        }
        image.selected_person = Some(person.to_string());
        if image.status == ImageStatus::Scanned {
            image.status = ImageStatus::Ready;
        }
        Ok(true)
    }

    pub fn clear_person(&mut self, id: ImageId) -> bool {
        match self.images.get_mut(&id) {
            Some(image) if image.status == ImageStatus::Ready => {
                image.selected_person = None;
                image.status = ImageStatus::Scanned;
                true
            }
            _ => false,
        }
    }

    /// Bulk transition. Moving back to `Scanned` also drops the assignment
    /// and the recorded destination. Returns how many images were touched.
    pub fn mark_status<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a ImageId>,
        status: ImageStatus,
    ) -> usize {
        let mut touched = 0;
        for id in ids {
            let Some(image) = self.images.get_mut(id) else {
                continue;
            };
            if status == ImageStatus::Scanned {
                image.selected_person = None;
                image.moved_to = None;
            }
            image.status = status.clone();
            touched += 1;
        }
        touched
    }

    pub fn record_destination(&mut self, id: ImageId, destination: PathBuf) -> bool {
        match self.images.get_mut(&id) {
            Some(image) => {
                image.moved_to = Some(destination);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ImageId) -> Option<&Image> {
        self.images.get(&id)
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.images.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Image> {
        self.images.values()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn distinct_persons(&self) -> BTreeSet<&str> {
        self.images
            .values()
            .flat_map(|image| image.persons.iter().map(String::as_str))
            .collect()
    }

    pub fn select(&mut self, id: ImageId) -> bool {
        self.images.contains_key(&id) && self.selection.insert(id)
    }

    pub fn deselect(&mut self, id: ImageId) -> bool {
        self.selection.shift_remove(&id)
    }

    pub fn select_all(&mut self) {
        self.selection.extend(self.images.keys().copied());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: ImageId) -> bool {
        self.selection.contains(&id)
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Selected images in catalog order, not selection order.
    pub fn selected(&self) -> impl Iterator<Item = &Image> {
        self.images
            .values()
            .filter(|image| self.selection.contains(&image.id))
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            images: self.images.values().cloned().collect(),
            selection: self.selection.iter().copied().collect(),
        }
    }
}
