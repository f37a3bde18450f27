use std::path::{Path, PathBuf};

use photo_sorter_application::ApplicationError;
use photo_sorter_domain::is_supported_image;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, Copy)]
pub struct WalkdirFileScanner;

impl WalkdirFileScanner {
    /// Lists supported image files under `folder`, sorted by path. Without
    /// `include_subdirs` only the folder's direct children are considered.
    pub fn scan_supported(
        &self,
        folder: &Path,
        include_subdirs: bool,
    ) -> Result<Vec<PathBuf>, ApplicationError> {
        if !folder.is_dir() {
            return Err(ApplicationError::InvalidInput(format!(
                "folder does not exist or is not a directory: {}",
                folder.display()
            )));
        }

        let mut walker = WalkDir::new(folder).min_depth(1);
        if !include_subdirs {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(%error, "skipping unreadable directory entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && is_supported_image(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}
