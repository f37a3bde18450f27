use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// First free name for `filename` inside `dir`: the name itself, then
/// `stem_1.ext`, `stem_2.ext` and so on.
pub fn free_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = name
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|counter| dir.join(format!("{stem}_{counter}{ext}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Moves `source` to `destination` without ever replacing an existing file.
///
/// A hard link claims the destination atomically; when the filesystem
/// cannot link (other device, no link support) the bytes are copied into a
/// file opened with `create_new`. Either way the source is removed last.
pub fn move_no_replace(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::hard_link(source, destination) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::AlreadyExists => return Err(error),
        Err(error) => {
            debug!(%error, "hard link unavailable, copying instead");
            copy_new(source, destination)?;
        }
    }

    if let Err(error) = fs::remove_file(source) {
        // Leave exactly one copy behind.
        if let Err(cleanup) = fs::remove_file(destination) {
            warn!(%cleanup, destination = %destination.display(), "could not roll back placed copy");
        }
        return Err(error);
    }
    Ok(())
}

fn copy_new(source: &Path, destination: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let mut output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;
    if let Err(error) = io::copy(&mut input, &mut output).and_then(|_| output.sync_all()) {
        drop(output);
        let _ = fs::remove_file(destination);
        return Err(error);
    }
    Ok(())
}

/// Removes direct subdirectories of `root` that are empty. Returns how many
/// were removed.
pub fn remove_empty_dirs(root: &Path) -> usize {
    let Ok(entries) = fs::read_dir(root) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let is_empty = fs::read_dir(&path)
            .map(|mut children| children.next().is_none())
            .unwrap_or(false);
        if is_empty && fs::remove_dir(&path).is_ok() {
            debug!(dir = %path.display(), "removed empty directory");
            removed += 1;
        }
    }
    removed
}
