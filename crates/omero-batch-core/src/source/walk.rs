use glob::Pattern;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::{DirEntry, WalkDir};

/// Lists the regular files under `root`, sorted by name. Only the top level
/// is visited unless `recursive`. Hidden entries and paths matching one of
/// the glob ignore patterns are skipped.
pub fn list_files(root: &Path, recursive: bool, ignore_globs: &[String]) -> io::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        warn!("Input directory {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry) && !is_ignored(entry.path(), &ignore_patterns));

    let mut files = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let permission_denied = err
                    .io_error()
                    .is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied);
                if permission_denied {
                    error!("Access denied while listing {}: {}", root.display(), err);
                    continue;
                }
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("Error reading directory {}: {}", root.display(), err),
                ));
            }
        };

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_ignored(path: &Path, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(path))
}
