use super::walk;
use super::{BatchUnit, UnitHandle};
use crate::error::Error;
use crate::image::ImageIo;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

#[derive(Debug, Clone)]
struct LocalEntry {
    path: PathBuf,
    series: usize,
    series_count: usize,
    file_number: usize,
}

/// Images found in a directory, one entry per series.
///
/// Built by probing every candidate file up front so the count is known
/// before processing starts. Consumed by value: the units can be walked once.
#[derive(Debug, Default)]
pub struct LocalImages {
    entries: Vec<LocalEntry>,
    failures: Vec<(PathBuf, String)>,
    file_count: usize,
}

impl LocalImages {
    pub fn scan(
        io: &dyn ImageIo,
        root: &Path,
        recursive: bool,
        ignore_patterns: &[String],
    ) -> Result<Self, Error> {
        let files = walk::list_files(root, recursive, ignore_patterns)?;
        debug!("{} candidate files under {}", files.len(), root.display());
        Ok(Self::from_files(io, files))
    }

    /// Probes `files` in order. A file consumed by an earlier multi-file
    /// decode is skipped; a file that fails to decode contributes nothing.
    pub fn from_files(io: &dyn ImageIo, files: Vec<PathBuf>) -> Self {
        let file_count = files.len();
        let mut entries = Vec::new();
        let mut failures = Vec::new();
        let mut used: HashSet<PathBuf> = HashSet::new();
        let mut consumed = 0usize;

        for file in files {
            let key = normalize(&file);
            if used.contains(&key) {
                debug!("Skipping {}, already read with another file", file.display());
                continue;
            }

            match io.probe(&file) {
                Ok(probe) => {
                    used.insert(key);
                    for member in &probe.used_files {
                        used.insert(normalize(member));
                    }
                    consumed += probe.used_files.len().max(1);
                    for series in 0..probe.series_count {
                        entries.push(LocalEntry {
                            path: file.clone(),
                            series,
                            series_count: probe.series_count,
                            file_number: consumed.min(file_count),
                        });
                    }
                }
                Err(e) => {
                    error!("Could not read {}: {}", file.display(), e);
                    consumed += 1;
                    failures.push((file, e.to_string()));
                }
            }
        }

        Self {
            entries,
            failures,
            file_count,
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Files that could not be decoded, with the reason.
    pub fn failures(&self) -> &[(PathBuf, String)] {
        &self.failures
    }

    pub fn into_units(self) -> impl Iterator<Item = BatchUnit> {
        let file_count = self.file_count;
        self.entries.into_iter().map(move |entry| BatchUnit {
            handle: UnitHandle::Local {
                path: entry.path,
                series: entry.series,
            },
            progress: format!(
                "File {}/{}, image {}/{}",
                entry.file_number,
                file_count,
                entry.series + 1,
                entry.series_count
            ),
        })
    }
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
