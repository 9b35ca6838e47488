//! Filesystem access for the sync tool.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::{EncodingError, FileReader};

/// Reads file content straight from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileReader;

impl FileReader for FsFileReader {
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<Vec<u8>>> + Send {
        let path = path.to_path_buf();
        async move { tokio::fs::read(path).await }
    }
}

/// Regular files below `dir`, depth first, siblings ordered by name.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, EncodingError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| EncodingError::Read {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}
