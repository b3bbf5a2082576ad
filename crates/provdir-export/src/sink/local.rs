use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::OutputStore;
use crate::error::DeliveryError;

/// `<path>.zip`
pub fn archive_path_for(path: &Path) -> PathBuf {
    let mut archive = path.as_os_str().to_owned();
    archive.push(".zip");
    PathBuf::from(archive)
}

/// Filesystem-backed store
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOutputStore;

impl LocalOutputStore {
    pub fn new() -> Self {
        Self
    }

    fn create_new(path: &Path) -> Result<File, DeliveryError> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| DeliveryError::io(path, e))
    }

    /// Remove a file this store created when filling it failed, so a partial
    /// file never blocks a later create-only write to the same path.
    fn discard_on_error<T>(
        path: &Path,
        result: Result<T, DeliveryError>,
    ) -> Result<T, DeliveryError> {
        if result.is_err() {
            if let Err(e) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove partial output");
            }
        }
        result
    }

    fn fill_archive(
        file: File,
        archive_path: &Path,
        entry_name: String,
        text: &str,
    ) -> Result<(), DeliveryError> {
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(entry_name, options)
            .map_err(|e| DeliveryError::archive(archive_path, e.to_string()))?;
        zip.write_all(text.as_bytes())
            .map_err(|e| DeliveryError::io(archive_path, e))?;
        zip.finish()
            .map_err(|e| DeliveryError::archive(archive_path, e.to_string()))?;
        Ok(())
    }
}

impl OutputStore for LocalOutputStore {
    fn ensure_dir(&self, dir: &Path) -> Result<(), DeliveryError> {
        fs::create_dir_all(dir).map_err(|e| DeliveryError::io(dir, e))
    }

    fn write_new(&self, path: &Path, text: &str) -> Result<(), DeliveryError> {
        let mut file = Self::create_new(path)?;
        let written = file
            .write_all(text.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.flush())
            .map_err(|e| DeliveryError::io(path, e));
        drop(file);
        Self::discard_on_error(path, written)?;

        debug!(path = %path.display(), bytes = text.len() + 1, "Wrote output file");
        Ok(())
    }

    fn write_archive(&self, path: &Path, text: &str) -> Result<PathBuf, DeliveryError> {
        let archive_path = archive_path_for(path);
        let entry_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| DeliveryError::archive(path, "output path has no file name"))?;

        let file = Self::create_new(&archive_path)?;
        let filled = Self::fill_archive(file, &archive_path, entry_name, text);
        Self::discard_on_error(&archive_path, filled)?;

        debug!(archive = %archive_path.display(), bytes = text.len(), "Wrote output archive");
        Ok(archive_path)
    }
}
