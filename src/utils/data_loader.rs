//! Data loading and crash-safe saving

use crate::error::{PredictorError, Result};
use fd_lock::RwLock as FileLock;
use polars::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// CSV loader for activity logs
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for schema inference, `None` scans the whole file
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a comma-separated file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PredictorError::DataLoadError(format!("{}: {}", path.display(), e))
        })?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PredictorError::DataLoadError(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "loaded csv");
        Ok(df)
    }

    /// Header and row count without parsing the data
    pub fn file_info(&self, path: impl AsRef<Path>) -> Result<FileInfo> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)
            .map_err(|e| PredictorError::DataLoadError(format!("{}: {}", path.display(), e)))?;
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        let header = lines.next().transpose()?.unwrap_or_default();
        let columns: Vec<String> = header
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let n_rows = lines.filter(|l| l.as_ref().map_or(true, |l| !l.trim().is_empty())).count();

        Ok(FileInfo {
            path: path.display().to_string(),
            file_size: metadata.len(),
            n_rows,
            columns,
        })
    }
}

/// File information
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: String,
    pub file_size: u64,
    pub n_rows: usize,
    pub columns: Vec<String>,
}

/// CSV writer
pub struct DataSaver;

impl DataSaver {
    /// Serialize to CSV text in memory
    pub fn to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut df = df.clone();
        CsvWriter::new(&mut buffer)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| PredictorError::SerializationError(e.to_string()))?;
        Ok(buffer)
    }

    /// Save to CSV, replacing the target only once the full content is on disk
    pub fn save_csv_atomic(df: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = Self::to_csv_bytes(df)?;
        with_exclusive_lock(&lock_path_for(path), || write_atomic(path, &bytes))?;
        debug!(path = %path.display(), rows = df.height(), "saved csv");
        Ok(())
    }
}

/// Lock file guarding writes to `path`
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

/// Run `f` while holding an exclusive lock on `lock_path`
pub fn with_exclusive_lock<T>(lock_path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)?;
    let mut lock = FileLock::new(file);
    let _guard = lock.write()?;
    f()
}

/// Write through a sibling temp file and rename it over `path`
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = stage_temp(path, bytes)?;
    tmp.persist(path).map_err(|e| PredictorError::IoError(e.error))?;
    Ok(())
}

/// Replace several files as one unit.
///
/// Every temp file is written and synced before the first rename. When a
/// rename fails, the targets already replaced get their previous content
/// back (or are removed if they did not exist before).
pub fn write_atomic_all(files: &[(&Path, &[u8])]) -> Result<()> {
    let staged = files
        .iter()
        .map(|(path, bytes)| stage_temp(path, bytes))
        .collect::<Result<Vec<_>>>()?;
    let backups = files
        .iter()
        .map(|(path, _)| read_existing(path))
        .collect::<Result<Vec<_>>>()?;

    for (i, ((path, _), tmp)) in files.iter().zip(staged).enumerate() {
        if let Err(e) = tmp.persist(path) {
            for ((done, _), backup) in files[..i].iter().zip(&backups) {
                restore(done, backup.as_deref());
            }
            return Err(PredictorError::IoError(e.error));
        }
    }
    Ok(())
}

fn stage_temp(path: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Current content of a regular file at `path`
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(std::fs::read(path)?))
}

fn restore(path: &Path, backup: Option<&[u8]>) {
    let restored = match backup {
        Some(bytes) => write_atomic(path, bytes),
        None => std::fs::remove_file(path).map_err(PredictorError::from),
    };
    if let Err(e) = restored {
        warn!(path = %path.display(), error = %e, "could not restore file after a failed write");
    }
}
