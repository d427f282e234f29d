//! Persistence of rebuild reports for later re-diagnosis

use crate::report::RebuildReport;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const REPORT_PREFIX: &str = "rebuild-";
const REPORT_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Report store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to (de)serialize report {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No saved rebuild reports in {0}")]
    NotFound(PathBuf),

    #[error("Could not determine a data directory for saved reports")]
    NoDataDir,
}

/// Sink that persists finalized reports
pub trait DiagnosticStore: Send + Sync {
    fn save(&self, report: &RebuildReport) -> Result<PathBuf, StoreError>;
}

/// Stores each report as `rebuild-<run id>.json` in one directory
#[derive(Debug, Clone)]
pub struct FileDiagnosticStore {
    dir: PathBuf,
}

impl FileDiagnosticStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<local data dir>/devstack/reports`
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        dirs::data_local_dir()
            .map(|d| d.join("devstack").join("reports"))
            .ok_or(StoreError::NoDataDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", REPORT_PREFIX, run_id, REPORT_EXTENSION))
    }

    pub fn load(&self, path: &Path) -> Result<RebuildReport, StoreError> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StoreError::Serialize {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saved report paths, newest first
    pub fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_report_file(path))
            .collect();
        // run ids are zero-padded UTC timestamps, so name order is time order
        paths.sort();
        paths.reverse();
        Ok(paths)
    }

    pub fn latest(&self) -> Result<RebuildReport, StoreError> {
        let path = self
            .list()?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(self.dir.clone()))?;
        self.load(&path)
    }
}

impl DiagnosticStore for FileDiagnosticStore {
    fn save(&self, report: &RebuildReport) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(&report.run_id);
        let json = serde_json::to_string_pretty(report).map_err(|source| StoreError::Serialize {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Saved rebuild report");
        Ok(path)
    }
}

fn is_report_file(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(REPORT_PREFIX))
        .unwrap_or(false);
    let ext_ok = path.extension().and_then(|e| e.to_str()) == Some(REPORT_EXTENSION);
    name_ok && ext_ok
}
