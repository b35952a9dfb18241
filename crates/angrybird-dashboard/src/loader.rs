//! Reads the spreadsheet fresh for every request.

use std::path::{Path, PathBuf};

use angrybird_dataset::{read_workbook, VideoRecord};
use tracing::debug;

use crate::Result;

/// The exported file; there is no cache, so a new scrape is visible on the
/// next request.
#[derive(Debug, Clone)]
pub struct DataSource {
    path: PathBuf,
}

impl DataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<VideoRecord>> {
        let records = read_workbook(&self.path)?;
        debug!("loaded {} rows from {}", records.len(), self.path.display());
        Ok(records)
    }
}
