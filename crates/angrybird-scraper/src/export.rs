use std::path::{Path, PathBuf};

use angrybird_dataset::{write_workbook, VideoRecord};
use tracing::{debug, warn};

use crate::config::OutputConfig;
use crate::{Error, Result};

/// Writes the collected records to the fixed export path.
#[derive(Debug, Clone)]
pub struct Exporter {
    path: PathBuf,
    checkpoint: bool,
}

impl Exporter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            path: config.path.clone(),
            checkpoint: config.checkpoint,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final export. Replaces any previous file.
    pub fn export(&self, records: &[VideoRecord]) -> Result<()> {
        write_workbook(&self.path, records).map_err(Error::Export)?;
        debug!("exported {} rows to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Mid-run export; a failure is logged and the run goes on.
    pub fn checkpoint(&self, records: &[VideoRecord]) -> bool {
        if !self.checkpoint {
            return false;
        }
        match self.export(records) {
            Ok(()) => true,
            Err(e) => {
                warn!("checkpoint export failed: {}", e);
                false
            }
        }
    }
}
