//! Reference exemplars - calibration histories for voters and the oracle
//!
//! Loaded once at startup and shared read-only (behind an `Arc`) for the rest
//! of a run.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::transaction::Transaction;

/// Two fixed collections of historical transaction sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExemplarSet {
    #[serde(default)]
    pub legitimate: Vec<Vec<Transaction>>,
    #[serde(default)]
    pub illegal: Vec<Vec<Transaction>>,
}

impl ExemplarSet {
    pub fn new(legitimate: Vec<Vec<Transaction>>, illegal: Vec<Vec<Transaction>>) -> Self {
        Self { legitimate, illegal }
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let file = File::open(path.as_ref())?;
        let set = serde_json::from_reader(BufReader::new(file))?;
        Ok(set)
    }

    /// Save as pretty-printed JSON, creating parent directories if needed
    pub fn save(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.legitimate.is_empty() && self.illegal.is_empty()
    }

    /// Total number of exemplar sequences
    pub fn len(&self) -> usize {
        self.legitimate.len() + self.illegal.len()
    }
}
