//! Stats Ledger - Append-only JSONL storage
//!
//! One line per entry. Round records, volume observations and the final
//! summary share the file, tagged by `kind`.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collector::{RoundRecord, RunSummary, VolumePoint};
use crate::error::StatsResult;

/// A single ledger line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsEntry {
    Round(RoundRecord),
    Volume(VolumePoint),
    Summary(RunSummary),
}

impl From<RoundRecord> for StatsEntry {
    fn from(record: RoundRecord) -> Self {
        StatsEntry::Round(record)
    }
}

impl From<VolumePoint> for StatsEntry {
    fn from(point: VolumePoint) -> Self {
        StatsEntry::Volume(point)
    }
}

impl From<RunSummary> for StatsEntry {
    fn from(summary: RunSummary) -> Self {
        StatsEntry::Summary(summary)
    }
}

/// Append-only JSONL ledger for statistics entries
pub struct StatsLedger {
    path: PathBuf,
    file: Option<File>,
}

impl StatsLedger {
    /// Open (or create) a ledger at the given path
    pub fn new(path: impl AsRef<Path>) -> StatsResult<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Open file in append mode
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Ledger that only checks serialization
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry to the ledger
    pub fn append(&mut self, entry: impl Into<StatsEntry>) -> StatsResult<()> {
        let json = serde_json::to_string(&entry.into())?;
        // In-memory mode only validates serialization
        if let Some(ref mut file) = self.file {
            writeln!(file, "{}", json)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Read all entries from the ledger
    pub fn read_all(&self) -> StatsResult<Vec<StatsEntry>> {
        if self.file.is_none() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Round records only, in file order
    pub fn rounds(&self) -> StatsResult<Vec<RoundRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter_map(|e| match e {
                StatsEntry::Round(r) => Some(r),
                _ => None,
            })
            .collect())
    }
}
