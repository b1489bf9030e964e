// ABOUTME: Export of registered histograms for use outside the shell.
// ABOUTME: Writes JSON, zstd-compressed when the file name ends in `.zst`.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::backend::Plottable;
use crate::registry::Handle;

/// One exported histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub handle: u64,
    pub label: String,
    /// Expression or `num/den` the histogram was made from
    pub source: String,
    pub bin_edges: Vec<f64>,
    pub bin_content: Vec<f64>,
    pub entries: f64,
}

/// A set of exported histograms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub histograms: Vec<HistogramSnapshot>,
}

impl Snapshot {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            histograms: Vec::new(),
        }
    }

    /// Add a histogram's binning and contents
    pub fn add_histogram(
        &mut self,
        handle: Handle,
        label: &str,
        source: &str,
        plot: &dyn Plottable,
    ) {
        self.histograms.push(HistogramSnapshot {
            handle: handle.0,
            label: label.to_string(),
            source: source.to_string(),
            bin_edges: plot.bin_edges().to_vec(),
            bin_content: plot.bin_content().to_vec(),
            entries: plot.entries(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Save to disk, compressing with zstd for `.zst` paths
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(self)?;
        let bytes = if is_compressed(path) {
            let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
            encoder.write_all(&json)?;
            encoder.finish()?
        } else {
            json
        };

        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a previously saved snapshot
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let raw = std::fs::read(path)?;

        let json = if is_compressed(path) {
            let mut decoder = zstd::Decoder::new(&raw[..])?;
            let mut json = Vec::new();
            decoder.read_to_end(&mut json)?;
            json
        } else {
            raw
        };

        let snapshot: Snapshot = serde_json::from_slice(&json)?;

        if snapshot.version > Self::CURRENT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        Ok(snapshot)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zst")
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),
}
