//! Shot-boundary lists supplied from outside the pipeline.
//!
//! Providers are injected into a pipeline as trait objects; the pipeline
//! configuration only names the provider it expects.
//!
//! File format (one shot per line, whitespace separated):
//! ```text
//! start_frame start_time end_frame end_time
//! 0 0.0 47 1.96
//! 48 2.0 119 4.96
//! ```
//! Times are scaled to microseconds by a configured factor. Lines that do not
//! start with a digit, or do not have four fields, are skipped.

use mediaseg_core::{Result, SegmentError, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// One externally detected shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotBoundary {
    pub start_frame: u64,
    pub end_frame: u64,
    /// Absolute start within the source.
    pub start: Timestamp,
    /// Absolute end within the source.
    pub end: Timestamp,
}

impl ShotBoundary {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start_frame: 0,
            end_frame: 0,
            start,
            end,
        }
    }

    /// Length of the shot, zero if it is inverted.
    pub fn length(&self) -> Duration {
        self.end.duration_since(self.start)
    }
}

/// Supplies shot-boundary lists by set name and source stem.
pub trait BoundaryProvider: Send + Sync {
    /// Name the pipeline configuration refers to this provider by.
    fn name(&self) -> &str;

    /// The ordered shot list for `source_stem` in `set_name`, or `None` if
    /// the provider has no list for that source.
    fn lookup(&self, set_name: &str, source_stem: &str) -> Result<Option<Vec<ShotBoundary>>>;
}

/// In-memory provider.
pub struct StaticBoundaryProvider {
    name: String,
    lists: RwLock<HashMap<(String, String), Vec<ShotBoundary>>>,
}

impl StaticBoundaryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lists: RwLock::new(HashMap::new()),
        }
    }

    /// Register the list for `source_stem` in `set_name`, replacing any previous one.
    pub fn insert(&self, set_name: &str, source_stem: &str, shots: Vec<ShotBoundary>) {
        self.lists
            .write()
            .insert((set_name.to_string(), source_stem.to_string()), shots);
    }

    pub fn with_list(self, set_name: &str, source_stem: &str, shots: Vec<ShotBoundary>) -> Self {
        self.insert(set_name, source_stem, shots);
        self
    }
}

impl BoundaryProvider for StaticBoundaryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, set_name: &str, source_stem: &str) -> Result<Option<Vec<ShotBoundary>>> {
        Ok(self
            .lists
            .read()
            .get(&(set_name.to_string(), source_stem.to_string()))
            .cloned())
    }
}

/// Reads lists from `<root>/<set_name>/<source_stem><extension>`.
pub struct FileBoundaryProvider {
    name: String,
    root: PathBuf,
    extension: String,
    /// Multiplier turning file times into microseconds.
    to_micros: f64,
}

impl FileBoundaryProvider {
    /// Provider reading `.tsv` files with times in seconds.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            extension: ".tsv".to_string(),
            to_micros: 1_000_000.0,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = if extension.starts_with('.') || extension.is_empty() {
            extension
        } else {
            format!(".{extension}")
        };
        self
    }

    /// Scale applied to file times; `1e6` for seconds, `1e3` for milliseconds.
    pub fn with_micro_scale(mut self, to_micros: f64) -> Self {
        self.to_micros = to_micros;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, set_name: &str, source_stem: &str) -> PathBuf {
        self.root
            .join(set_name)
            .join(format!("{source_stem}{}", self.extension))
    }

    /// Parse the contents of a boundary file.
    pub fn parse(&self, contents: &str) -> Result<Vec<ShotBoundary>> {
        let mut shots = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if !line.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 4 {
                continue;
            }
            let bad = |what: &str| {
                SegmentError::BoundaryList(format!(
                    "line {}: invalid {what} in '{line}'",
                    number + 1
                ))
            };
            let start_frame = fields[0].parse().map_err(|_| bad("start frame"))?;
            let start_time: f64 = fields[1].parse().map_err(|_| bad("start time"))?;
            let end_frame = fields[2].parse().map_err(|_| bad("end frame"))?;
            let end_time: f64 = fields[3].parse().map_err(|_| bad("end time"))?;
            shots.push(ShotBoundary {
                start_frame,
                end_frame,
                start: Timestamp::from_micros((start_time * self.to_micros) as i64),
                end: Timestamp::from_micros((end_time * self.to_micros) as i64),
            });
        }
        Ok(shots)
    }
}

impl BoundaryProvider for FileBoundaryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, set_name: &str, source_stem: &str) -> Result<Option<Vec<ShotBoundary>>> {
        let path = self.path_for(set_name, source_stem);
        if !path.exists() {
            debug!(path = %path.display(), "No boundary file");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let shots = self.parse(&contents)?;
        debug!(path = %path.display(), shots = shots.len(), "Loaded boundary file");
        Ok(Some(shots))
    }
}
