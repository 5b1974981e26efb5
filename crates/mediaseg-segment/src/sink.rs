//! Persistence sinks for emitted segments.
//!
//! A sink receives every source root and segment before it is forwarded
//! downstream. Sinks report failure by returning `false`; they never panic or
//! return errors across this boundary.
//!
//! `JsonlSink` layout:
//! ```text
//! out/
//!   segments.jsonl    # one SegmentRecord per line
//! ```

use mediaseg_core::{
    Result, Segment, SegmentError, SegmentId, SegmentKind, SegmentRecord, SourceId,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Destination for segment records.
pub trait SegmentSink: Send + Sync {
    /// Persist `segment`. Returns `false` if it could not be stored.
    fn add(&self, segment: &Segment) -> bool;

    /// Whether a record with `id` is already stored. A source root has the
    /// source's id.
    fn exists(&self, id: SegmentId) -> bool;
}

#[derive(Default)]
struct MemoryState {
    records: Vec<SegmentRecord>,
    ids: HashSet<SegmentId>,
}

/// Keeps records in memory. Used by tests and embedding applications.
#[derive(Default)]
pub struct MemorySink {
    inner: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in the order they were added.
    pub fn records(&self) -> Vec<SegmentRecord> {
        self.inner.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root records for `source`.
    pub fn roots_of(&self, source: SourceId) -> usize {
        self.inner
            .lock()
            .records
            .iter()
            .filter(|r| r.kind == SegmentKind::Source && r.source_id == source)
            .count()
    }

    /// Content segments of `source`, in emission order.
    pub fn segments_of(&self, source: SourceId) -> Vec<SegmentRecord> {
        self.inner
            .lock()
            .records
            .iter()
            .filter(|r| r.kind == SegmentKind::Segment && r.source_id == source)
            .cloned()
            .collect()
    }
}

impl SegmentSink for MemorySink {
    fn add(&self, segment: &Segment) -> bool {
        let mut inner = self.inner.lock();
        if !inner.ids.insert(segment.id) {
            return false;
        }
        inner.records.push(segment.record());
        true
    }

    fn exists(&self, id: SegmentId) -> bool {
        self.inner.lock().ids.contains(&id)
    }
}

struct JsonlState {
    writer: BufWriter<File>,
    ids: HashSet<SegmentId>,
}

/// Appends one JSON record per line to `<dir>/segments.jsonl`.
pub struct JsonlSink {
    path: PathBuf,
    inner: Mutex<JsonlState>,
}

impl JsonlSink {
    pub const FILE_NAME: &'static str = "segments.jsonl";

    /// Open (or create) the sink in `dir`. Ids already in the file count as
    /// existing, so source roots survive restarts.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(Self::FILE_NAME);
        let ids = if path.exists() {
            Self::read_records(&path)?.into_iter().map(|r| r.id).collect()
        } else {
            HashSet::new()
        };
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), existing = ids.len(), "Opened segment sink");
        Ok(Self {
            path,
            inner: Mutex::new(JsonlState {
                writer: BufWriter::new(file),
                ids,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record currently in the file.
    pub fn load(&self) -> Result<Vec<SegmentRecord>> {
        // Hold the lock so a concurrent add is not half-written while reading.
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        Self::read_records(&self.path)
    }

    fn read_records(path: &Path) -> Result<Vec<SegmentRecord>> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                SegmentError::Serialization(format!(
                    "{}:{}: invalid segment record: {e}",
                    path.display(),
                    number + 1
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn write(state: &mut JsonlState, record: &SegmentRecord) -> Result<()> {
        let line = serde_json::to_string(record).map_err(|e| {
            SegmentError::Serialization(format!("Failed to serialize segment record: {e}"))
        })?;
        writeln!(state.writer, "{line}")?;
        state.writer.flush()?;
        Ok(())
    }
}

impl SegmentSink for JsonlSink {
    fn add(&self, segment: &Segment) -> bool {
        let mut inner = self.inner.lock();
        if inner.ids.contains(&segment.id) {
            return false;
        }
        match Self::write(&mut inner, &segment.record()) {
            Ok(()) => {
                inner.ids.insert(segment.id);
                true
            }
            Err(e) => {
                warn!(segment = %segment.id, error = %e, "Failed to write segment record");
                false
            }
        }
    }

    fn exists(&self, id: SegmentId) -> bool {
        self.inner.lock().ids.contains(&id)
    }
}
