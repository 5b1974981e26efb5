//! Emitted segments and the records persisted for them.

use crate::descriptor::{Descriptor, DescriptorId};
use crate::frame::{Frame, FrameId};
use crate::source::{Source, SourceId};
use crate::time::{TimeRange, Window};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier of a segment or source root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id of the root record of `source`.
    pub fn root_of(source: SourceId) -> Self {
        Self(source.0)
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a record stands for a whole source or a part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    /// The one root record per source.
    Source,
    /// A window of frames.
    Segment,
}

/// Predicate of a relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    PartOf,
}

impl Predicate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PartOf => "partOf",
        }
    }
}

/// A directed `subject --predicate--> object` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub subject: SegmentId,
    pub predicate: Predicate,
    pub object: SegmentId,
}

impl Relationship {
    pub fn part_of(subject: SegmentId, object: SegmentId) -> Self {
        Self {
            subject,
            predicate: Predicate::PartOf,
            object,
        }
    }
}

/// An emitted aggregate of frames, or the root record of a source.
///
/// Segments are shared as `Arc<Segment>` once emitted and never change
/// afterwards.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    pub kind: SegmentKind,
    pub source: Arc<Source>,
    /// Frames in timestamp order.
    pub frames: Vec<Frame>,
    /// The window that was closed to produce this segment.
    pub window: Option<Window>,
    /// `[min, max]` of the frame timestamps, clipped to the window.
    pub time_range: Option<TimeRange>,
    /// Descriptors carried over from the frames.
    pub descriptors: Vec<Descriptor>,
    pub relationships: Vec<Relationship>,
}

impl Segment {
    /// The root record of a source.
    pub fn source_root(source: Arc<Source>) -> Self {
        Self {
            id: SegmentId::root_of(source.id),
            kind: SegmentKind::Source,
            source,
            frames: Vec::new(),
            window: None,
            time_range: None,
            descriptors: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// The record that gets persisted for this segment. Pixel and sample data
    /// are not part of it.
    pub fn record(&self) -> SegmentRecord {
        SegmentRecord {
            id: self.id,
            kind: self.kind,
            source_id: self.source.id,
            source_name: self.source.name.clone(),
            window: self.window,
            time_range: self.time_range,
            frame_ids: self.frames.iter().map(|f| f.id).collect(),
            descriptor_ids: self.descriptors.iter().map(|d| d.id).collect(),
            relationships: self.relationships.clone(),
        }
    }

    /// The `partOf` target of this segment, if any.
    pub fn parent(&self) -> Option<SegmentId> {
        self.relationships
            .iter()
            .find(|r| r.subject == self.id && r.predicate == Predicate::PartOf)
            .map(|r| r.object)
    }
}

/// Persistable view of a [`Segment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub id: SegmentId,
    pub kind: SegmentKind,
    pub source_id: SourceId,
    pub source_name: String,
    pub window: Option<Window>,
    pub time_range: Option<TimeRange>,
    pub frame_ids: Vec<FrameId>,
    pub descriptor_ids: Vec<DescriptorId>,
    pub relationships: Vec<Relationship>,
}
