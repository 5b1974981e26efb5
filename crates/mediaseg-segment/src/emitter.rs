//! Turns closed windows into segments.

use crate::sink::SegmentSink;
use mediaseg_core::{
    Frame, Relationship, Segment, SegmentId, SegmentKind, Source, TimeRange, Window,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds the segments of one source and hands them to the sink.
pub struct SegmentEmitter {
    source: Arc<Source>,
    sink: Option<Arc<dyn SegmentSink>>,
    root: Option<SegmentId>,
    emitted: usize,
    sink_failures: usize,
}

impl SegmentEmitter {
    pub fn new(source: Arc<Source>, sink: Option<Arc<dyn SegmentSink>>) -> Self {
        Self {
            source,
            sink,
            root: None,
            emitted: 0,
            sink_failures: 0,
        }
    }

    /// Segments emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Records the sink refused.
    pub fn sink_failures(&self) -> usize {
        self.sink_failures
    }

    /// Id of the source root, persisting the root first if the sink does not
    /// have it yet.
    pub fn ensure_root(&mut self) -> SegmentId {
        if let Some(id) = self.root {
            return id;
        }
        let root = Segment::source_root(self.source.clone());
        if let Some(sink) = &self.sink {
            if sink.exists(root.id) {
                debug!(source = %self.source.name, "Source root already stored");
            } else if sink.add(&root) {
                info!(source = %self.source.name, id = %root.id, "Stored source root");
            } else {
                warn!(source = %self.source.name, "Sink rejected source root");
                self.sink_failures += 1;
            }
        }
        self.root = Some(root.id);
        root.id
    }

    /// Build the segment for `frames` (non-empty, in timestamp order) closed
    /// by `window`, persist it, and return it for forwarding.
    pub fn emit(&mut self, frames: Vec<Frame>, window: Window) -> Arc<Segment> {
        debug_assert!(!frames.is_empty(), "empty windows are not emitted");
        let root = self.ensure_root();
        let id = SegmentId::new();

        let time_range = TimeRange::spanning(frames.iter().filter_map(|f| f.timestamp))
            .and_then(|range| range.intersect(&window));
        let descriptors = frames
            .iter()
            .flat_map(|f| f.descriptors.iter().cloned())
            .collect();

        let segment = Segment {
            id,
            kind: SegmentKind::Segment,
            source: self.source.clone(),
            frames,
            window: Some(window),
            time_range,
            descriptors,
            relationships: vec![Relationship::part_of(id, root)],
        };

        if let Some(sink) = &self.sink {
            if !sink.add(&segment) {
                warn!(source = %self.source.name, segment = %id, "Sink rejected segment");
                self.sink_failures += 1;
            }
        }

        self.emitted += 1;
        debug!(
            source = %self.source.name,
            segment = %id,
            window = %window,
            frames = segment.frames.len(),
            "Emitted segment"
        );
        Arc::new(segment)
    }
}
