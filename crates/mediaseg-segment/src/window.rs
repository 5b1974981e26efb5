//! Per-source window state: the open window's frames and its start.

use mediaseg_core::{Frame, FrameKind, Result, SegmentError, Source, Timestamp, Window};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::warn;

/// A timestamp at which the open window closes.
pub type Boundary = Timestamp;

/// Outcome of offering a frame to the window state.
#[derive(Debug, PartialEq, Eq)]
pub enum Accepted {
    Buffered,
    /// The frame lies before the cursor and was dropped.
    Late,
    /// The frame has no timestamp and was dropped.
    Untimed,
}

/// Frames of the open window, ordered by timestamp, and the cursor marking
/// where the open window starts.
///
/// Every frame with a timestamp before the cursor has already been emitted
/// (or dropped as late). The cursor only moves forward.
#[derive(Debug)]
pub struct WindowState {
    source: Arc<Source>,
    cursor: Timestamp,
    buffer: VecDeque<Frame>,
    latest_image: Option<Timestamp>,
    latest_audio: Option<Timestamp>,
}

/// Buffered frames always carry a timestamp.
#[inline]
fn ts_of(frame: &Frame) -> Timestamp {
    frame.timestamp.unwrap_or(Timestamp::MIN)
}

impl WindowState {
    /// Empty state for `source` whose first window starts at `origin`.
    pub fn new(source: Arc<Source>, origin: Timestamp) -> Self {
        Self {
            source,
            cursor: origin,
            buffer: VecDeque::new(),
            latest_image: None,
            latest_audio: None,
        }
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    /// Start of the open window.
    #[inline]
    pub fn cursor(&self) -> Timestamp {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffered frames in timestamp order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.buffer.iter()
    }

    /// Earliest buffered timestamp.
    pub fn earliest(&self) -> Option<Timestamp> {
        self.buffer.front().map(ts_of)
    }

    /// Latest buffered timestamp.
    pub fn latest(&self) -> Option<Timestamp> {
        self.buffer.back().map(ts_of)
    }

    /// Latest timestamp seen so far for frames of `kind`, buffered or not.
    pub fn latest_of(&self, kind: FrameKind) -> Option<Timestamp> {
        match kind {
            FrameKind::Image => self.latest_image,
            FrameKind::Audio => self.latest_audio,
        }
    }

    /// Whether both image and audio frames have arrived for this source.
    pub fn has_both_kinds(&self) -> bool {
        self.latest_image.is_some() && self.latest_audio.is_some()
    }

    /// Whether a frame at `ts` falls into an already closed window.
    #[inline]
    pub fn is_late(&self, ts: Timestamp) -> bool {
        ts < self.cursor
    }

    /// Insert `frame` keeping timestamp order. Frames with equal timestamps
    /// keep their arrival order.
    pub fn accept(&mut self, frame: Frame) -> Accepted {
        let Some(ts) = frame.timestamp else {
            warn!(source = %self.source.name, frame = frame.id.0, "Dropping frame without timestamp");
            return Accepted::Untimed;
        };
        if self.is_late(ts) {
            warn!(
                source = %self.source.name,
                frame = frame.id.0,
                timestamp = %ts,
                cursor = %self.cursor,
                "Dropping late frame"
            );
            return Accepted::Late;
        }

        let slot = match frame.kind() {
            FrameKind::Image => &mut self.latest_image,
            FrameKind::Audio => &mut self.latest_audio,
        };
        *slot = Some(slot.map_or(ts, |prev| prev.max(ts)));

        let index = self.buffer.partition_point(|f| ts_of(f) <= ts);
        self.buffer.insert(index, frame);
        Accepted::Buffered
    }

    /// Remove and return every frame before `boundary`, in order.
    pub fn drain_up_to(&mut self, boundary: Boundary) -> Vec<Frame> {
        let count = self.buffer.partition_point(|f| ts_of(f) < boundary);
        self.buffer.drain(..count).collect()
    }

    /// Move the cursor to `next`.
    pub fn advance(&mut self, next: Boundary) -> Result<()> {
        if next <= self.cursor {
            return Err(SegmentError::InvalidBoundary {
                source_name: self.source.name.clone(),
                current: self.cursor,
                next,
            });
        }
        self.cursor = next;
        Ok(())
    }

    /// Close the open window at `boundary`: drain its frames and advance the
    /// cursor in one step. Nothing changes if the boundary is invalid.
    pub fn close(&mut self, boundary: Boundary) -> Result<(Window, Vec<Frame>)> {
        let window = Window::new(self.cursor, boundary).ok_or_else(|| {
            SegmentError::InvalidBoundary {
                source_name: self.source.name.clone(),
                current: self.cursor,
                next: boundary,
            }
        })?;
        let frames = self.drain_up_to(boundary);
        self.cursor = boundary;
        Ok((window, frames))
    }

    /// Drop everything buffered, returning how many frames were discarded.
    pub fn discard(&mut self) -> usize {
        let count = self.buffer.len();
        self.buffer.clear();
        count
    }
}
