//! Per-source segmentation: window state, policy and emitter behind one lock.

use crate::emitter::SegmentEmitter;
use crate::policy::SegmentationPolicy;
use crate::sink::SegmentSink;
use crate::window::WindowState;
use mediaseg_core::{Frame, Segment, SegmentError, Source, Timestamp};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, trace, warn};

/// Counters kept per source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    /// Frames routed to this source.
    pub received: usize,
    /// Frames buffered into a window.
    pub accepted: usize,
    /// Frames the policy does not look at.
    pub skipped: usize,
    /// Frames without a usable timestamp.
    pub untimed: usize,
    /// Frames that arrived for an already closed window.
    pub late: usize,
    /// Recoverable per-frame decision failures.
    pub policy_errors: usize,
    pub segments: usize,
    /// Frames that went out inside a segment.
    pub emitted_frames: usize,
    pub sink_failures: usize,
    /// Frames thrown away because the source failed.
    pub discarded: usize,
    /// The fatal error that stopped this source, if any.
    pub failure: Option<String>,
}

struct Inner {
    state: WindowState,
    policy: Box<dyn SegmentationPolicy>,
    emitter: SegmentEmitter,
    stats: SourceStats,
    failed: bool,
}

impl Inner {
    fn fail(&mut self, err: SegmentError) {
        let discarded = self.state.discard();
        self.stats.discarded += discarded;
        self.stats.failure = Some(err.to_string());
        self.failed = true;
        error!(
            source = %self.state.source().name,
            error = %err,
            discarded,
            "Segmentation failed for source, dropping its buffer"
        );
    }

    /// Close `boundary` and emit the window unless it is empty.
    fn close(&mut self, boundary: Timestamp, out: &mut Vec<Arc<Segment>>) -> bool {
        match self.state.close(boundary) {
            Ok((mut window, frames)) => {
                if !frames.is_empty() {
                    if let Some(tolerance) = self.policy.tolerance() {
                        window = window.with_tolerance(tolerance);
                    }
                    self.stats.emitted_frames += frames.len();
                    self.stats.segments += 1;
                    out.push(self.emitter.emit(frames, window));
                    self.stats.sink_failures = self.emitter.sink_failures();
                }
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// Ask the policy for boundaries until it has none.
    fn close_ready(&mut self, out: &mut Vec<Arc<Segment>>) {
        loop {
            match self.policy.decide(&self.state) {
                Ok(Some(boundary)) => {
                    if !self.close(boundary, out) {
                        return;
                    }
                }
                Ok(None) => return,
                Err(e) if e.is_fatal() => {
                    self.fail(e);
                    return;
                }
                Err(e) => {
                    self.stats.policy_errors += 1;
                    warn!(
                        source = %self.state.source().name,
                        error = %e,
                        "No segmentation decision"
                    );
                    return;
                }
            }
        }
    }
}

/// Segmentation state of one source.
///
/// Admission, buffering, the policy decision and closing a window happen
/// under a single lock, so a frame is never judged against a boundary that
/// has already moved. Segments come back to the caller in window order.
pub struct SourcePipeline {
    source: Arc<Source>,
    inner: Mutex<Inner>,
}

impl SourcePipeline {
    pub fn new(
        source: Arc<Source>,
        policy: Box<dyn SegmentationPolicy>,
        sink: Option<Arc<dyn SegmentSink>>,
    ) -> Self {
        info!(
            source = %source.name,
            id = %source.id,
            policy = policy.name(),
            "Starting segmentation for source"
        );
        let state = WindowState::new(source.clone(), policy.origin());
        let emitter = SegmentEmitter::new(source.clone(), sink);
        Self {
            source,
            inner: Mutex::new(Inner {
                state,
                policy,
                emitter,
                stats: SourceStats::default(),
                failed: false,
            }),
        }
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    /// Offer one frame; returns the segments it completed.
    pub fn push(&self, frame: Frame) -> Vec<Arc<Segment>> {
        let mut out = Vec::new();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.stats.received += 1;

        if inner.failed {
            inner.stats.discarded += 1;
            trace!(source = %self.source.name, frame = frame.id.0, "Source failed, dropping");
            return out;
        }

        let ts = match frame.timestamp {
            Some(ts) if ts != Timestamp::MAX => ts,
            _ => {
                inner.stats.untimed += 1;
                warn!(
                    source = %self.source.name,
                    frame = frame.id.0,
                    "Dropping frame without usable timestamp"
                );
                return out;
            }
        };

        if !inner.policy.admits(&frame) {
            inner.stats.skipped += 1;
            trace!(source = %self.source.name, frame = frame.id.0, "Frame not admitted");
            return out;
        }

        if inner.state.is_late(ts) {
            inner.stats.late += 1;
            warn!(
                source = %self.source.name,
                frame = frame.id.0,
                timestamp = %ts,
                cursor = %inner.state.cursor(),
                "Dropping late frame"
            );
            return out;
        }

        if let Err(e) = inner.policy.observe(&frame, &inner.state) {
            if e.is_fatal() {
                inner.fail(e);
                return out;
            }
            inner.stats.policy_errors += 1;
            warn!(
                source = %self.source.name,
                frame = frame.id.0,
                error = %e,
                "No segmentation decision for frame"
            );
        }

        inner.state.accept(frame);
        inner.stats.accepted += 1;
        inner.close_ready(&mut out);
        out
    }

    /// Flush everything still buffered. The pipeline is empty afterwards.
    pub fn drain(&self) -> Vec<Arc<Segment>> {
        let mut out = Vec::new();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.failed {
            return out;
        }

        while !inner.state.is_empty() {
            let mut boundary = inner.policy.flush_boundary(&inner.state);
            if boundary <= inner.state.cursor() {
                boundary = Timestamp::MAX;
            }
            if !inner.close(boundary, &mut out) {
                break;
            }
            if boundary == Timestamp::MAX {
                break;
            }
        }

        info!(
            source = %self.source.name,
            segments = inner.stats.segments,
            late = inner.stats.late,
            "Source drained"
        );
        out
    }

    /// Whether nothing is buffered.
    pub fn is_drained(&self) -> bool {
        self.inner.lock().state.is_empty()
    }

    pub fn is_failed(&self) -> bool {
        self.inner.lock().failed
    }

    pub fn stats(&self) -> SourceStats {
        self.inner.lock().stats.clone()
    }
}
