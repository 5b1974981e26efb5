//! One segment per frame.

use super::SegmentationPolicy;
use crate::window::{Boundary, WindowState};
use mediaseg_core::{Result, Timestamp};

/// One segment per distinct timestamp. The window holding the earliest
/// buffered frame closes once a later frame arrives, so frames sharing a
/// timestamp (an image and its audio block) land in the same segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughPolicy;

impl SegmentationPolicy for PassThroughPolicy {
    fn name(&self) -> &'static str {
        "passThrough"
    }

    fn origin(&self) -> Timestamp {
        Timestamp::MIN
    }

    fn decide(&mut self, state: &WindowState) -> Result<Option<Boundary>> {
        let (Some(earliest), Some(latest)) = (state.earliest(), state.latest()) else {
            return Ok(None);
        };
        Ok((latest > earliest).then(|| earliest.next()))
    }

    fn flush_boundary(&mut self, state: &WindowState) -> Boundary {
        state.latest().map_or(Timestamp::MAX, Timestamp::next)
    }
}
