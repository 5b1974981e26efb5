//! Fixed-duration windows aligned to time zero.

use super::SegmentationPolicy;
use crate::config::FixedDurationConfig;
use crate::window::{Boundary, WindowState};
use mediaseg_core::time::duration_micros;
use mediaseg_core::{Result, Timestamp};
use std::time::Duration;

/// Closes `[cursor, cursor + duration)` once a frame at or past
/// `cursor + duration + look_ahead` has been buffered.
///
/// A run of empty windows before the earliest buffered frame is closed in
/// one step, so a stream starting far from zero costs a single decision.
#[derive(Debug, Clone)]
pub struct FixedDurationPolicy {
    duration: Duration,
    look_ahead: Duration,
}

impl FixedDurationPolicy {
    pub fn new(config: FixedDurationConfig) -> Self {
        Self {
            duration: config.duration,
            look_ahead: config.look_ahead,
        }
    }

    /// Start of the grid window holding `ts`.
    fn align_down(&self, ts: Timestamp) -> Timestamp {
        let step = duration_micros(self.duration).max(1);
        let micros = ts.as_micros();
        Timestamp::from_micros(micros - micros.rem_euclid(step))
    }
}

impl SegmentationPolicy for FixedDurationPolicy {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn decide(&mut self, state: &WindowState) -> Result<Option<Boundary>> {
        let Some(latest) = state.latest() else {
            return Ok(None);
        };
        let boundary = state.cursor().saturating_add(self.duration);
        if latest < boundary.saturating_add(self.look_ahead) {
            return Ok(None);
        }
        let settled = latest.saturating_sub(self.look_ahead);
        let limit = state.earliest().map_or(settled, |earliest| earliest.min(settled));
        Ok(Some(boundary.max(self.align_down(limit))))
    }

    fn flush_boundary(&mut self, state: &WindowState) -> Boundary {
        let boundary = state.cursor().saturating_add(self.duration);
        match state.earliest() {
            Some(earliest) => boundary.max(self.align_down(earliest)),
            None => boundary,
        }
    }
}
