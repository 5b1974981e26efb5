//! Windows following an externally supplied shot list.

use super::SegmentationPolicy;
use crate::boundary::ShotBoundary;
use crate::config::ShotBoundaryConfig;
use crate::window::{Boundary, WindowState};
use mediaseg_core::{FrameKind, Result, Timestamp};
use std::time::Duration;
use tracing::{debug, info};

/// Closes at the end of the current shot once the stream has moved
/// `look_ahead` past it. Without (further) shots it falls back to fixed
/// windows of the last known shot length.
#[derive(Debug, Clone)]
pub struct ShotBoundaryPolicy {
    shots: Vec<ShotBoundary>,
    next: usize,
    tolerance: Duration,
    look_ahead: Duration,
    fallback: Duration,
    exhausted_logged: bool,
}

impl ShotBoundaryPolicy {
    /// `shots` may be empty, in which case windows are `config.fallback` long.
    pub fn new(config: ShotBoundaryConfig, shots: Vec<ShotBoundary>) -> Self {
        Self {
            shots,
            next: 0,
            tolerance: config.tolerance,
            look_ahead: config.look_ahead,
            fallback: config.fallback,
            exhausted_logged: false,
        }
    }

    pub fn remaining_shots(&self) -> usize {
        self.shots.len() - self.next
    }

    /// End of the shot the open window maps to. Shots ending within
    /// `tolerance` of the cursor are folded into the next one.
    fn current_end(&mut self, cursor: Timestamp) -> Option<Timestamp> {
        let earliest_end = cursor.saturating_add(self.tolerance);
        while let Some(shot) = self.shots.get(self.next) {
            if shot.end > earliest_end {
                return Some(shot.end);
            }
            debug!(
                start = %shot.start,
                end = %shot.end,
                cursor = %cursor,
                "Merging short shot into the next"
            );
            self.next += 1;
        }
        None
    }

    /// The next boundary, and whether it consumes a shot.
    fn next_boundary(&mut self, cursor: Timestamp) -> (Boundary, bool) {
        match self.current_end(cursor) {
            Some(end) => (end, true),
            None => {
                if !self.shots.is_empty() && !self.exhausted_logged {
                    info!(
                        fallback_ms = self.fallback_length().as_millis() as u64,
                        "Shot list exhausted, continuing with fixed windows"
                    );
                    self.exhausted_logged = true;
                }
                (cursor.saturating_add(self.fallback_length()), false)
            }
        }
    }

    fn fallback_length(&self) -> Duration {
        self.shots
            .last()
            .map(ShotBoundary::length)
            .filter(|len| !len.is_zero())
            .unwrap_or(self.fallback)
    }

    /// Whether the stream has progressed to `cutoff`. When the source carries
    /// both images and audio, both streams have to get there.
    fn reached(state: &WindowState, cutoff: Timestamp) -> bool {
        if state.has_both_kinds() {
            [FrameKind::Image, FrameKind::Audio]
                .iter()
                .all(|kind| state.latest_of(*kind).is_some_and(|ts| ts >= cutoff))
        } else {
            state.latest().is_some_and(|ts| ts >= cutoff)
        }
    }
}

impl SegmentationPolicy for ShotBoundaryPolicy {
    fn name(&self) -> &'static str {
        "shotBoundary"
    }

    fn decide(&mut self, state: &WindowState) -> Result<Option<Boundary>> {
        if state.is_empty() {
            return Ok(None);
        }
        let (boundary, from_list) = self.next_boundary(state.cursor());
        if !Self::reached(state, boundary.saturating_add(self.look_ahead)) {
            return Ok(None);
        }
        if from_list {
            self.next += 1;
        }
        Ok(Some(boundary))
    }

    fn flush_boundary(&mut self, state: &WindowState) -> Boundary {
        let (boundary, from_list) = self.next_boundary(state.cursor());
        if from_list {
            self.next += 1;
        }
        boundary
    }

    fn tolerance(&self) -> Option<Duration> {
        Some(self.tolerance)
    }
}
