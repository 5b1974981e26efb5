//! Time representation for segmentation.
//!
//! Presentation timestamps are integral microseconds relative to the start of
//! their source. Frame-rate conversions go through rational arithmetic so that
//! frame `n` of a 29.97 fps stream always maps to the same microsecond.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A presentation timestamp in microseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Time zero of a source.
    pub const ZERO: Self = Self(0);

    /// Smallest representable timestamp; used as the open lower end of a window.
    pub const MIN: Self = Self(i64::MIN);

    /// Largest representable timestamp; used as the open upper end of a window.
    pub const MAX: Self = Self(i64::MAX);

    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(MICROS_PER_SECOND))
    }

    /// Timestamp of frame number `frames` at the given frame rate, rounded down
    /// to the microsecond.
    pub fn from_frames(frames: i64, rate: FrameRate) -> Self {
        let value = Rational64::new(
            frames * MICROS_PER_SECOND * rate.denominator as i64,
            rate.numerator as i64,
        );
        Self(value.floor().to_integer())
    }

    /// Create a timestamp from seconds as a float.
    /// Note: May introduce small precision errors.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        Self((seconds * MICROS_PER_SECOND as f64).round() as i64)
    }

    #[inline]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND as f64
    }

    /// Whether this is one of the open ends (`MIN`/`MAX`).
    #[inline]
    pub fn is_unbounded(self) -> bool {
        self == Self::MIN || self == Self::MAX
    }

    /// Add a duration, clamping at `MAX`.
    pub fn saturating_add(self, span: Duration) -> Self {
        Self(self.0.saturating_add(duration_micros(span)))
    }

    /// Subtract a duration, clamping at `MIN`.
    pub fn saturating_sub(self, span: Duration) -> Self {
        Self(self.0.saturating_sub(duration_micros(span)))
    }

    /// The next representable timestamp.
    #[inline]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Length of time from `earlier` to `self`, or zero if `earlier` is later.
    pub fn duration_since(self, earlier: Self) -> Duration {
        let micros = self.0.saturating_sub(earlier.0);
        if micros <= 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(micros as u64)
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MIN => f.write_str("-inf"),
            Self::MAX => f.write_str("+inf"),
            _ => write!(f, "{:.3}s", self.to_seconds_f64()),
        }
    }
}

/// Whole microseconds in `span`, clamped to `i64::MAX`.
pub fn duration_micros(span: Duration) -> i64 {
    i64::try_from(span.as_micros()).unwrap_or(i64::MAX)
}

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame, rounded down to the microsecond.
    pub fn frame_duration(self) -> Duration {
        let micros = Timestamp::from_frames(1, self).as_micros();
        Duration::from_micros(micros.max(0) as u64)
    }

    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_25
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// A half-open interval `[start, end)` that one segment covers.
///
/// Windows of a single source never overlap and are emitted in increasing
/// order. `end == Timestamp::MAX` marks the final, unbounded window produced
/// while draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// Start (inclusive).
    pub start: Timestamp,
    /// End (exclusive).
    pub end: Timestamp,
    /// Alignment tolerance used when the window came from an external boundary.
    pub tolerance: Option<Duration>,
}

impl Window {
    /// Create a window, or `None` if `start >= end`.
    pub fn new(start: Timestamp, end: Timestamp) -> Option<Self> {
        (start < end).then_some(Self {
            start,
            end,
            tolerance: None,
        })
    }

    /// Attach an alignment tolerance.
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    #[inline]
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Length of the window, or `None` if either end is open.
    pub fn length(&self) -> Option<Duration> {
        if self.start.is_unbounded() || self.end.is_unbounded() {
            None
        } else {
            Some(self.end.duration_since(self.start))
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Closed interval `[start, end]` spanned by the frames of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Earliest frame timestamp (inclusive).
    pub start: Timestamp,
    /// Latest frame timestamp (inclusive).
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Smallest range covering all given timestamps.
    pub fn spanning<I: IntoIterator<Item = Timestamp>>(timestamps: I) -> Option<Self> {
        timestamps.into_iter().fold(None, |acc, ts| match acc {
            None => Some(Self::new(ts, ts)),
            Some(r) => Some(Self::new(r.start.min(ts), r.end.max(ts))),
        })
    }

    /// Clip this range to a window. Returns `None` if they do not overlap.
    pub fn intersect(self, window: &Window) -> Option<Self> {
        let last_in_window = Timestamp::from_micros(window.end.as_micros() - 1);
        let start = self.start.max(window.start);
        let end = self.end.min(last_in_window);
        (start <= end).then_some(Self::new(start, end))
    }

    #[inline]
    pub fn contains(self, ts: Timestamp) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Whether this range ends no later than `other` begins.
    #[inline]
    pub fn precedes(self, other: Self) -> bool {
        self.end <= other.start
    }

    pub fn duration(self) -> Duration {
        self.end.duration_since(self.start)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
