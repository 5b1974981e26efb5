//! Error types for MediaSeg.

use crate::time::Timestamp;
use thiserror::Error;

/// Main error type for segmentation operations.
#[derive(Error, Debug)]
pub enum SegmentError {
    /// A policy or pipeline parameter is missing or invalid. Raised while the
    /// pipeline is being built; the pipeline never starts.
    #[error("Configuration error: parameter '{parameter}' {reason}")]
    Configuration { parameter: String, reason: String },

    /// A window was asked to close at or before the current cursor.
    #[error("Invalid boundary for source '{source_name}': {next} does not advance past {current}")]
    InvalidBoundary {
        source_name: String,
        current: Timestamp,
        next: Timestamp,
    },

    /// A per-frame decision could not be made. The frame stays buffered.
    #[error("Policy error: {0}")]
    Policy(String),

    /// A descriptor carries a vector element type no distance is defined for.
    #[error("Unsupported descriptor from author '{author}': {kind}")]
    UnsupportedDescriptor { author: String, kind: String },

    /// The persistence sink rejected a record.
    #[error("Sink error: {0}")]
    Sink(String),

    /// A shot-boundary list could not be read or parsed.
    #[error("Boundary list error: {0}")]
    BoundaryList(String),

    /// A media file or side-car file could not be found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Frames were pushed into a driver that already finished.
    #[error("Pipeline is closed")]
    PipelineClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SegmentError {
    /// Shorthand for a [`SegmentError::Configuration`].
    pub fn config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error aborts the pipeline of the source it occurred in.
    ///
    /// Policy and sink errors are recovered locally; configuration errors never
    /// reach a running pipeline.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidBoundary { .. } | Self::UnsupportedDescriptor { .. }
        )
    }
}

/// Result type alias for segmentation operations.
pub type Result<T> = std::result::Result<T, SegmentError>;
