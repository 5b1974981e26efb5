//! MediaSeg Core - Foundation types for media segmentation
//!
//! This crate provides the types shared by every MediaSeg crate:
//! - Time representation (Timestamp, FrameRate, Window, TimeRange)
//! - Decoded frames (images and audio blocks) and their sources
//! - Upstream descriptors and vector distances
//! - Emitted segments and their persisted records

pub mod descriptor;
pub mod distance;
pub mod error;
pub mod frame;
pub mod segment;
pub mod source;
pub mod time;

pub use descriptor::{Descriptor, DescriptorId, DescriptorValue};
pub use distance::Distance;
pub use error::{Result, SegmentError};
pub use frame::{AudioBlock, Frame, FrameContent, FrameId, FrameKind, ImageFrame, PixelFormat};
pub use segment::{Predicate, Relationship, Segment, SegmentId, SegmentKind, SegmentRecord};
pub use source::{MediaType, Source, SourceId, SourceMetadata, SourcedFrame};
pub use time::{FrameRate, TimeRange, Timestamp, Window};

/// Defaults shared across the segmentation stage.
pub mod defaults {
    use std::time::Duration;

    /// Look-ahead applied by time-based policies when none is configured.
    pub const LOOK_AHEAD: Duration = Duration::from_secs(1);

    /// Window length used by the shot-boundary policy when no list is available
    /// and no duration is configured.
    pub const FALLBACK_WINDOW: Duration = Duration::from_secs(10);

    /// Capacity of the segment output channel. One slot is the closest tokio
    /// offers to a rendezvous channel.
    pub const OUTPUT_CAPACITY: usize = 1;
}
