//! MediaSeg Media - frame sources for the segmentation stage
//!
//! This crate handles:
//! - Probing media files for their type and metadata
//! - Decoding (synthetic) sources into timestamped frames
//! - Feeding frames from decoder threads into the async pipeline

pub mod decoder;
pub mod feed;
pub mod probe;

pub use decoder::{Scene, SyntheticConfig, SyntheticDecoder, MEAN_COLOR_AUTHOR};
pub use feed::{frame_feed, spawn_decoder, FeedClosed, FeedSender, FrameStream};
pub use probe::{media_type_for, MediaProbe};
