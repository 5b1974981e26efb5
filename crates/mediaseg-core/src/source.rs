//! Media sources and the frames tagged with them.

use crate::frame::Frame;
use crate::time::FrameRate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier of a source. Also the id of the source's root record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(pub Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Broad media type of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Video,
    Audio,
    Image,
    Mesh,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Mesh => "mesh",
        }
    }
}

/// Descriptive metadata, populated once per source before segmentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub frame_rate: Option<FrameRate>,
    pub duration: Option<Duration>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
}

/// An original media asset (file or stream).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    /// File name or stream name, e.g. `interview.mp4`.
    pub name: String,
    /// Location of the asset.
    pub uri: String,
    pub media_type: MediaType,
    pub metadata: SourceMetadata,
}

impl Source {
    pub fn new(name: impl Into<String>, uri: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: SourceId::new(),
            name: name.into(),
            uri: uri.into(),
            media_type,
            metadata: SourceMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Name up to the first `.`, used to look up per-asset side data such as
    /// shot-boundary lists.
    pub fn stem(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A frame together with the source it was decoded from.
#[derive(Debug, Clone)]
pub struct SourcedFrame {
    pub frame: Frame,
    pub source: Arc<Source>,
}

impl SourcedFrame {
    pub fn new(frame: Frame, source: Arc<Source>) -> Self {
        Self { frame, source }
    }
}
