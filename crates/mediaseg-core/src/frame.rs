//! Decoded frames as they arrive from the decoder.
//!
//! A [`Frame`] is either an image or a block of audio samples. Payloads are
//! reference counted so that moving a frame from the buffer into a segment and
//! handing the segment to several consumers never copies pixel or sample data.

use crate::descriptor::Descriptor;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Duration;

/// Identifier of a frame, unique within its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub u64);

/// Pixel format of an image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (32 bits per pixel)
    #[default]
    Rgba8,
    /// 8-bit grayscale
    Gray8,
    /// NV12 YUV format
    Nv12,
    /// YUV 4:2:0 planar
    Yuv420P,
}

impl PixelFormat {
    /// Calculate total bytes needed for a frame of this format.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        let luma = width as usize * height as usize;
        match self {
            Self::Rgba8 => luma * 4,
            Self::Gray8 => luma,
            // Y plane + UV interleaved at half resolution
            Self::Nv12 => luma + luma / 2,
            // Y + U + V planes, U/V at quarter size
            Self::Yuv420P => luma + (width as usize / 2) * (height as usize / 2) * 2,
        }
    }
}

/// A decoded picture in CPU memory.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    data: Arc<[u8]>,
}

impl ImageFrame {
    /// Wrap decoded pixel data. Returns `None` if `data` is too short for the
    /// given dimensions and format.
    pub fn from_data(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
        if data.len() < format.frame_size(width, height) {
            return None;
        }
        Some(Self {
            format,
            width,
            height,
            data: data.into(),
        })
    }

    /// A zero-filled image.
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            format,
            width,
            height,
            data: vec![0u8; format.frame_size(width, height)].into(),
        }
    }

    /// An RGBA8 image filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let data: Vec<u8> = rgba.iter().copied().cycle().take(pixels * 4).collect();
        Self {
            format: PixelFormat::Rgba8,
            width,
            height,
            data: data.into(),
        }
    }

    /// Create a test pattern frame (eight vertical color bars).
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 4]; 8] = [
            [255, 255, 255, 255], // White
            [255, 255, 0, 255],   // Yellow
            [0, 255, 255, 255],   // Cyan
            [0, 255, 0, 255],     // Green
            [255, 0, 255, 255],   // Magenta
            [255, 0, 0, 255],     // Red
            [0, 0, 255, 255],     // Blue
            [0, 0, 0, 255],       // Black
        ];
        let mut data = Vec::with_capacity(PixelFormat::Rgba8.frame_size(width, height));
        for _ in 0..height {
            for x in 0..width {
                let bar = (x as u64 * 8 / width.max(1) as u64) as usize;
                data.extend_from_slice(&BARS[bar.min(7)]);
            }
        }
        Self {
            format: PixelFormat::Rgba8,
            width,
            height,
            data: data.into(),
        }
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Total memory usage of the pixel data in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}

/// A block of interleaved PCM samples.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    pub sample_rate: u32,
    pub channels: u16,
    samples: Arc<[f32]>,
}

impl AudioBlock {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels,
            samples: samples.into(),
        }
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples per channel.
    pub fn frames_per_channel(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Playback duration of this block.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.frames_per_channel() as u64 * 1_000_000 / self.sample_rate as u64)
    }
}

/// Which kind of content a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    Image,
    Audio,
}

/// Payload of a frame.
#[derive(Debug, Clone)]
pub enum FrameContent {
    Image(ImageFrame),
    Audio(AudioBlock),
}

/// A single decoded unit of media content.
///
/// Frames without a timestamp cannot be placed in a window and are discarded
/// before segmentation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    pub content: FrameContent,
    pub timestamp: Option<Timestamp>,
    /// Descriptors computed upstream, if any.
    pub descriptors: SmallVec<[Descriptor; 2]>,
}

impl Frame {
    pub fn image(id: FrameId, timestamp: Timestamp, image: ImageFrame) -> Self {
        Self {
            id,
            content: FrameContent::Image(image),
            timestamp: Some(timestamp),
            descriptors: SmallVec::new(),
        }
    }

    pub fn audio(id: FrameId, timestamp: Timestamp, block: AudioBlock) -> Self {
        Self {
            id,
            content: FrameContent::Audio(block),
            timestamp: Some(timestamp),
            descriptors: SmallVec::new(),
        }
    }

    /// Attach an upstream descriptor.
    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Drop the timestamp (for content that is not temporal).
    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = None;
        self
    }

    #[inline]
    pub fn has_timestamp(&self) -> bool {
        self.timestamp.is_some()
    }

    pub fn kind(&self) -> FrameKind {
        match self.content {
            FrameContent::Image(_) => FrameKind::Image,
            FrameContent::Audio(_) => FrameKind::Audio,
        }
    }

    /// Descriptors produced by the given extractor.
    pub fn descriptors_by<'a>(&'a self, author: &'a str) -> impl Iterator<Item = &'a Descriptor> {
        self.descriptors.iter().filter(move |d| d.is_from(author))
    }
}
