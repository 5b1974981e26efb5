//! Synthetic decoder producing timestamped image and audio frames.
//!
//! Stands in for a real container decoder: a source is described as a list
//! of [`Scene`]s, each rendered as solid-color images plus a sine tone. Image
//! and audio frames are interleaved in timestamp order, the way a demuxer
//! hands them out.

use mediaseg_core::{
    AudioBlock, Descriptor, Frame, FrameId, FrameRate, ImageFrame, MediaType, Result,
    SegmentError, Source, SourceMetadata, SourcedFrame, Timestamp,
};
use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Author name of the mean-color descriptor attached to image frames.
pub const MEAN_COLOR_AUTHOR: &str = "meanColor";

/// A stretch of uniform content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scene {
    pub duration: Duration,
    pub color: [u8; 4],
    pub tone_hz: f32,
}

impl Scene {
    pub fn new(duration: Duration, color: [u8; 4], tone_hz: f32) -> Self {
        Self {
            duration,
            color,
            tone_hz,
        }
    }
}

/// Shape of the synthetic source.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel in one audio block. Zero disables audio.
    pub block_samples: usize,
    /// Attach a [`MEAN_COLOR_AUTHOR`] descriptor to every image frame.
    pub mean_color: bool,
    pub scenes: Vec<Scene>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 36,
            frame_rate: FrameRate::FPS_25,
            sample_rate: 48_000,
            channels: 2,
            block_samples: 1920,
            mean_color: false,
            scenes: vec![Scene::new(Duration::from_secs(10), [128, 128, 128, 255], 440.0)],
        }
    }
}

impl SyntheticConfig {
    /// A single scene of the given length.
    pub fn uniform(duration: Duration) -> Self {
        Self {
            scenes: vec![Scene::new(duration, [128, 128, 128, 255], 440.0)],
            ..Self::default()
        }
    }

    /// Images only.
    pub fn without_audio(mut self) -> Self {
        self.block_samples = 0;
        self
    }

    pub fn with_mean_color(mut self) -> Self {
        self.mean_color = true;
        self
    }

    pub fn total_duration(&self) -> Duration {
        self.scenes.iter().map(|s| s.duration).sum()
    }
}

/// Mean RGB of an RGBA8 image, each channel in `[0, 1]`.
pub fn mean_color(image: &ImageFrame) -> Vec<f32> {
    let mut sums = [0u64; 3];
    let mut pixels = 0u64;
    for px in image.data().chunks_exact(4) {
        sums[0] += px[0] as u64;
        sums[1] += px[1] as u64;
        sums[2] += px[2] as u64;
        pixels += 1;
    }
    if pixels == 0 {
        return vec![0.0; 3];
    }
    sums.iter()
        .map(|&s| (s as f64 / pixels as f64 / 255.0) as f32)
        .collect()
}

/// Decoder over a scripted list of scenes.
pub struct SyntheticDecoder {
    source: Arc<Source>,
    config: SyntheticConfig,
    total: Timestamp,
    image_index: i64,
    audio_samples: u64,
    next_id: u64,
}

impl SyntheticDecoder {
    /// Open a synthetic source named `name`.
    pub fn open(name: &str, config: SyntheticConfig) -> Result<Self> {
        let source = Source::new(name, format!("synthetic://{}", name), MediaType::Video);
        Self::for_source(source, config)
    }

    /// Synthesize frames for an existing source, e.g. one built from a
    /// [`MediaProbe`](crate::MediaProbe). Identity, location and media type
    /// are kept; the metadata is replaced by the script's.
    pub fn for_source(source: Source, config: SyntheticConfig) -> Result<Self> {
        let name = source.name.as_str();
        if config.scenes.is_empty() {
            return Err(SegmentError::UnsupportedFormat(format!(
                "Synthetic source '{}' has no scenes",
                name
            )));
        }
        if config.frame_rate.numerator == 0 || config.frame_rate.denominator == 0 {
            return Err(SegmentError::UnsupportedFormat(format!(
                "Synthetic source '{}' has a zero frame rate",
                name
            )));
        }
        if config.block_samples > 0 && (config.sample_rate == 0 || config.channels == 0) {
            return Err(SegmentError::UnsupportedFormat(format!(
                "Synthetic source '{}' has audio blocks but no sample rate or channels",
                name
            )));
        }

        let duration = config.total_duration();
        let has_audio = config.block_samples > 0;
        let metadata = SourceMetadata {
            frame_rate: Some(config.frame_rate),
            duration: Some(duration),
            width: Some(config.width),
            height: Some(config.height),
            channels: has_audio.then_some(config.channels),
            sample_rate: has_audio.then_some(config.sample_rate),
        };

        info!(
            source = name,
            media_type = source.media_type.as_str(),
            scenes = config.scenes.len(),
            duration_secs = duration.as_secs_f64(),
            fps = config.frame_rate.to_fps_f64(),
            "Opening synthetic source"
        );

        Ok(Self {
            source: Arc::new(source.with_metadata(metadata)),
            total: Timestamp::ZERO.saturating_add(duration),
            config,
            image_index: 0,
            audio_samples: 0,
            next_id: 0,
        })
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    fn next_image_ts(&self) -> Option<Timestamp> {
        let ts = Timestamp::from_frames(self.image_index, self.config.frame_rate);
        (ts < self.total).then_some(ts)
    }

    fn next_audio_ts(&self) -> Option<Timestamp> {
        if self.config.block_samples == 0 {
            return None;
        }
        let micros = self.audio_samples as i128 * 1_000_000 / self.config.sample_rate as i128;
        let ts = Timestamp::from_micros(micros as i64);
        (ts < self.total).then_some(ts)
    }

    fn scene_at(&self, ts: Timestamp) -> &Scene {
        let mut end = Timestamp::ZERO;
        for scene in &self.config.scenes {
            end = end.saturating_add(scene.duration);
            if ts < end {
                return scene;
            }
        }
        // ts < total, so the loop always returns; the last scene is a safe answer.
        &self.config.scenes[self.config.scenes.len() - 1]
    }

    fn take_id(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        id
    }

    fn decode_image(&mut self, ts: Timestamp) -> Frame {
        let scene = *self.scene_at(ts);
        let image = ImageFrame::solid(self.config.width, self.config.height, scene.color);
        let id = self.take_id();
        self.image_index += 1;

        let mut frame = Frame::image(id, ts, image.clone());
        if self.config.mean_color {
            frame = frame.with_descriptor(Descriptor::float_vector(
                MEAN_COLOR_AUTHOR,
                mean_color(&image),
            ));
        }
        frame
    }

    fn decode_audio(&mut self, ts: Timestamp) -> Frame {
        let scene = *self.scene_at(ts);
        let channels = self.config.channels as usize;
        let rate = self.config.sample_rate as f32;
        let start = self.audio_samples;

        let mut samples = Vec::with_capacity(self.config.block_samples * channels);
        for i in 0..self.config.block_samples as u64 {
            let t = (start + i) as f32 / rate;
            let value = 0.25 * (TAU * scene.tone_hz * t).sin();
            samples.extend(std::iter::repeat(value).take(channels));
        }

        let id = self.take_id();
        self.audio_samples += self.config.block_samples as u64;
        Frame::audio(
            id,
            ts,
            AudioBlock::new(self.config.sample_rate, self.config.channels, samples),
        )
    }

    /// Decode the next frame in timestamp order, or `None` at end of stream.
    pub fn decode_frame(&mut self) -> Option<SourcedFrame> {
        let frame = match (self.next_image_ts(), self.next_audio_ts()) {
            (Some(image), Some(audio)) if audio < image => self.decode_audio(audio),
            (Some(image), _) => self.decode_image(image),
            (None, Some(audio)) => self.decode_audio(audio),
            (None, None) => return None,
        };
        Some(SourcedFrame::new(frame, self.source.clone()))
    }
}

impl Iterator for SyntheticDecoder {
    type Item = SourcedFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_frame()
    }
}
