//! Shared fixtures for the integration tests.

use mediaseg_core::{Frame, FrameId, ImageFrame, MediaType, Segment, Source, SourcedFrame, Timestamp};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const RED: [u8; 4] = [220, 30, 30, 255];
pub const GREEN: [u8; 4] = [30, 200, 60, 255];
pub const BLUE: [u8; 4] = [30, 60, 220, 255];

pub fn source(name: &str) -> Arc<Source> {
    Arc::new(Source::new(name, format!("/media/{name}"), MediaType::Video))
}

pub fn image_at(id: u64, micros: i64) -> Frame {
    Frame::image(FrameId(id), Timestamp::from_micros(micros), ImageFrame::solid(2, 2, [0; 4]))
}

pub fn sourced(source: &Arc<Source>, id: u64, micros: i64) -> SourcedFrame {
    SourcedFrame::new(image_at(id, micros), source.clone())
}

pub fn frame_ids(segment: &Segment) -> Vec<u64> {
    segment.frames.iter().map(|f| f.id.0).collect()
}

/// Receive until the driver closes the channel.
pub async fn collect(mut rx: mpsc::Receiver<Arc<Segment>>) -> Vec<Arc<Segment>> {
    let mut segments = Vec::new();
    while let Some(segment) = rx.recv().await {
        segments.push(segment);
    }
    segments
}
