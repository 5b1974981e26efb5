//! MediaSeg Segment - streaming temporal segmentation
//!
//! This crate turns a stream of timestamped frames into segments:
//! - Window state and the pluggable segmentation policies
//!   (fixed duration, shot boundaries, descriptor distance, pass-through)
//! - Injected shot-boundary providers and persistence sinks
//! - The per-source pipeline and the async stream driver

pub mod boundary;
pub mod config;
pub mod driver;
pub mod emitter;
pub mod pipeline;
pub mod policy;
pub mod sink;
pub mod window;

pub use boundary::{BoundaryProvider, FileBoundaryProvider, ShotBoundary, StaticBoundaryProvider};
pub use config::{
    DescriptorDistanceConfig, FixedDurationConfig, PipelineConfig, PipelineParams, PolicyConfig,
    ShotBoundaryConfig,
};
pub use driver::{spawn_pipeline, DriverReport, DriverState, PipelineDeps, SourceReport, StreamDriver};
pub use emitter::SegmentEmitter;
pub use pipeline::{SourcePipeline, SourceStats};
pub use policy::{PolicyFactory, SegmentationPolicy};
pub use sink::{JsonlSink, MemorySink, SegmentSink};
pub use window::{Accepted, Boundary, WindowState};

pub use tokio_util::sync::CancellationToken;
