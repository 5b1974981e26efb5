//! Drives a frame stream through per-source pipelines into the output channel.
//!
//! ```text
//! Idle --first frame--> Streaming --end of stream / cancel--> Draining --> Done
//! ```

use crate::boundary::BoundaryProvider;
use crate::config::PipelineConfig;
use crate::pipeline::{SourcePipeline, SourceStats};
use crate::policy::PolicyFactory;
use crate::sink::SegmentSink;
use futures::{Stream, StreamExt};
use mediaseg_core::{Result, Segment, SegmentError, Source, SourceId, SourcedFrame};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of a [`StreamDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverState {
    Idle,
    Streaming,
    Draining,
    Done,
}

/// Collaborators injected into a pipeline.
#[derive(Clone, Default)]
pub struct PipelineDeps {
    pub boundary_provider: Option<Arc<dyn BoundaryProvider>>,
    pub sink: Option<Arc<dyn SegmentSink>>,
}

impl PipelineDeps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boundary_provider(mut self, provider: Arc<dyn BoundaryProvider>) -> Self {
        self.boundary_provider = Some(provider);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn SegmentSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

/// Statistics of one source after the driver finished.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source_id: SourceId,
    pub source_name: String,
    pub stats: SourceStats,
}

/// Summary returned when a driver is done.
#[derive(Debug, Clone, Serialize)]
pub struct DriverReport {
    pub state: DriverState,
    pub cancelled: bool,
    /// Sources in the order their first frame arrived.
    pub sources: Vec<SourceReport>,
    /// Segments delivered to the output channel.
    pub forwarded: usize,
}

impl DriverReport {
    /// Segments emitted across all sources.
    pub fn total_segments(&self) -> usize {
        self.sources.iter().map(|s| s.stats.segments).sum()
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.stats.failure.is_some())
    }

    pub fn source(&self, id: SourceId) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source_id == id)
    }
}

/// Routes frames to per-source pipelines and forwards finished segments.
///
/// Forwarding awaits free capacity in the output channel, so a slow consumer
/// stops ingestion.
pub struct StreamDriver {
    factory: PolicyFactory,
    sink: Option<Arc<dyn SegmentSink>>,
    pipelines: Vec<SourcePipeline>,
    index: HashMap<SourceId, usize>,
    output: mpsc::Sender<Arc<Segment>>,
    output_open: bool,
    state: DriverState,
    cancelled: bool,
    forwarded: usize,
}

impl StreamDriver {
    /// Validate the configuration against the injected collaborators and
    /// create the driver with its output channel.
    pub fn new(
        config: PipelineConfig,
        deps: PipelineDeps,
    ) -> Result<(Self, mpsc::Receiver<Arc<Segment>>)> {
        let factory = PolicyFactory::new(config.policy, deps.boundary_provider)?;
        let (output, rx) = mpsc::channel(config.channel_capacity.max(1));
        debug!(
            policy = factory.config().name(),
            capacity = config.channel_capacity,
            "Created stream driver"
        );
        Ok((
            Self {
                factory,
                sink: deps.sink,
                pipelines: Vec::new(),
                index: HashMap::new(),
                output,
                output_open: true,
                state: DriverState::Idle,
                cancelled: false,
                forwarded: 0,
            },
            rx,
        ))
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn transition(&mut self, next: DriverState) {
        info!(from = ?self.state, to = ?next, "Driver state change");
        self.state = next;
    }

    fn pipeline_for(&mut self, source: &Arc<Source>) -> &SourcePipeline {
        let next = self.pipelines.len();
        let slot = *self.index.entry(source.id).or_insert(next);
        if slot == next {
            let policy = self.factory.create(source);
            self.pipelines
                .push(SourcePipeline::new(source.clone(), policy, self.sink.clone()));
        }
        &self.pipelines[slot]
    }

    /// Route one frame and forward whatever segments it completes.
    pub async fn push(&mut self, item: SourcedFrame) -> Result<()> {
        match self.state {
            DriverState::Draining | DriverState::Done => return Err(SegmentError::PipelineClosed),
            DriverState::Idle => self.transition(DriverState::Streaming),
            DriverState::Streaming => {}
        }
        let SourcedFrame { frame, source } = item;
        let segments = self.pipeline_for(&source).push(frame);
        self.forward(segments).await;
        Ok(())
    }

    /// Drain every source and finish. Calling it again returns the same report.
    pub async fn finish(&mut self) -> DriverReport {
        if self.state != DriverState::Done {
            self.transition(DriverState::Draining);
            for i in 0..self.pipelines.len() {
                let segments = self.pipelines[i].drain();
                self.forward(segments).await;
            }
            debug_assert!(self.pipelines.iter().all(|p| p.is_drained()));
            self.transition(DriverState::Done);
        }
        self.report()
    }

    /// Consume `frames` until it ends or `cancel` fires, then drain.
    pub async fn run<S>(mut self, mut frames: S, cancel: CancellationToken) -> DriverReport
    where
        S: Stream<Item = SourcedFrame> + Unpin,
    {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Segmentation cancelled, draining");
                    self.cancelled = true;
                    break;
                }
                next = frames.next() => match next {
                    Some(item) => {
                        if let Err(e) = self.push(item).await {
                            warn!(error = %e, "Stopping ingestion");
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        let report = self.finish().await;
        info!(
            sources = report.sources.len(),
            segments = report.total_segments(),
            forwarded = report.forwarded,
            "Segmentation finished"
        );
        report
    }

    async fn forward(&mut self, segments: Vec<Arc<Segment>>) {
        for segment in segments {
            if !self.output_open {
                continue;
            }
            if self.output.send(segment).await.is_err() {
                warn!("Segment receiver dropped, segments are persisted but no longer forwarded");
                self.output_open = false;
            } else {
                self.forwarded += 1;
            }
        }
    }

    pub fn report(&self) -> DriverReport {
        DriverReport {
            state: self.state,
            cancelled: self.cancelled,
            sources: self
                .pipelines
                .iter()
                .map(|p| SourceReport {
                    source_id: p.source().id,
                    source_name: p.source().name.clone(),
                    stats: p.stats(),
                })
                .collect(),
            forwarded: self.forwarded,
        }
    }
}

/// Run a driver over `frames` on a tokio task.
///
/// Configuration problems are reported here, before anything is spawned.
pub fn spawn_pipeline<S>(
    config: PipelineConfig,
    deps: PipelineDeps,
    frames: S,
    cancel: CancellationToken,
) -> Result<(mpsc::Receiver<Arc<Segment>>, JoinHandle<DriverReport>)>
where
    S: Stream<Item = SourcedFrame> + Unpin + Send + 'static,
{
    let (driver, rx) = StreamDriver::new(config, deps)?;
    let handle = tokio::spawn(driver.run(frames, cancel));
    Ok((rx, handle))
}
