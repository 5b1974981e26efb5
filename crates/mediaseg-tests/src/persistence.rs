//! Segment records written through the JSON-lines sink.

use crate::support::{image_at, source};
use futures::stream;
use mediaseg_core::{Predicate, SegmentId, SegmentKind, SourcedFrame};
use mediaseg_media::{SyntheticConfig, SyntheticDecoder};
use mediaseg_segment::{
    spawn_pipeline, CancellationToken, FixedDurationConfig, JsonlSink, PipelineConfig,
    PipelineDeps, PolicyConfig, PolicyFactory, SegmentSink, SourcePipeline,
};
use std::sync::Arc;
use std::time::Duration;

fn fixed_second() -> PolicyConfig {
    PolicyConfig::FixedDuration(
        FixedDurationConfig::new(Duration::from_secs(1), Duration::ZERO).unwrap(),
    )
}

#[test]
fn source_root_is_written_once_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let clip = source("clip.mp4");
    let factory = PolicyFactory::new(fixed_second(), None).unwrap();

    for run in 0..2i64 {
        let sink: Arc<dyn SegmentSink> = Arc::new(JsonlSink::open(dir.path()).unwrap());
        let pipeline = SourcePipeline::new(clip.clone(), factory.create(&clip), Some(sink));
        // The second run starts ten seconds in, leaving empty windows behind
        let offset = run * 10_000_000;
        let mut emitted = 0;
        for id in 0..30 {
            emitted += pipeline.push(image_at(id as u64, offset + id * 100_000)).len();
        }
        emitted += pipeline.drain().len();
        assert_eq!(emitted, 3);
    }

    let sink = JsonlSink::open(dir.path()).unwrap();
    let records = sink.load().unwrap();
    let roots: Vec<_> = records
        .iter()
        .filter(|r| r.kind == SegmentKind::Source)
        .collect();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, SegmentId::root_of(clip.id));
    assert_eq!(records.len(), 1 + 2 * 3);

    for record in records.iter().filter(|r| r.kind == SegmentKind::Segment) {
        assert_eq!(record.source_id, clip.id);
        assert_eq!(record.relationships.len(), 1);
        let edge = record.relationships[0];
        assert_eq!(edge.subject, record.id);
        assert_eq!(edge.predicate, Predicate::PartOf);
        assert_eq!(edge.object, roots[0].id);
    }
}

#[tokio::test]
async fn records_match_forwarded_segments() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonlSink::open(dir.path()).unwrap());
    let decoder = SyntheticDecoder::open(
        "clip.mp4",
        SyntheticConfig::uniform(Duration::from_secs(2)).with_mean_color(),
    )
    .unwrap();
    let source = decoder.source().clone();

    let (rx, handle) = spawn_pipeline(
        PipelineConfig::new(fixed_second()),
        PipelineDeps::new().with_sink(sink.clone()),
        stream::iter(decoder),
        CancellationToken::new(),
    )
    .unwrap();
    let segments = crate::support::collect(rx).await;
    handle.await.unwrap();

    let records = sink.load().unwrap();
    assert_eq!(records.len(), segments.len() + 1);
    assert_eq!(records[0].kind, SegmentKind::Source);
    assert_eq!(records[0].source_name, "clip.mp4");

    for (segment, record) in segments.iter().zip(&records[1..]) {
        assert_eq!(record.id, segment.id);
        assert_eq!(record.window, segment.window);
        assert_eq!(record.time_range, segment.time_range);
        assert_eq!(record.frame_ids.len(), segment.frames.len());
        assert_eq!(record.descriptor_ids.len(), 25);
        assert_eq!(segment.parent(), Some(SegmentId::root_of(source.id)));
    }

    // Pixel and sample data stay out of the file
    let text = std::fs::read_to_string(sink.path()).unwrap();
    assert!(!text.contains("\"data\""));
}

#[tokio::test]
async fn empty_stream_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonlSink::open(dir.path()).unwrap());
    let (rx, handle) = spawn_pipeline(
        PipelineConfig::new(fixed_second()),
        PipelineDeps::new().with_sink(sink.clone()),
        stream::empty::<SourcedFrame>(),
        CancellationToken::new(),
    )
    .unwrap();
    assert!(crate::support::collect(rx).await.is_empty());
    let report = handle.await.unwrap();
    assert!(report.sources.is_empty());
    assert!(sink.load().unwrap().is_empty());
}
