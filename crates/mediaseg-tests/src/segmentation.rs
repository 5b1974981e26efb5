//! End-to-end segmentation through the stream driver.
//!
//! Exercises mediaseg-media decoders feeding each policy of
//! mediaseg-segment, with configuration coming from flat parameters.

use crate::support::{collect, frame_ids, source, sourced, BLUE, GREEN, RED};
use futures::stream;
use mediaseg_core::{
    Descriptor, DescriptorValue, FrameKind, SegmentError, SourcedFrame, Timestamp,
};
use mediaseg_media::{Scene, SyntheticConfig, SyntheticDecoder};
use mediaseg_segment::{
    spawn_pipeline, CancellationToken, FileBoundaryProvider, PipelineConfig, PipelineDeps,
    PipelineParams, StaticBoundaryProvider, StreamDriver,
};
use std::sync::Arc;
use std::time::Duration;

fn config(pairs: &[&str]) -> PipelineConfig {
    let params = PipelineParams::from_pairs(pairs.iter().copied()).unwrap();
    PipelineConfig::from_params(&params).unwrap()
}

fn config_error(pairs: &[&str], deps: PipelineDeps) -> String {
    let params = PipelineParams::from_pairs(pairs.iter().copied()).unwrap();
    let err = PipelineConfig::from_params(&params).and_then(|config| {
        spawn_pipeline(
            config,
            deps,
            stream::empty::<SourcedFrame>(),
            CancellationToken::new(),
        )
        .map(|_| ())
    });
    match err {
        Err(SegmentError::Configuration { parameter, .. }) => parameter,
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

fn three_scenes() -> SyntheticConfig {
    SyntheticConfig {
        scenes: vec![
            Scene::new(Duration::from_secs(1), RED, 220.0),
            Scene::new(Duration::from_secs(1), GREEN, 330.0),
            Scene::new(Duration::from_secs(1), BLUE, 440.0),
        ],
        ..SyntheticConfig::default()
    }
    .with_mean_color()
}

// ── Fixed duration ─────────────────────────────────────────────

#[tokio::test]
async fn fixed_windows_close_after_look_ahead() {
    let config = config(&[
        "type=fixed",
        "duration=500ms",
        "lookAheadTime=100ms",
        "channelCapacity=8",
    ]);
    let (mut driver, rx) = StreamDriver::new(config, PipelineDeps::new()).unwrap();
    let clip = source("clip.mp4");

    let stamps = [0, 100_000, 400_000, 600_000, 900_000, 1_100_000];
    for (id, ts) in stamps.into_iter().enumerate() {
        driver.push(sourced(&clip, id as u64, ts)).await.unwrap();
    }
    let report = driver.finish().await;
    drop(driver);

    let segments = collect(rx).await;
    let frames: Vec<Vec<u64>> = segments.iter().map(|s| frame_ids(s)).collect();
    assert_eq!(frames, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);

    let windows: Vec<_> = segments.iter().map(|s| s.window.unwrap()).collect();
    assert_eq!(windows[0].start, Timestamp::ZERO);
    assert_eq!(windows[0].end, Timestamp::from_millis(500));
    assert_eq!(windows[1].end, Timestamp::from_millis(1_000));
    assert_eq!(windows[2].start, Timestamp::from_millis(1_000));

    assert_eq!(report.total_segments(), 3);
    assert_eq!(report.forwarded, 3);
    assert!(report.failed_sources().next().is_none());
}

#[tokio::test]
async fn finish_flushes_frames_short_of_a_boundary() {
    let config = config(&["type=fixed", "duration=10", "channelCapacity=4"]);
    let (mut driver, rx) = StreamDriver::new(config, PipelineDeps::new()).unwrap();
    let clip = source("clip.mp4");
    for (id, ts) in [0, 40_000, 80_000].into_iter().enumerate() {
        driver.push(sourced(&clip, id as u64, ts)).await.unwrap();
    }
    let report = driver.finish().await;
    drop(driver);

    let segments = collect(rx).await;
    assert_eq!(segments.len(), 1);
    assert_eq!(frame_ids(&segments[0]), vec![0, 1, 2]);
    assert_eq!(segments[0].window.unwrap().end, Timestamp::from_secs(10));
    assert_eq!(report.state, mediaseg_segment::DriverState::Done);
}

#[tokio::test]
async fn fixed_windows_over_decoded_audio_and_video() {
    let decoder = SyntheticDecoder::open(
        "interview.mp4",
        SyntheticConfig::uniform(Duration::from_secs(4)),
    )
    .unwrap();
    let config = config(&["type=fixed", "duration=1", "lookAheadTime=0"]);
    let (rx, handle) = spawn_pipeline(
        config,
        PipelineDeps::new(),
        stream::iter(decoder),
        CancellationToken::new(),
    )
    .unwrap();

    let segments = collect(rx).await;
    let report = handle.await.unwrap();

    assert_eq!(segments.len(), 4);
    for (i, segment) in segments.iter().enumerate() {
        let window = segment.window.unwrap();
        assert_eq!(window.start, Timestamp::from_secs(i as i64));
        // 25 images and 25 audio blocks of 40 ms per second
        let images = segment.frames.iter().filter(|f| f.kind() == FrameKind::Image);
        assert_eq!(images.count(), 25);
        assert_eq!(segment.frames.len(), 50);
        assert!(segment
            .frames
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }
    assert_eq!(report.sources[0].stats.accepted, 200);
    assert_eq!(report.sources[0].stats.emitted_frames, 200);
}

// ── Descriptor distance ────────────────────────────────────────

#[tokio::test]
async fn mean_color_change_starts_a_new_segment() {
    let decoder = SyntheticDecoder::open("scenes.mp4", three_scenes()).unwrap();
    let config = config(&[
        "type=contentDistance",
        "distance=euclidean",
        "authorName=meanColor",
        "atMost=0.2",
    ]);
    let (rx, handle) = spawn_pipeline(
        config,
        PipelineDeps::new(),
        stream::iter(decoder),
        CancellationToken::new(),
    )
    .unwrap();

    let segments = collect(rx).await;
    let report = handle.await.unwrap();

    assert_eq!(segments.len(), 3);
    for segment in &segments {
        assert_eq!(segment.frames.len(), 25);
        assert_eq!(segment.descriptors.len(), 25);
    }
    assert_eq!(segments[0].window.unwrap().start, Timestamp::MIN);
    assert_eq!(segments[0].window.unwrap().end, Timestamp::from_secs(1));
    assert_eq!(segments[1].window.unwrap().start, Timestamp::from_secs(1));
    assert_eq!(segments[2].window.unwrap().end, Timestamp::MAX);

    let first = segments[0].time_range.unwrap();
    assert_eq!(first.start, Timestamp::ZERO);
    assert_eq!(first.end, Timestamp::from_millis(960));
    assert!(first.precedes(segments[1].time_range.unwrap()));

    // Audio blocks carry no mean color and are never buffered
    let stats = &report.sources[0].stats;
    assert_eq!(stats.skipped, 75);
    assert_eq!(stats.accepted, 75);
}

#[tokio::test]
async fn unsupported_descriptor_fails_one_source_only() {
    let config = config(&[
        "type=descriptorDistance",
        "distance=cosine",
        "authorName=clip",
        "atMost=0.2",
        "channelCapacity=16",
    ]);
    let (mut driver, rx) = StreamDriver::new(config, PipelineDeps::new()).unwrap();
    let good = source("good.mp4");
    let bad = source("bad.mp4");

    let vector = |v: Vec<f32>| Descriptor::float_vector("clip", v);
    for i in 0..6u64 {
        let direction = if i < 3 { vec![1.0, 0.0] } else { vec![0.0, 1.0] };
        let mut frame = sourced(&good, i, i as i64 * 40_000);
        frame.frame = frame.frame.with_descriptor(vector(direction));
        driver.push(frame).await.unwrap();

        let mut frame = sourced(&bad, 100 + i, i as i64 * 40_000);
        frame.frame = if i == 2 {
            frame.frame.with_descriptor(Descriptor::new(
                "clip",
                DescriptorValue::IntVector(vec![1, 2]),
            ))
        } else {
            frame.frame.with_descriptor(vector(vec![1.0, 0.0]))
        };
        driver.push(frame).await.unwrap();
    }
    let report = driver.finish().await;
    drop(driver);
    let segments = collect(rx).await;

    assert_eq!(segments.len(), 2);
    assert!(segments.iter().all(|s| s.source.id == good.id));
    assert_eq!(frame_ids(&segments[0]), vec![0, 1, 2]);
    assert_eq!(frame_ids(&segments[1]), vec![3, 4, 5]);

    let failed: Vec<_> = report.failed_sources().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source_id, bad.id);
    assert!(failed[0].stats.failure.as_deref().unwrap().contains("int vector"));
    assert_eq!(failed[0].stats.segments, 0);
}

// ── Shot boundaries ────────────────────────────────────────────

#[tokio::test]
async fn shot_lists_from_files_drive_the_windows() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("msb")).unwrap();
    std::fs::write(
        dir.path().join("msb").join("clip.tsv"),
        "startFrame\tstartTime\tendFrame\tendTime\n0\t0.0\t25\t1.0\n25\t1.0\t75\t3.0\n",
    )
    .unwrap();
    let provider = Arc::new(FileBoundaryProvider::new("files", dir.path()));

    let decoder = SyntheticDecoder::open(
        "clip.mp4",
        SyntheticConfig::uniform(Duration::from_secs(4)).without_audio(),
    )
    .unwrap();
    let config = config(&[
        "type=shotBoundary",
        "sbProvider=files",
        "sbName=msb",
        "tolerance=0",
        "lookAheadTime=0",
    ]);
    let (rx, handle) = spawn_pipeline(
        config,
        PipelineDeps::new().with_boundary_provider(provider),
        stream::iter(decoder),
        CancellationToken::new(),
    )
    .unwrap();

    let segments = collect(rx).await;
    handle.await.unwrap();

    let sizes: Vec<usize> = segments.iter().map(|s| s.frames.len()).collect();
    assert_eq!(sizes, vec![25, 50, 25]);
    assert_eq!(segments[0].window.unwrap().end, Timestamp::from_secs(1));
    assert_eq!(segments[1].window.unwrap().end, Timestamp::from_secs(3));
    // Past the list the last shot length (2 s) is used
    assert_eq!(segments[2].window.unwrap().end, Timestamp::from_secs(5));
    assert!(segments
        .iter()
        .all(|s| s.window.unwrap().tolerance == Some(Duration::ZERO)));
}

#[tokio::test]
async fn missing_shot_list_falls_back_to_fixed_windows() {
    let provider = Arc::new(StaticBoundaryProvider::new("static"));
    let decoder = SyntheticDecoder::open(
        "unknown.mp4",
        SyntheticConfig::uniform(Duration::from_secs(3)).without_audio(),
    )
    .unwrap();
    let config = config(&[
        "type=shotBoundary",
        "sbProvider=static",
        "sbName=msb",
        "tolerance=40",
        "duration=1000",
        "lookAheadTime=0",
    ]);
    let (rx, handle) = spawn_pipeline(
        config,
        PipelineDeps::new().with_boundary_provider(provider),
        stream::iter(decoder),
        CancellationToken::new(),
    )
    .unwrap();

    let segments = collect(rx).await;
    handle.await.unwrap();

    assert_eq!(segments.len(), 3);
    assert!(segments.iter().all(|s| s.frames.len() == 25));
}

// ── Configuration ──────────────────────────────────────────────

#[test]
fn configuration_errors_surface_before_spawning() {
    let sb = ["type=shotBoundary", "sbProvider=files", "sbName=msb", "tolerance=0"];
    assert_eq!(config_error(&sb, PipelineDeps::new()), "sbProvider");

    let other = PipelineDeps::new()
        .with_boundary_provider(Arc::new(StaticBoundaryProvider::new("static")));
    assert_eq!(config_error(&sb, other), "sbProvider");

    assert_eq!(
        config_error(&["type=shotBoundary", "sbProvider=files", "sbName=msb"], PipelineDeps::new()),
        "tolerance"
    );
    assert_eq!(config_error(&["type=fixed"], PipelineDeps::new()), "duration");
    assert_eq!(config_error(&["type=sometimes"], PipelineDeps::new()), "type");
    assert_eq!(
        config_error(
            &["type=descriptorDistance", "distance=euclidean", "authorName=clip"],
            PipelineDeps::new()
        ),
        "atLeast"
    );
    assert_eq!(
        config_error(
            &["type=descriptorDistance", "distance=hamming", "authorName=clip", "atMost=1"],
            PipelineDeps::new()
        ),
        "distance"
    );
}
