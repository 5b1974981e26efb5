//! Back-pressure, cancellation and routing across the async boundary.

use crate::support::{collect, frame_ids, source, sourced};
use futures::stream;
use mediaseg_core::{SegmentError, Timestamp};
use mediaseg_media::{frame_feed, spawn_decoder, SyntheticConfig, SyntheticDecoder};
use mediaseg_segment::{
    spawn_pipeline, CancellationToken, DriverState, PipelineConfig, PipelineDeps, PipelineParams,
    PolicyConfig, StreamDriver,
};
use std::time::Duration;
use tokio::time::timeout;

fn fixed(duration: &str) -> PipelineConfig {
    let params = PipelineParams::new()
        .with("type", "fixed")
        .with("duration", duration)
        .with("lookAheadTime", "0");
    PipelineConfig::from_params(&params).unwrap()
}

#[tokio::test]
async fn slow_consumer_stops_ingestion() {
    let clip = source("clip.mp4");
    let (feed, frames) = frame_feed(1);
    let (rx, handle) = spawn_pipeline(
        PipelineConfig::new(PolicyConfig::PassThrough),
        PipelineDeps::new(),
        frames,
        CancellationToken::new(),
    )
    .unwrap();

    // Nobody reads segments yet: only a handful of frames fit in the channels.
    let mut sent = 0u64;
    while sent < 10 {
        let send = feed.send(sourced(&clip, sent, sent as i64 * 1_000));
        if timeout(Duration::from_millis(100), send).await.is_err() {
            break;
        }
        sent += 1;
    }
    assert!(sent < 10, "ingestion never blocked");
    assert!(sent <= 5, "{sent} frames accepted without a consumer");

    let consumer = tokio::spawn(collect(rx));
    for id in sent..10 {
        feed.send(sourced(&clip, id, id as i64 * 1_000)).await.unwrap();
    }
    drop(feed);

    let segments = consumer.await.unwrap();
    let report = handle.await.unwrap();
    let ids: Vec<u64> = segments.iter().flat_map(|s| frame_ids(s)).collect();
    assert_eq!(ids, (0..10).collect::<Vec<_>>());
    assert_eq!(report.forwarded, 10);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn cancellation_drains_open_windows() {
    let clip = source("clip.mp4");
    let (feed, frames) = frame_feed(32);
    let cancel = CancellationToken::new();
    let (mut rx, handle) =
        spawn_pipeline(fixed("1"), PipelineDeps::new(), frames, cancel.clone()).unwrap();

    // Frame 10 sits at 1 s and closes the first window
    for id in 0..=10u64 {
        feed.send(sourced(&clip, id, id as i64 * 100_000)).await.unwrap();
    }
    let first = rx.recv().await.unwrap();
    assert_eq!(frame_ids(&first), (0..10).collect::<Vec<_>>());

    cancel.cancel();
    let rest = collect(rx).await;
    let report = handle.await.unwrap();

    assert_eq!(rest.len(), 1);
    assert_eq!(frame_ids(&rest[0]), vec![10]);
    assert_eq!(rest[0].window.unwrap().start, Timestamp::from_secs(1));
    assert!(report.cancelled);
    assert_eq!(report.state, DriverState::Done);
    assert_eq!(report.sources[0].stats.accepted, 11);
    // The driver dropped its end of the feed
    assert!(feed.is_closed());
}

#[tokio::test]
async fn cancellation_stops_the_decoder_thread() {
    let decoder = SyntheticDecoder::open(
        "long.mp4",
        SyntheticConfig::uniform(Duration::from_secs(60)),
    )
    .unwrap();
    let (feed, frames) = frame_feed(2);
    let decoder_thread = spawn_decoder(decoder, feed).unwrap();

    let cancel = CancellationToken::new();
    let (mut rx, handle) =
        spawn_pipeline(fixed("1"), PipelineDeps::new(), frames, cancel.clone()).unwrap();
    assert!(rx.recv().await.is_some());
    cancel.cancel();

    let rest = collect(rx).await;
    let report = handle.await.unwrap();
    let delivered = tokio::task::spawn_blocking(move || decoder_thread.join().unwrap())
        .await
        .unwrap();

    assert!(report.cancelled);
    // 60 s of 25 fps video plus 40 ms audio blocks
    assert!(delivered < 3_000, "decoder ran to completion: {delivered}");
    let stats = &report.sources[0].stats;
    assert_eq!(stats.emitted_frames, stats.accepted);
    assert_eq!(report.forwarded, 1 + rest.len());
}

#[tokio::test]
async fn sources_are_segmented_independently() {
    let config = fixed("1").with_channel_capacity(16);
    let (mut driver, rx) = StreamDriver::new(config, PipelineDeps::new()).unwrap();
    let a = source("a.mp4");
    let b = source("b.mp4");

    // Interleaved; b runs half a second behind a
    for i in 0..20u64 {
        driver
            .push(sourced(&a, i, i as i64 * 100_000))
            .await
            .unwrap();
        driver
            .push(sourced(&b, 100 + i, i as i64 * 100_000 - 500_000))
            .await
            .unwrap();
    }
    let report = driver.finish().await;

    let err = driver.push(sourced(&a, 99, 5_000_000)).await.unwrap_err();
    assert!(matches!(err, SegmentError::PipelineClosed));
    assert_eq!(driver.finish().await.forwarded, report.forwarded);
    drop(driver);

    let segments = collect(rx).await;
    let of = |id| {
        segments
            .iter()
            .filter(|s| s.source.id == id)
            .map(|s| frame_ids(s))
            .collect::<Vec<_>>()
    };
    assert_eq!(of(a.id), vec![(0..10).collect::<Vec<_>>(), (10..20).collect()]);

    // b's negative timestamps fall before its origin and are dropped as late
    assert_eq!(of(b.id), vec![(105..115).collect::<Vec<_>>(), (115..120).collect()]);
    let b_stats = &report.source(b.id).unwrap().stats;
    assert_eq!(b_stats.late, 5);
    assert_eq!(report.sources[0].source_id, a.id);
}

#[tokio::test]
async fn dropped_receiver_does_not_stop_persistence() {
    let decoder = SyntheticDecoder::open(
        "clip.mp4",
        SyntheticConfig::uniform(Duration::from_secs(3)).without_audio(),
    )
    .unwrap();
    let sink = std::sync::Arc::new(mediaseg_segment::MemorySink::new());
    let deps = PipelineDeps::new().with_sink(sink.clone());
    let (rx, handle) = spawn_pipeline(
        fixed("1"),
        deps,
        stream::iter(decoder),
        CancellationToken::new(),
    )
    .unwrap();
    drop(rx);

    let report = handle.await.unwrap();
    assert_eq!(report.forwarded, 0);
    assert_eq!(report.total_segments(), 3);
    // Three windows plus the source root
    assert_eq!(sink.len(), 4);
}
