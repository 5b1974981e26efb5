//! Property tests over arbitrary frame timings.

use crate::support::{image_at, source};
use mediaseg_core::{Segment, Timestamp};
use mediaseg_segment::policy::{FixedDurationPolicy, PassThroughPolicy};
use mediaseg_segment::{FixedDurationConfig, SegmentationPolicy, SourcePipeline};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn fixed(duration_us: u64, look_ahead_us: u64) -> Box<dyn SegmentationPolicy> {
    Box::new(FixedDurationPolicy::new(
        FixedDurationConfig::new(
            Duration::from_micros(duration_us),
            Duration::from_micros(look_ahead_us),
        )
        .unwrap(),
    ))
}

fn run(policy: Box<dyn SegmentationPolicy>, stamps: &[i64]) -> (Vec<Arc<Segment>>, usize) {
    let pipeline = SourcePipeline::new(source("prop.mp4"), policy, None);
    let mut segments = Vec::new();
    for (id, ts) in stamps.iter().enumerate() {
        segments.extend(pipeline.push(image_at(id as u64, *ts)));
    }
    segments.extend(pipeline.drain());
    assert!(pipeline.is_drained());
    (segments, pipeline.stats().late)
}

/// Windows never overlap, come in order and contain their frames.
fn check_windows(segments: &[Arc<Segment>]) {
    for pair in segments.windows(2) {
        let (a, b) = (pair[0].window.unwrap(), pair[1].window.unwrap());
        assert!(a.end <= b.start, "{a} overlaps {b}");
    }
    for segment in segments {
        assert!(!segment.frames.is_empty());
        let window = segment.window.unwrap();
        for frame in &segment.frames {
            assert!(window.contains(frame.timestamp.unwrap()));
        }
        assert!(segment
            .frames
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }
}

proptest! {
    #[test]
    fn ordered_frames_are_all_emitted_once(
        mut stamps in prop::collection::vec(0i64..5_000_000, 1..200),
        duration in 1_000u64..2_000_000,
        look_ahead in 0u64..1_000_000,
    ) {
        stamps.sort_unstable();
        let (segments, late) = run(fixed(duration, look_ahead), &stamps);
        check_windows(&segments);
        prop_assert_eq!(late, 0);

        let mut ids: Vec<u64> = segments
            .iter()
            .flat_map(|s| s.frames.iter().map(|f| f.id.0))
            .collect();
        prop_assert_eq!(ids.len(), stamps.len());
        ids.dedup();
        prop_assert_eq!(ids.len(), stamps.len());
    }

    #[test]
    fn jittered_frames_are_emitted_or_counted_late(
        stamps in prop::collection::vec(0i64..5_000_000, 1..200),
        duration in 1_000u64..2_000_000,
        look_ahead in 0u64..1_000_000,
    ) {
        let (segments, late) = run(fixed(duration, look_ahead), &stamps);
        check_windows(&segments);
        let emitted: usize = segments.iter().map(|s| s.frames.len()).sum();
        prop_assert_eq!(emitted + late, stamps.len());
    }

    #[test]
    fn fixed_windows_are_aligned_to_zero(
        mut stamps in prop::collection::vec(0i64..3_000_000, 1..100),
        duration in 1_000u64..1_000_000,
    ) {
        stamps.sort_unstable();
        let (segments, _) = run(fixed(duration, 0), &stamps);
        for segment in &segments {
            let window = segment.window.unwrap();
            prop_assert_eq!(window.start.as_micros() % duration as i64, 0);
            prop_assert_eq!(window.length(), Some(Duration::from_micros(duration)));
        }
    }

    #[test]
    fn pass_through_keeps_strictly_increasing_frames(
        mut stamps in prop::collection::vec(-1_000_000i64..1_000_000, 1..100),
    ) {
        stamps.sort_unstable();
        stamps.dedup();
        let (segments, late) = run(Box::new(PassThroughPolicy), &stamps);
        check_windows(&segments);
        prop_assert_eq!(late, 0);
        prop_assert_eq!(segments.len(), stamps.len());
        prop_assert!(segments
            .iter()
            .all(|s| s.window.unwrap().end > Timestamp::MIN));
    }
}
