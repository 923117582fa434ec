use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

use super::*;
use crate::clip::manual_clip;
use crate::settings::DEFAULT_SLATE_TEMPLATE;
use crate::timecode::{Rational, MICROS_PER_SEC};

const SEC: i64 = MICROS_PER_SEC;

fn clip(camera: &str, name: &str, start_s: i64, dur_s: i64) -> ClipRecord {
  manual_clip(
    format!("/cctv/{}/{}", camera, name),
    camera,
    start_s * SEC,
    dur_s * SEC,
    Rational::new(30, 1).unwrap(),
  )
}

fn segments_of(clips: &[ClipRecord]) -> Vec<Segment> {
  build_segments(clips, DEFAULT_SLATE_TEMPLATE).unwrap()
}

#[test]
fn single_camera_sequential_no_gaps() {
  let clips = vec![
    clip("A02", "A02_20250521140000.mp4", 0, 60),
    clip("A02", "A02_20250521140100.mp4", 60, 60),
  ];
  let segments = segments_of(&clips);

  assert_eq!(
    segments,
    vec![
      Segment::Single {
        t0: 0,
        t1: 60 * SEC,
        clip: 0
      },
      Segment::Single {
        t0: 60 * SEC,
        t1: 120 * SEC,
        clip: 1
      },
    ]
  );
}

#[test]
fn single_camera_with_one_gap() {
  let clips = vec![
    clip("A02", "A02_20250521140000.mp4", 0, 60),
    clip("A02", "A02_20250521140200.mp4", 120, 60),
  ];
  let segments = segments_of(&clips);

  assert_eq!(segments.len(), 3);
  assert!(matches!(segments[0], Segment::Single { t0: 0, clip: 0, .. }));
  match &segments[1] {
    Segment::Gap { t0, t1, slate_text } => {
      assert_eq!((*t0, *t1), (60 * SEC, 120 * SEC));
      assert!(
        slate_text.contains("Δ 1m 0s"),
        "slate text was {:?}",
        slate_text
      );
    }
    other => panic!("expected a gap, got {:?}", other),
  }
  assert!(matches!(segments[2], Segment::Single { clip: 1, .. }));
}

#[test]
fn two_cameras_partial_overlap() {
  let clips = vec![
    clip("A02", "A02_20250521140000.mp4", 0, 120),
    clip("A04", "A04_20250521140030.mp4", 30, 120),
  ];
  let segments = segments_of(&clips);

  assert_eq!(
    segments,
    vec![
      Segment::Single {
        t0: 0,
        t1: 30 * SEC,
        clip: 0
      },
      Segment::Overlap {
        t0: 30 * SEC,
        t1: 120 * SEC,
        clip_a: 0,
        clip_b: 1
      },
      Segment::Single {
        t0: 120 * SEC,
        t1: 150 * SEC,
        clip: 1
      },
    ]
  );
}

#[test]
fn three_simultaneous_cameras_show_the_two_smallest() {
  let clips = vec![
    clip("A07", "A07_20250521140000.mp4", 0, 60),
    clip("A02", "A02_20250521140000.mp4", 0, 60),
    clip("A04", "A04_20250521140000.mp4", 0, 60),
  ];
  let segments = segments_of(&clips);

  assert_eq!(segments.len(), 1);
  match &segments[0] {
    Segment::Overlap { t0, t1, clip_a, clip_b } => {
      assert_eq!((*t0, *t1), (0, 60 * SEC));
      assert_eq!(clips[*clip_a].camera_id, "A02");
      assert_eq!(clips[*clip_b].camera_id, "A04");
    }
    other => panic!("expected overlap, got {:?}", other),
  }
}

#[test]
fn contained_clip_produces_single_overlap_single() {
  let clips = vec![
    clip("A02", "outer.mp4", 0, 120),
    clip("A04", "inner.mp4", 30, 30),
  ];
  let segments = segments_of(&clips);

  assert_eq!(segments.len(), 3);
  assert!(matches!(segments[0], Segment::Single { clip: 0, .. }));
  assert!(matches!(
    segments[1],
    Segment::Overlap {
      clip_a: 0,
      clip_b: 1,
      ..
    }
  ));
  assert!(matches!(segments[2], Segment::Single { clip: 0, .. }));
}

#[test]
fn same_camera_overlap_is_not_an_overlap_segment() {
  // two files of one camera overlapping must never produce a split screen
  let clips = vec![clip("A02", "a.mp4", 0, 100), clip("A02", "b.mp4", 50, 100)];
  let segments = segments_of(&clips);

  assert!(segments
    .iter()
    .all(|s| !matches!(s, Segment::Overlap { .. })));
  assert_eq!(segments.first().map(Segment::t0), Some(0));
  assert_eq!(segments.last().map(Segment::t1), Some(150 * SEC));
}

#[test]
fn empty_clip_set_is_nothing_to_render() {
  assert!(matches!(
    build_segments(&[], DEFAULT_SLATE_TEMPLATE),
    Err(crate::error::RenderError::NothingToRender)
  ));
}

#[test]
fn atomic_intervals_cover_the_span_exactly() {
  let clips = vec![
    clip("A02", "a.mp4", 0, 120),
    clip("A04", "b.mp4", 30, 120),
    clip("A07", "c.mp4", 300, 60),
  ];
  let intervals = build_atomic_intervals(&clips);

  assert_eq!(intervals.first().unwrap().t0, 0);
  assert_eq!(intervals.last().unwrap().t1, 360 * SEC);
  for pair in intervals.windows(2) {
    assert_eq!(pair[0].t1, pair[1].t0);
  }
  let sum: i64 = intervals.iter().map(|i| i.t1 - i.t0).sum();
  assert_eq!(sum, 360 * SEC);
}

#[test]
fn every_clip_is_active_across_its_whole_span() {
  let clips = vec![
    clip("A02", "a.mp4", 0, 120),
    clip("A04", "b.mp4", 30, 120),
    clip("A07", "c.mp4", 300, 60),
  ];
  let intervals = build_atomic_intervals(&clips);

  for (idx, clip) in clips.iter().enumerate() {
    let covered: i64 = intervals
      .iter()
      .filter(|i| i.active.contains(&idx))
      .map(|i| i.t1 - i.t0)
      .sum();
    assert_eq!(covered, clip.duration_us, "clip {} coverage", idx);
  }
}

#[test]
fn slate_text_renders_all_tokens() {
  let text = render_slate_text("{start}|{end}|{duration}", 0, 90 * SEC);
  assert_eq!(text, "1970-01-01 00:00:00|1970-01-01 00:01:30|1m 30s");
}

#[test]
fn output_duration_compresses_gaps_to_the_card() {
  let clips = vec![clip("A02", "a.mp4", 0, 60), clip("A02", "b.mp4", 120, 60)];
  let segments = segments_of(&clips);
  // 60 s + 5 s card + 60 s
  assert_eq!(output_duration_us(&segments, 5 * SEC), 125 * SEC);
}

#[quickcheck]
fn segments_partition_the_span(specs: Vec<(u8, u8, u8)>) -> TestResult {
  if specs.is_empty() {
    return TestResult::discard();
  }
  let clips: Vec<ClipRecord> = specs
    .iter()
    .enumerate()
    .map(|(i, &(cam, start, dur))| {
      clip(
        &format!("A{:02}", cam % 4),
        &format!("clip{}.mp4", i),
        i64::from(start),
        i64::from(dur % 120) + 1,
      )
    })
    .collect();

  let min_start = clips.iter().map(|c| c.start_instant).min().unwrap();
  let max_end = clips.iter().map(|c| c.end_instant()).max().unwrap();
  let segments = build_segments(&clips, DEFAULT_SLATE_TEMPLATE).unwrap();

  let contiguous = segments.windows(2).all(|p| p[0].t1() == p[1].t0());
  let covers = segments.first().unwrap().t0() == min_start
    && segments.last().unwrap().t1() == max_end;
  let positive = segments.iter().all(|s| s.span_us() > 0);

  TestResult::from_bool(contiguous && covers && positive)
}

#[quickcheck]
fn disjoint_single_camera_clips_never_overlap(durations: Vec<u8>) -> TestResult {
  if durations.is_empty() {
    return TestResult::discard();
  }
  // sequential clips with a one-second gap between each
  let mut start = 0i64;
  let clips: Vec<ClipRecord> = durations
    .iter()
    .enumerate()
    .map(|(i, &d)| {
      let dur = i64::from(d % 60) + 1;
      let c = clip("A02", &format!("c{}.mp4", i), start, dur);
      start += dur + 1;
      c
    })
    .collect();

  let segments = build_segments(&clips, DEFAULT_SLATE_TEMPLATE).unwrap();
  TestResult::from_bool(
    segments
      .iter()
      .all(|s| !matches!(s, Segment::Overlap { .. })),
  )
}

#[quickcheck]
fn overlap_segments_span_two_distinct_cameras(specs: Vec<(u8, u8, u8)>) -> TestResult {
  if specs.is_empty() {
    return TestResult::discard();
  }
  let clips: Vec<ClipRecord> = specs
    .iter()
    .enumerate()
    .map(|(i, &(cam, start, dur))| {
      clip(
        &format!("A{:02}", cam % 3),
        &format!("clip{}.mp4", i),
        i64::from(start),
        i64::from(dur % 90) + 1,
      )
    })
    .collect();

  let segments = build_segments(&clips, DEFAULT_SLATE_TEMPLATE).unwrap();
  let ok = segments.iter().all(|s| match s {
    Segment::Overlap { clip_a, clip_b, .. } => {
      clips[*clip_a].camera_id != clips[*clip_b].camera_id
    }
    _ => true,
  });
  TestResult::from_bool(ok)
}
