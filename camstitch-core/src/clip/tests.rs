use std::path::Path;

use super::*;
use crate::timecode::Rational;

fn r30() -> Rational {
  Rational::new(30, 1).unwrap()
}

#[test]
fn camera_id_prefers_matching_parent_directory() {
  assert_eq!(derive_camera_id(Path::new("/footage/A02/clip.mp4")), "A02");
  assert_eq!(derive_camera_id(Path::new("/dvr/B113/x.avi")), "B113");
}

#[test]
fn camera_id_falls_back_to_filename_token() {
  assert_eq!(
    derive_camera_id(Path::new("/footage/day1/A02_20250521140000.mp4")),
    "A02"
  );
  assert_eq!(
    derive_camera_id(Path::new("/footage/day1/C07-evening.mp4")),
    "C07"
  );
}

#[test]
fn camera_id_falls_back_to_parent_verbatim() {
  assert_eq!(
    derive_camera_id(Path::new("/footage/lobby/20250521140000.mp4")),
    "lobby"
  );
}

#[test]
fn camera_id_shape_is_letter_plus_two_or_three_digits() {
  // four digits or a lowercase letter do not match the short shape
  assert_eq!(derive_camera_id(Path::new("/f/A0234/clip.mp4")), "A0234");
  assert_eq!(derive_camera_id(Path::new("/f/a02/clip.mp4")), "a02");
  assert_eq!(derive_camera_id(Path::new("/f/A1/clip.mp4")), "A1");
}

#[test]
fn minimum_duration_is_enforced() {
  let clip = manual_clip("/f/A02/c.mp4", "A02", 0, 10, r30());
  assert_eq!(clip.duration_us, MIN_CLIP_DURATION_US);
}

#[test]
fn end_instant_is_start_plus_duration() {
  let clip = manual_clip("/f/A02/c.mp4", "A02", 5_000_000, 60_000_000, r30());
  assert_eq!(clip.end_instant(), 65_000_000);
}

#[test]
fn dedup_keeps_the_first_of_identical_spans() {
  let clips = vec![
    manual_clip("/f/A02/a.mp4", "A02", 0, 60_000_000, r30()),
    manual_clip("/f/A02/b.mp4", "A02", 0, 60_000_000, r30()),
    manual_clip("/f/A02/c.mp4", "A02", 60_000_000, 60_000_000, r30()),
  ];
  let kept = dedup_and_sort(clips);
  assert_eq!(kept.len(), 2);
  assert_eq!(kept[0].source_path, Path::new("/f/A02/a.mp4"));
  assert_eq!(kept[1].source_path, Path::new("/f/A02/c.mp4"));
}

#[test]
fn different_cameras_with_identical_spans_are_kept() {
  let clips = vec![
    manual_clip("/f/A02/a.mp4", "A02", 0, 60_000_000, r30()),
    manual_clip("/f/A04/a.mp4", "A04", 0, 60_000_000, r30()),
  ];
  assert_eq!(dedup_and_sort(clips).len(), 2);
}

#[test]
fn survivors_are_ordered_by_start_instant() {
  let clips = vec![
    manual_clip("/f/A04/late.mp4", "A04", 120_000_000, 60_000_000, r30()),
    manual_clip("/f/A02/early.mp4", "A02", 0, 60_000_000, r30()),
    manual_clip("/f/A03/mid.mp4", "A03", 60_000_000, 60_000_000, r30()),
  ];
  let kept = dedup_and_sort(clips);
  let starts: Vec<i64> = kept.iter().map(|c| c.start_instant).collect();
  assert_eq!(starts, vec![0, 60_000_000, 120_000_000]);
}
