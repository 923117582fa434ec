//! Atomic-interval decomposition and segment classification.
//!
//! The clip set is swept into the minimal ordered partition whose boundaries
//! are the union of all clip endpoints; adjacent intervals with the same
//! active set merge into segments tagged Gap / Single / Overlap.

#[cfg(test)]
mod tests;

use crate::clip::ClipRecord;
use crate::error::RenderError;
use crate::timecode::{format_duration_brief, format_wall_clock};

/// A half-open interval `[t0, t1)` on which the active clip set is constant.
/// `active` holds indices into the owning clip slice, ordered by
/// `(camera_id, start_instant, source_path)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicInterval {
  pub t0: i64,
  pub t1: i64,
  pub active: Vec<usize>,
}

/// A maximal run of atomic intervals with an identical active set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// No camera covers this span; rendered as a fixed-duration slate card.
  Gap { t0: i64, t1: i64, slate_text: String },
  /// Exactly one camera.
  Single { t0: i64, t1: i64, clip: usize },
  /// Two or more cameras; the two shown are the lexicographically smallest by
  /// `(camera_id, start_instant, source_path)`.
  Overlap {
    t0: i64,
    t1: i64,
    clip_a: usize,
    clip_b: usize,
  },
}

impl Segment {
  pub fn t0(&self) -> i64 {
    match *self {
      Segment::Gap { t0, .. } | Segment::Single { t0, .. } | Segment::Overlap { t0, .. } => t0,
    }
  }

  pub fn t1(&self) -> i64 {
    match *self {
      Segment::Gap { t1, .. } | Segment::Single { t1, .. } | Segment::Overlap { t1, .. } => t1,
    }
  }

  /// Wall-clock span of the segment on the source timeline. Note that a Gap
  /// renders as a slate of fixed duration, not this span.
  pub fn span_us(&self) -> i64 {
    self.t1() - self.t0()
  }

  /// Clip indices this segment reads from, in pane order.
  pub fn referenced_clips(&self) -> impl Iterator<Item = usize> + '_ {
    let pair = match *self {
      Segment::Gap { .. } => [None, None],
      Segment::Single { clip, .. } => [Some(clip), None],
      Segment::Overlap { clip_a, clip_b, .. } => [Some(clip_a), Some(clip_b)],
    };
    pair.into_iter().flatten()
  }
}

/// Builds the atomic-interval partition of `[min(start), max(end))`.
///
/// Active set rule (half-open semantics): clip `c` is active on `[b0, b1)`
/// iff `c.start ≤ b0` and `c.end ≥ b1`.
pub fn build_atomic_intervals(clips: &[ClipRecord]) -> Vec<AtomicInterval> {
  if clips.is_empty() {
    return Vec::new();
  }

  let mut boundaries: Vec<i64> = clips
    .iter()
    .flat_map(|c| [c.start_instant, c.end_instant()])
    .collect();
  boundaries.sort_unstable();
  boundaries.dedup();

  let mut order: Vec<usize> = (0..clips.len()).collect();
  order.sort_by(|&a, &b| clips[a].ordering_key().cmp(&clips[b].ordering_key()));

  boundaries
    .windows(2)
    .map(|pair| {
      let (t0, t1) = (pair[0], pair[1]);
      let active = order
        .iter()
        .copied()
        .filter(|&i| clips[i].start_instant <= t0 && clips[i].end_instant() >= t1)
        .collect();
      AtomicInterval { t0, t1, active }
    })
    .collect()
}

/// Merges adjacent atomic intervals with identical active sets and classifies
/// the result. Fails with `NothingToRender` when the clip set is empty or
/// spans no time.
pub fn build_segments(
  clips: &[ClipRecord],
  slate_template: &str,
) -> Result<Vec<Segment>, RenderError> {
  let intervals = build_atomic_intervals(clips);
  if intervals.is_empty() {
    return Err(RenderError::NothingToRender);
  }

  let mut segments = Vec::new();
  let mut run_start = intervals[0].t0;
  let mut run_end = intervals[0].t1;
  let mut run_active = intervals[0].active.clone();

  let mut flush = |t0: i64, t1: i64, active: &[usize], segments: &mut Vec<Segment>| {
    segments.push(classify(clips, t0, t1, active, slate_template));
  };

  for interval in &intervals[1..] {
    if interval.active == run_active {
      run_end = interval.t1;
    } else {
      flush(run_start, run_end, &run_active, &mut segments);
      run_start = interval.t0;
      run_end = interval.t1;
      run_active = interval.active.clone();
    }
  }
  flush(run_start, run_end, &run_active, &mut segments);

  Ok(segments)
}

fn classify(
  clips: &[ClipRecord],
  t0: i64,
  t1: i64,
  active: &[usize],
  slate_template: &str,
) -> Segment {
  // `active` is ordered by (camera_id, start_instant, source_path). One
  // representative clip per distinct camera, in that order: overlap means
  // two CAMERAS, not two files of the same camera.
  let mut reps: Vec<usize> = Vec::with_capacity(2);
  for &idx in active {
    if reps
      .last()
      .map_or(true, |&r| clips[r].camera_id != clips[idx].camera_id)
    {
      reps.push(idx);
    }
  }

  match reps.as_slice() {
    [] => Segment::Gap {
      t0,
      t1,
      slate_text: render_slate_text(slate_template, t0, t1),
    },
    [clip] => Segment::Single { t0, t1, clip: *clip },
    [clip_a, clip_b, ..] => {
      if reps.len() > 2 {
        debug!(
          "{} cameras active on [{}, {}); showing {} and {}",
          reps.len(),
          t0,
          t1,
          clips[*clip_a].camera_id,
          clips[*clip_b].camera_id
        );
      }
      Segment::Overlap {
        t0,
        t1,
        clip_a: *clip_a,
        clip_b: *clip_b,
      }
    }
  }
}

/// Renders the slate template, substituting `{start}`, `{end}` and
/// `{duration}` (the true gap span, not the card duration).
pub fn render_slate_text(template: &str, t0: i64, t1: i64) -> String {
  template
    .replace("{start}", &format_wall_clock(t0))
    .replace("{end}", &format_wall_clock(t1))
    .replace("{duration}", &format_duration_brief(t1 - t0))
}

/// Total duration of the encoded output: gaps are compressed to the slate
/// card, covered spans keep their true length.
pub fn output_duration_us(segments: &[Segment], slate_duration_us: i64) -> i64 {
  segments
    .iter()
    .map(|s| match s {
      Segment::Gap { .. } => slate_duration_us,
      other => other.span_us(),
    })
    .sum()
}
