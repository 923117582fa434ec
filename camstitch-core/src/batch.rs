//! Batch rendering.
//!
//! When the single-pass command line would be too long (or the caller forces
//! it), the segment list is cut into contiguous runs bounded by the number of
//! distinct clips each run references. Every run renders to an intermediate
//! in the render-scoped temp directory; the intermediates are then joined by
//! the concat demuxer with stream copy, so the join costs no re-encode.


use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::PathBuf;

use crate::clip::ClipRecord;
use crate::error::{fs_err, RenderError};
use crate::ffmpeg;
use crate::filtergraph;
use crate::render::{self, ProgressWindow, RenderTemp};
use crate::settings::RenderSettings;
use crate::timeline::{self, Segment};
use crate::{CancellationToken, ProgressSink};

/// Cuts the segment list into contiguous runs, each referencing at most
/// `batch_size` distinct clips.
///
/// The segment partition itself is computed once by the caller, so batch
/// output is segment-identical to a single pass by construction. A run is
/// never empty; a single segment referencing more clips than `batch_size`
/// (an overlap with `batch_size == 1`) still forms its own run, since a
/// segment cannot be split.
pub fn partition_segments(segments: &[Segment], batch_size: usize) -> Vec<Range<usize>> {
  let mut runs: Vec<Range<usize>> = Vec::new();
  let mut start = 0usize;
  let mut in_run: HashSet<usize> = HashSet::new();

  for (i, segment) in segments.iter().enumerate() {
    let added = segment
      .referenced_clips()
      .filter(|c| !in_run.contains(c))
      .count();
    if i > start && in_run.len() + added > batch_size {
      runs.push(start..i);
      start = i;
      in_run.clear();
    }
    in_run.extend(segment.referenced_clips());
  }
  if start < segments.len() {
    runs.push(start..segments.len());
  }

  runs
}

/// Renders each run to an intermediate, concatenates the intermediates by
/// stream copy, and moves the result onto the output path. Intermediates and
/// the temp directory are removed on success, failure and cancel alike (the
/// temp guard is owned by the caller).
pub(crate) fn render_batched(
  clips: &[ClipRecord],
  segments: &[Segment],
  settings: &RenderSettings,
  temp: &RenderTemp,
  cancel: &CancellationToken,
  progress: &dyn ProgressSink,
) -> Result<PathBuf, RenderError> {
  let runs = partition_segments(segments, settings.batch_size);
  let total_us = timeline::output_duration_us(segments, settings.slate_duration_us);
  let ext = settings.video_codec.output_extension();

  info!(
    "batch mode: {} segments across {} batches (≤{} clips each)",
    segments.len(),
    runs.len(),
    settings.batch_size
  );

  let mut intermediates: Vec<PathBuf> = Vec::with_capacity(runs.len());
  let mut base_us = 0i64;

  for (i, run) in runs.iter().enumerate() {
    if cancel.is_cancelled() {
      return Err(RenderError::Cancelled);
    }

    let run_segments = &segments[run.clone()];
    let plan = filtergraph::emit(clips, run_segments, settings)?;

    let script_path = temp.dir().join(format!("filter_{:03}.script", i + 1));
    render::write_filter_script(&script_path, &plan.script)?;

    let out = temp.dir().join(format!("batch_{:03}.{}", i + 1, ext));
    let args = ffmpeg::compose_render_args(&plan, settings, &script_path, &out);
    debug!(
      "batch {}/{}: {} segments, {} inputs",
      i + 1,
      runs.len(),
      run_segments.len(),
      plan.inputs.len()
    );

    run_ffmpeg_window(&args, cancel, progress, base_us, plan.output_duration_us, total_us)?;
    base_us += plan.output_duration_us;
    intermediates.push(out);
  }

  if cancel.is_cancelled() {
    return Err(RenderError::Cancelled);
  }

  let manifest = temp.dir().join("concat_list.txt");
  let mut text = String::with_capacity(64 * intermediates.len());
  for path in &intermediates {
    text.push_str(&ffmpeg::concat_manifest_line(path));
  }
  fs::write(&manifest, text).map_err(|e| fs_err(&manifest, e))?;

  let staged = temp.dir().join(format!("concat_out.{}", ext));
  render::run_ffmpeg(&ffmpeg::compose_concat_args(&manifest, &staged), cancel, None)?;

  render::finalize_move(&staged, &settings.output_path)?;
  info!("batch render complete: {:?}", settings.output_path);
  Ok(settings.output_path.clone())
}

fn run_ffmpeg_window(
  args: &[String],
  cancel: &CancellationToken,
  sink: &dyn ProgressSink,
  base_us: i64,
  span_us: i64,
  total_us: i64,
) -> Result<(), RenderError> {
  render::run_ffmpeg(
    args,
    cancel,
    Some(&ProgressWindow {
      sink,
      base_us,
      span_us,
      total_us,
    }),
  )
}
