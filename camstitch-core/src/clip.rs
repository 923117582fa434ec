//! Clip record assembly.
//!
//! Combines the filename pattern resolver output with the probe output into
//! normalized [`ClipRecord`]s carrying absolute start/end instants and a
//! camera identifier derived from the path.

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ClipError, RenderError};
use crate::pattern::PatternSet;
use crate::probe::{self, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::regex;
use crate::timecode::{compose_instant, Rational};

/// Minimum admitted clip duration. Anything shorter is stretched up to this so
/// downstream interval arithmetic never sees an empty span.
pub const MIN_CLIP_DURATION_US: i64 = 1_000;

/// One source clip placed on the wall-clock timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipRecord {
  pub source_path: PathBuf,
  pub camera_id: String,
  /// Microseconds since the Unix epoch, parsed from the filename.
  pub start_instant: i64,
  pub duration_us: i64,
  pub frame_rate: Rational,
  pub width: u32,
  pub height: u32,
  pub codec_name: String,
  pub pixel_format: String,
  pub probe_ok: bool,
}

impl ClipRecord {
  pub fn end_instant(&self) -> i64 {
    self.start_instant + self.duration_us
  }

  /// Sort key shared by the overlap-selection rule and the stable clip order.
  pub(crate) fn ordering_key(&self) -> (&str, i64, &Path) {
    (&self.camera_id, self.start_instant, &self.source_path)
  }
}

/// A file that did not become a record, with the reason. The scan summary
/// counts these instead of warning per file.
#[derive(Debug, Clone)]
pub struct SkippedFile {
  pub path: PathBuf,
  pub error: ClipError,
}

/// The result of scanning a file list.
#[derive(Debug, Clone, Default)]
pub struct ClipScan {
  pub clips: Vec<ClipRecord>,
  pub skipped: Vec<SkippedFile>,
}

/// Derives the short camera identifier from a clip path.
///
/// First matching rule wins: the immediate parent directory name if it looks
/// like `A02`/`B113`; otherwise a leading filename token of the same shape;
/// otherwise the parent directory name verbatim.
pub fn derive_camera_id(path: &Path) -> String {
  let shape = regex!(r"^[A-Z][0-9]{2,3}$");

  let parent = path
    .parent()
    .and_then(Path::file_name)
    .and_then(|n| n.to_str());
  if let Some(parent) = parent {
    if shape.is_match(parent) {
      return parent.to_string();
    }
  }

  let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
  if let Some(token) = stem.split(['_', '-', ' ']).next() {
    if shape.is_match(token) {
      return token.to_string();
    }
  }

  parent.unwrap_or(stem).to_string()
}

/// Scans a list of files into clip records.
///
/// Pattern and probe failures skip the file; `ToolMissing` aborts the scan.
/// Records with identical `(camera_id, start, end)` are deduplicated keeping
/// the first; the survivors are ordered by start instant.
pub fn assemble_clips(paths: &[PathBuf], patterns: &PatternSet) -> Result<ClipScan, RenderError> {
  let mut scan = ClipScan::default();

  for path in paths {
    match assemble_one(path, patterns)? {
      Ok(clip) => scan.clips.push(clip),
      Err(error) => {
        // probe failures are warn-worthy; the rest only reach the summary
        if matches!(error, ClipError::ProbeFailed { .. }) {
          warn!("skipping {:?}: {}", path, error);
        } else {
          debug!("skipping {:?}: {}", path, error);
        }
        scan.skipped.push(SkippedFile {
          path: path.clone(),
          error,
        });
      }
    }
  }

  scan.clips = dedup_and_sort(scan.clips);
  Ok(scan)
}

/// Drops records with identical `(camera_id, start, end)` (keeping the first
/// in scan order) and orders the survivors by start instant.
pub fn dedup_and_sort(clips: Vec<ClipRecord>) -> Vec<ClipRecord> {
  let mut seen: HashSet<(String, i64, i64)> = HashSet::new();
  let mut kept: Vec<ClipRecord> = Vec::with_capacity(clips.len());

  for clip in clips {
    let key = (clip.camera_id.clone(), clip.start_instant, clip.end_instant());
    if seen.insert(key) {
      kept.push(clip);
    } else {
      debug!("duplicate clip dropped: {:?}", clip.source_path);
    }
  }

  kept.sort_by(|a, b| {
    (a.start_instant, &a.camera_id, &a.source_path)
      .cmp(&(b.start_instant, &b.camera_id, &b.source_path))
  });
  kept
}

fn assemble_one(
  path: &Path,
  patterns: &PatternSet,
) -> Result<Result<ClipRecord, ClipError>, RenderError> {
  let filename = path
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or_default();

  let start = match patterns.resolve(filename) {
    Ok(start) => start,
    Err(e) => return Ok(Err(e)),
  };

  let probed = match probe::probe_file(path)? {
    Ok(probed) => probed,
    Err(e) => return Ok(Err(e)),
  };

  if let Err(e) = start.timecode.validate(probed.frame_rate) {
    return Ok(Err(e));
  }
  let day_offset = start.timecode.day_offset_us(probed.frame_rate);
  let start_instant = match compose_instant(Some(start.date), day_offset) {
    Ok(instant) => instant,
    Err(e) => return Ok(Err(e)),
  };

  Ok(Ok(ClipRecord {
    source_path: path.to_path_buf(),
    camera_id: derive_camera_id(path),
    start_instant,
    duration_us: probed.duration_us.max(MIN_CLIP_DURATION_US),
    frame_rate: probed.frame_rate,
    width: probed.width,
    height: probed.height,
    codec_name: probed.codec_name,
    pixel_format: probed.pixel_format,
    probe_ok: probed.ok,
  }))
}

/// Builds a record directly from already-known metadata; used by hosts that
/// probe through their own pipeline, and heavily by the test suite.
pub fn manual_clip(
  source_path: impl Into<PathBuf>,
  camera_id: impl Into<String>,
  start_instant: i64,
  duration_us: i64,
  frame_rate: Rational,
) -> ClipRecord {
  ClipRecord {
    source_path: source_path.into(),
    camera_id: camera_id.into(),
    start_instant,
    duration_us: duration_us.max(MIN_CLIP_DURATION_US),
    frame_rate,
    width: DEFAULT_WIDTH,
    height: DEFAULT_HEIGHT,
    codec_name: String::new(),
    pixel_format: String::new(),
    probe_ok: true,
  }
}
