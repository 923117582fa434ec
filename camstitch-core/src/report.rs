//! Report emitter interface.
//!
//! External CSV/JSON writers consume these rows; the field names are a stable
//! contract.

use std::path::PathBuf;

use serde::Serialize;

use crate::clip::ClipRecord;
use crate::timecode::{format_instant, format_smpte, MICROS_PER_SEC};

#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
  pub filename: String,
  pub source_path: PathBuf,
  pub camera_id: String,
  pub smpte_timecode: String,
  pub start_iso: String,
  pub end_iso: String,
  pub duration_seconds: f64,
  pub frame_rate_num: i64,
  pub frame_rate_den: i64,
  pub width: u32,
  pub height: u32,
  pub codec_name: String,
  pub pixel_format: String,
  pub probe_ok: bool,
}

impl From<&ClipRecord> for ReportRecord {
  fn from(clip: &ClipRecord) -> Self {
    ReportRecord {
      filename: clip
        .source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default(),
      source_path: clip.source_path.clone(),
      camera_id: clip.camera_id.clone(),
      smpte_timecode: format_smpte(clip.start_instant, clip.frame_rate),
      start_iso: format_instant(clip.start_instant),
      end_iso: format_instant(clip.end_instant()),
      duration_seconds: clip.duration_us as f64 / MICROS_PER_SEC as f64,
      frame_rate_num: clip.frame_rate.num(),
      frame_rate_den: clip.frame_rate.den(),
      width: clip.width,
      height: clip.height,
      codec_name: clip.codec_name.clone(),
      pixel_format: clip.pixel_format.clone(),
      probe_ok: clip.probe_ok,
    }
  }
}

/// Builds the full report for a scanned clip list.
pub fn report_records(clips: &[ClipRecord]) -> Vec<ReportRecord> {
  clips.iter().map(ReportRecord::from).collect()
}
