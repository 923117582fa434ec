//! Metadata extraction via ffprobe.
//!
//! One probe invocation per file, JSON output, no frame decoding. Duration is
//! recovered through a documented fallback chain; a file whose duration cannot
//! be recovered at all is skipped, which is non-fatal for the batch.


use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::{ClipError, RenderError};
use crate::ffmpeg;
use crate::timecode::{div_round_half_even, parse_seconds, Rational, MICROS_PER_SEC};

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Normalized probe result for one file.
#[derive(Debug, Clone)]
pub struct ProbeData {
  pub duration_us: i64,
  pub frame_rate: Rational,
  pub width: u32,
  pub height: u32,
  pub codec_name: String,
  pub pixel_format: String,
  /// False when the video stream was missing or the resolution had to be
  /// defaulted. Such records are still admitted as long as a duration was
  /// recovered.
  pub ok: bool,
}

/// Probes a single file. `ToolMissing` aborts the whole scan; every other
/// failure is a per-file `ClipError`.
pub fn probe_file(path: &Path) -> Result<Result<ProbeData, ClipError>, RenderError> {
  let ffprobe = ffmpeg::ffprobe_path()?;

  let output = Command::new(ffprobe)
    .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
    .arg(path)
    .output();

  let output = match output {
    Ok(output) => output,
    Err(e) => {
      return Ok(Err(ClipError::ProbeFailed {
        path: path.to_path_buf(),
        cause: e.to_string(),
      }))
    }
  };

  if !output.status.success() {
    return Ok(Err(ClipError::ProbeFailed {
      path: path.to_path_buf(),
      cause: format!(
        "ffprobe exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
      ),
    }));
  }

  Ok(parse_probe_output(path, &output.stdout))
}

/// Parses raw ffprobe JSON into a [`ProbeData`]. Split from the subprocess
/// invocation so the fallback chain is testable against fixture documents.
pub fn parse_probe_output(path: &Path, json: &[u8]) -> Result<ProbeData, ClipError> {
  let doc: FfprobeDocument =
    serde_json::from_slice(json).map_err(|e| ClipError::ProbeFailed {
      path: path.to_path_buf(),
      cause: format!("unparseable ffprobe output: {}", e),
    })?;

  let video = doc
    .streams
    .as_deref()
    .unwrap_or_default()
    .iter()
    .find(|s| s.codec_type.as_deref() == Some("video"));

  let frame_rate = video.map_or_else(default_frame_rate, |s| recover_frame_rate(path, s));

  let duration_us = recover_duration(doc.format.as_ref(), video, frame_rate);
  let duration_us = match duration_us {
    Some(us) if us > 0 => us,
    _ => {
      return Err(ClipError::ProbeFailed {
        path: path.to_path_buf(),
        cause: "no recoverable duration".to_string(),
      })
    }
  };

  let mut ok = true;
  let (width, height) = match video.and_then(|s| s.width.zip(s.height)) {
    Some((w, h)) if w > 0 && h > 0 => (w, h),
    _ => {
      ok = false;
      (DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
  };
  if video.is_none() {
    ok = false;
  }

  Ok(ProbeData {
    duration_us,
    frame_rate,
    width,
    height,
    codec_name: video
      .and_then(|s| s.codec_name.clone())
      .unwrap_or_default(),
    pixel_format: video.and_then(|s| s.pix_fmt.clone()).unwrap_or_default(),
    ok,
  })
}

/// Duration recovery order: container duration, stream duration,
/// `duration_ts × time_base`, `nb_frames ÷ fps`.
fn recover_duration(
  format: Option<&FfprobeFormat>,
  video: Option<&FfprobeStream>,
  frame_rate: Rational,
) -> Option<i64> {
  if let Some(us) = format
    .and_then(|f| f.duration.as_deref())
    .and_then(parse_seconds)
  {
    return Some(us);
  }

  let video = video?;

  if let Some(us) = video.duration.as_deref().and_then(parse_seconds) {
    return Some(us);
  }

  if let (Some(ts), Some(tb)) = (
    video.duration_ts,
    video
      .time_base
      .as_deref()
      .and_then(|s| s.parse::<Rational>().ok()),
  ) {
    if tb.is_positive() && ts > 0 {
      return Some(div_round_half_even(
        ts as i128 * tb.num() as i128 * MICROS_PER_SEC as i128,
        tb.den() as i128,
      ));
    }
  }

  if let Some(frames) = video.nb_frames.as_deref().and_then(|s| s.parse::<i64>().ok()) {
    if frames > 0 && frame_rate.is_positive() {
      return Some(div_round_half_even(
        frames as i128 * MICROS_PER_SEC as i128 * frame_rate.den() as i128,
        frame_rate.num() as i128,
      ));
    }
  }

  None
}

fn recover_frame_rate(path: &Path, stream: &FfprobeStream) -> Rational {
  let parsed = |field: &Option<String>| {
    field
      .as_deref()
      .and_then(|s| s.parse::<Rational>().ok())
      .filter(|r| r.is_positive())
  };

  if let Some(r) = parsed(&stream.r_frame_rate) {
    return r;
  }
  if let Some(r) = parsed(&stream.avg_frame_rate) {
    return r;
  }
  warn!(
    "no usable frame rate for {:?}, assuming 30/1 (r_frame_rate={:?}, avg_frame_rate={:?})",
    path, stream.r_frame_rate, stream.avg_frame_rate
  );
  default_frame_rate()
}

fn default_frame_rate() -> Rational {
  Rational::new(30, 1).expect("30/1 is a valid rational")
}

#[derive(Debug, Deserialize)]
struct FfprobeDocument {
  format: Option<FfprobeFormat>,
  streams: Option<Vec<FfprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
  duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
  codec_type: Option<String>,
  codec_name: Option<String>,
  width: Option<u32>,
  height: Option<u32>,
  r_frame_rate: Option<String>,
  avg_frame_rate: Option<String>,
  pix_fmt: Option<String>,
  duration: Option<String>,
  duration_ts: Option<i64>,
  time_base: Option<String>,
  nb_frames: Option<String>,
}
