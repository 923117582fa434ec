//! Filtergraph emission.
//!
//! Turns the ordered segment list into the trimmed input list and the filter
//! script consumed by ffmpeg. The script is always delivered through a file
//! (`-filter_complex_script`) so command-line length is dominated by the input
//! paths, never by filter text.


use std::path::PathBuf;

use itertools::Itertools;

use crate::clip::ClipRecord;
use crate::error::RenderError;
use crate::settings::{RenderSettings, SplitAlignment, SplitMode};
use crate::timecode::format_seconds;
use crate::timeline::{output_duration_us, Segment};

/// One `-ss/-t/-i` triple on the ffmpeg command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
  pub path: PathBuf,
  /// Seek offset from the start of the source file.
  pub seek_us: i64,
  pub length_us: i64,
}

/// The compiled render inputs for one ffmpeg invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
  pub inputs: Vec<InputSpec>,
  /// Filter script text: one chain per line, `;`-separated, labels `[sN]`
  /// per segment and `[vout]` for the final concat output.
  pub script: String,
  /// Duration of the encoded output (gaps compressed to the slate card).
  pub output_duration_us: i64,
}

/// Emits the render plan for a segment run.
///
/// Segment bounds must be contiguous and every referenced clip index must be
/// in range; violations are programmer errors surfaced as `FilterEmit`.
pub fn emit(
  clips: &[ClipRecord],
  segments: &[Segment],
  settings: &RenderSettings,
) -> Result<RenderPlan, RenderError> {
  if segments.is_empty() {
    return Err(RenderError::FilterEmit {
      reason: "empty segment list".to_string(),
    });
  }

  let (out_w, out_h) = settings.output_resolution;
  let fps = settings.output_fps;
  let pix = settings.pixel_format.as_str();

  let mut inputs: Vec<InputSpec> = Vec::new();
  let mut chains: Vec<String> = Vec::new();

  let mut trimmed_input = |clip_idx: usize, t0: i64, t1: i64| -> Result<usize, RenderError> {
    let clip = clips.get(clip_idx).ok_or_else(|| RenderError::FilterEmit {
      reason: format!("segment references clip {} of {}", clip_idx, clips.len()),
    })?;
    let seek_us = t0 - clip.start_instant;
    if seek_us < 0 || t1 > clip.end_instant() {
      return Err(RenderError::FilterEmit {
        reason: format!(
          "segment [{}, {}) lies outside clip {:?}",
          t0, t1, clip.source_path
        ),
      });
    }
    let index = inputs.len();
    inputs.push(InputSpec {
      path: clip.source_path.clone(),
      seek_us,
      length_us: t1 - t0,
    });
    Ok(index)
  };

  for (n, segment) in segments.iter().enumerate() {
    match segment {
      Segment::Gap { slate_text, .. } => {
        chains.push(format!(
          "color=c=black:s={w}x{h}:r={fps}:d={d},\
           drawtext=text='{text}':fontcolor=white:fontsize={size}:\
           x=(w-text_w)/2:y=(h-text_h)/2,format={pix}[s{n}]",
          w = out_w,
          h = out_h,
          fps = fps,
          d = format_seconds(settings.slate_duration_us),
          text = escape_drawtext(slate_text),
          size = slate_font_size(out_h),
          pix = pix,
          n = n,
        ));
      }
      Segment::Single { t0, t1, clip } => {
        let input = trimmed_input(*clip, *t0, *t1)?;
        chains.push(format!(
          "[{input}:v]{chain}[s{n}]",
          input = input,
          chain = normalize_chain(out_w, out_h, fps, pix, "(ow-iw)/2", "(oh-ih)/2"),
          n = n,
        ));
      }
      Segment::Overlap {
        t0,
        t1,
        clip_a,
        clip_b,
      } => {
        let (pane_w, pane_h) = match settings.split_mode {
          SplitMode::SideBySide => (out_w / 2, out_h),
          SplitMode::Stacked => (out_w, out_h / 2),
        };
        let (pad_x, pad_y) = pane_padding(settings.split_mode, settings.split_alignment);
        let stack = match settings.split_mode {
          SplitMode::SideBySide => "hstack",
          SplitMode::Stacked => "vstack",
        };

        let input_a = trimmed_input(*clip_a, *t0, *t1)?;
        let input_b = trimmed_input(*clip_b, *t0, *t1)?;
        let chain = normalize_chain(pane_w, pane_h, fps, pix, pad_x, pad_y);
        chains.push(format!("[{}:v]{}[s{}a]", input_a, chain, n));
        chains.push(format!("[{}:v]{}[s{}b]", input_b, chain, n));
        chains.push(format!("[s{n}a][s{n}b]{stack}=inputs=2[s{n}]", n = n, stack = stack));
      }
    }
  }

  let concat_inputs: String = (0..segments.len()).map(|n| format!("[s{}]", n)).join("");
  chains.push(format!(
    "{}concat=n={}:v=1:a=0[vout]",
    concat_inputs,
    segments.len()
  ));

  Ok(RenderPlan {
    inputs,
    script: chains.join(";\n"),
    output_duration_us: output_duration_us(segments, settings.slate_duration_us),
  })
}

/// The normalization chain applied to every non-slate input, in the exact
/// order that keeps concatenation safe: canonical timebase, zeroed PTS,
/// constant frame rate, aspect-preserving scale, letterbox pad, square SAR,
/// pixel format.
fn normalize_chain(
  w: u32,
  h: u32,
  fps: crate::timecode::Rational,
  pix: &str,
  pad_x: &str,
  pad_y: &str,
) -> String {
  format!(
    "settb=AVTB,setpts=PTS-STARTPTS,fps={fps}:round=near,\
     scale={w}:{h}:force_original_aspect_ratio=decrease,\
     pad={w}:{h}:{px}:{py}:color=black,setsar=1,format={pix}",
    fps = fps,
    w = w,
    h = h,
    px = pad_x,
    py = pad_y,
    pix = pix,
  )
}

/// Pad offsets implementing the split alignment inside a pane.
fn pane_padding(mode: SplitMode, alignment: SplitAlignment) -> (&'static str, &'static str) {
  match mode {
    SplitMode::SideBySide => match alignment {
      SplitAlignment::Top => ("(ow-iw)/2", "0"),
      SplitAlignment::Bottom => ("(ow-iw)/2", "oh-ih"),
      _ => ("(ow-iw)/2", "(oh-ih)/2"),
    },
    SplitMode::Stacked => match alignment {
      SplitAlignment::Left => ("0", "(oh-ih)/2"),
      SplitAlignment::Right => ("ow-iw", "(oh-ih)/2"),
      _ => ("(ow-iw)/2", "(oh-ih)/2"),
    },
  }
}

fn slate_font_size(out_h: u32) -> u32 {
  (out_h / 24).max(12)
}

/// Escapes text for a single-quoted drawtext argument inside a filter script.
/// A quote ends the quoted run, emits an escaped quote, and reopens it.
fn escape_drawtext(text: &str) -> String {
  text.replace('\\', "\\\\").replace('\'', "'\\''")
}
