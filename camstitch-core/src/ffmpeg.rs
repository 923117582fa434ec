//! External tool plumbing: binary discovery, command composition, argv length
//! estimation and stderr progress parsing.

#[cfg(test)]
mod tests;

use std::env;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use crate::error::RenderError;
use crate::filtergraph::RenderPlan;
use crate::into_vec;
use crate::regex;
use crate::settings::RenderSettings;
use crate::timecode::{format_seconds, parse_clock_time};

/// Command-line ceiling used for the single-pass decision. Both values sit
/// well below the hard OS limits to leave room for the environment block.
pub const CMDLINE_LIMIT_WINDOWS: usize = 29_000;
pub const CMDLINE_LIMIT_UNIX: usize = 120_000;

static FFMPEG_PATH: OnceCell<Option<PathBuf>> = OnceCell::new();
static FFPROBE_PATH: OnceCell<Option<PathBuf>> = OnceCell::new();

/// Resolves the ffmpeg binary once per process.
pub fn ffmpeg_path() -> Result<&'static Path, RenderError> {
  resolve_tool(&FFMPEG_PATH, "ffmpeg")
}

/// Resolves the ffprobe binary once per process.
pub fn ffprobe_path() -> Result<&'static Path, RenderError> {
  resolve_tool(&FFPROBE_PATH, "ffprobe")
}

fn resolve_tool(
  cell: &'static OnceCell<Option<PathBuf>>,
  name: &str,
) -> Result<&'static Path, RenderError> {
  cell
    .get_or_init(|| find_tool(name))
    .as_deref()
    .ok_or_else(|| RenderError::ToolMissing {
      tool: name.to_string(),
    })
}

/// Discovery order: a bundled `bin/` next to the current executable, then the
/// well-known install directories, then `PATH`.
fn find_tool(name: &str) -> Option<PathBuf> {
  let exe_name = if cfg!(windows) {
    format!("{}.exe", name)
  } else {
    name.to_string()
  };

  if let Ok(exe) = env::current_exe() {
    if let Some(dir) = exe.parent() {
      let bundled = dir.join("bin").join(&exe_name);
      if bundled.is_file() {
        debug!("using bundled {} at {:?}", name, bundled);
        return Some(bundled);
      }
    }
  }

  let well_known: &[&str] = if cfg!(windows) {
    &["C:\\Program Files\\ffmpeg\\bin", "C:\\ffmpeg\\bin"]
  } else {
    &["/usr/local/bin", "/usr/bin", "/opt/homebrew/bin"]
  };
  for dir in well_known {
    let candidate = Path::new(dir).join(&exe_name);
    if candidate.is_file() {
      return Some(candidate);
    }
  }

  which::which(name).ok()
}

/// Composes the argument vector for a single-pass (or single-batch) encode.
/// The binary name itself is not included.
pub fn compose_render_args(
  plan: &RenderPlan,
  settings: &RenderSettings,
  script_path: &Path,
  output_path: &Path,
) -> Vec<String> {
  let mut args: Vec<String> = into_vec!["-hide_banner", "-y"];

  for input in &plan.inputs {
    args.push("-ss".to_string());
    args.push(format_seconds(input.seek_us));
    args.push("-t".to_string());
    args.push(format_seconds(input.length_us));
    args.push("-i".to_string());
    args.push(input.path.display().to_string());
  }

  args.push("-filter_complex_script".to_string());
  args.push(script_path.display().to_string());
  args.extend(into_vec!["-map", "[vout]", "-vsync", "0", "-an"]);
  args.extend(settings.video_codec.compose_params());
  args.push(output_path.display().to_string());

  args
}

/// Composes the stream-copy concat invocation joining batch intermediates.
pub fn compose_concat_args(manifest_path: &Path, output_path: &Path) -> Vec<String> {
  into_vec![
    "-hide_banner",
    "-y",
    "-f",
    "concat",
    "-safe",
    "0",
    "-i",
    manifest_path.display().to_string(),
    "-c",
    "copy",
    output_path.display().to_string(),
  ]
}

/// Upper bound on the concrete command-line byte length, inflated by 10 % as
/// a safety margin. Counts the binary name, a separator per argument, and a
/// pair of quotes per argument (the worst case across platforms).
pub fn estimate_cmdline_len(args: &[String]) -> usize {
  let bin = "ffmpeg".len() + 1;
  let total: usize = bin + args.iter().map(|a| a.len() + 3).sum::<usize>();
  total + total / 10
}

/// Platform threshold for the batch-fallback decision.
pub fn cmdline_limit() -> usize {
  if cfg!(windows) {
    CMDLINE_LIMIT_WINDOWS
  } else {
    CMDLINE_LIMIT_UNIX
  }
}

/// Extracts the rendered position from an ffmpeg stderr progress line
/// (`... time=HH:MM:SS.cc ... speed=...x`).
pub fn parse_progress_us(line: &str) -> Option<i64> {
  let caps = regex!(r"time=\s*(-?[0-9]+:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?)").captures(line)?;
  parse_clock_time(caps.get(1)?.as_str())
}

/// One `file '...'` manifest line for the concat demuxer, with single quotes
/// escaped per ffmpeg's quoting rules.
pub fn concat_manifest_line(path: &Path) -> String {
  format!(
    "file '{}'\n",
    path.display().to_string().replace('\'', "'\\''")
  )
}
