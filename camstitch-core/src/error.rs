use std::path::PathBuf;

use thiserror::Error;

/// Record-level failures. These never abort a render; the offending file is
/// skipped and the failure is counted in the scan summary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipError {
  #[error("bad timecode: {field} out of range ({value})")]
  BadTimecode { field: &'static str, value: String },

  #[error("filename pattern carries no date and no project default date is set")]
  MissingDate,

  #[error("no filename pattern matched")]
  NoPatternMatch,

  #[error("probe failed for {path:?}: {cause}")]
  ProbeFailed { path: PathBuf, cause: String },
}

/// Terminal failures surfaced to the caller of [`crate::render`].
///
/// `Cancelled` is a terminal state, not a failure: no output was produced, but
/// nothing went wrong either. Callers should not report it as an error.
#[derive(Error, Debug)]
pub enum RenderError {
  #[error("no renderable clips in the timeline")]
  NothingToRender,

  #[error("filtergraph emission failed: {reason}")]
  FilterEmit { reason: String },

  #[error(
    "{tool} was not found; install FFmpeg from https://ffmpeg.org/download.html \
     or place the binaries in a bin/ directory next to this executable"
  )]
  ToolMissing { tool: String },

  #[error("external tool exited with code {exit_code:?}")]
  SubprocessFailed {
    exit_code: Option<i32>,
    last_stderr_lines: Vec<String>,
  },

  #[error("render cancelled")]
  Cancelled,

  #[error("filesystem error at {path:?}: {source}")]
  Filesystem {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl RenderError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, RenderError::Cancelled)
  }

  /// The retained stderr tail of a failed subprocess, if any.
  pub fn stderr_tail(&self) -> &[String] {
    match self {
      RenderError::SubprocessFailed {
        last_stderr_lines, ..
      } => last_stderr_lines,
      _ => &[],
    }
  }
}

pub(crate) fn fs_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
  RenderError::Filesystem {
    path: path.into(),
    source,
  }
}
