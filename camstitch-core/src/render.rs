//! Render orchestration.
//!
//! Owns the render-scoped temp directory, the ffmpeg subprocess and its
//! stderr progress channel. The core is synchronous: long-running work lives
//! in the subprocess and this module blocks reading from it, so callers run
//! renders on a worker thread.

#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::env;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::batch;
use crate::clip::ClipRecord;
use crate::create_dir;
use crate::error::{fs_err, RenderError};
use crate::ffmpeg;
use crate::filtergraph;
use crate::settings::RenderSettings;
use crate::timeline;
use crate::{CancellationToken, ProgressSink};

pub(crate) const STDERR_RING_CAPACITY: usize = 256;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);
const CANCEL_GRACE: Duration = Duration::from_secs(5);

// Concurrent renders are not supported; the public entry point serializes.
static RENDER_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Renders the clip set into a single output file.
///
/// Recoverable per-file problems were already handled during scanning; from
/// here every error is terminal for this render. Cancellation produces
/// `RenderError::Cancelled` and leaves no temp files behind.
pub fn render(
  clips: &[ClipRecord],
  settings: &RenderSettings,
  cancel: &CancellationToken,
  progress: &dyn ProgressSink,
) -> Result<PathBuf, RenderError> {
  let _serialize = RENDER_LOCK.lock();

  settings.validate()?;
  if clips.is_empty() {
    return Err(RenderError::NothingToRender);
  }

  // Resolve the encoder binary up-front so a missing install fails before
  // any filesystem work.
  ffmpeg::ffmpeg_path()?;

  let segments = timeline::build_segments(clips, &settings.slate_text_template)?;
  let temp = RenderTemp::create()?;

  let plan = filtergraph::emit(clips, &segments, settings)?;
  let script_path = temp.dir().join("filter.script");
  let staged = temp
    .dir()
    .join(format!("output.{}", settings.video_codec.output_extension()));
  let args = ffmpeg::compose_render_args(&plan, settings, &script_path, &staged);

  let estimate = ffmpeg::estimate_cmdline_len(&args);
  let use_batch = if settings.use_batch_rendering {
    info!("batch rendering forced by configuration");
    true
  } else if estimate > ffmpeg::cmdline_limit() {
    warn!(
      "estimated command line of {} bytes exceeds the {}-byte limit, falling back to batch mode",
      estimate,
      ffmpeg::cmdline_limit()
    );
    true
  } else {
    false
  };

  if use_batch {
    return batch::render_batched(clips, &segments, settings, &temp, cancel, progress);
  }

  write_filter_script(&script_path, &plan.script)?;
  run_ffmpeg(
    &args,
    cancel,
    Some(&ProgressWindow {
      sink: progress,
      base_us: 0,
      span_us: plan.output_duration_us,
      total_us: plan.output_duration_us,
    }),
  )?;
  finalize_move(&staged, &settings.output_path)?;

  info!("render complete: {:?}", settings.output_path);
  Ok(settings.output_path.clone())
}

/// The render-scoped temp directory. Dropped on every exit path, which
/// removes the directory and everything in it.
pub(crate) struct RenderTemp {
  dir: PathBuf,
}

impl RenderTemp {
  pub fn create() -> Result<RenderTemp, RenderError> {
    let dir = env::temp_dir().join(format!("timeline_{:08x}", rand::random::<u32>()));
    create_dir!(&dir).map_err(|e| fs_err(&dir, e))?;
    debug!("render temp directory: {:?}", dir);
    Ok(RenderTemp { dir })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }
}

impl Drop for RenderTemp {
  fn drop(&mut self) {
    if let Err(e) = fs::remove_dir_all(&self.dir) {
      if e.kind() != std::io::ErrorKind::NotFound {
        warn!("failed to remove temp directory {:?}: {}", self.dir, e);
      }
    }
  }
}

/// Writes the filter script with owner-only permissions on Unix.
pub(crate) fn write_filter_script(path: &Path, script: &str) -> Result<(), RenderError> {
  #[cfg(unix)]
  {
    use std::os::unix::fs::OpenOptionsExt;
    let mut f = fs::OpenOptions::new()
      .write(true)
      .create(true)
      .truncate(true)
      .mode(0o600)
      .open(path)
      .map_err(|e| fs_err(path, e))?;
    f.write_all(script.as_bytes()).map_err(|e| fs_err(path, e))?;
  }
  #[cfg(not(unix))]
  fs::write(path, script).map_err(|e| fs_err(path, e))?;
  Ok(())
}

/// Maps a subprocess's own progress span into the whole render's timeline so
/// batched invocations report one monotonic sequence.
pub(crate) struct ProgressWindow<'a> {
  pub sink: &'a dyn ProgressSink,
  pub base_us: i64,
  pub span_us: i64,
  pub total_us: i64,
}

/// Spawns ffmpeg and drains its stderr until exit.
///
/// The last [`STDERR_RING_CAPACITY`] lines are retained for the error result.
/// The cancellation token is polled between reads; on cancel the subprocess
/// is asked to quit and killed after a grace window.
pub(crate) fn run_ffmpeg(
  args: &[String],
  cancel: &CancellationToken,
  progress: Option<&ProgressWindow<'_>>,
) -> Result<(), RenderError> {
  if cancel.is_cancelled() {
    return Err(RenderError::Cancelled);
  }

  let bin = ffmpeg::ffmpeg_path()?;
  debug!("spawning: {:?} {}", bin, args.join(" "));

  let mut child = Command::new(bin)
    .args(args)
    .stdin(Stdio::piped())
    .stdout(Stdio::null())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|e| fs_err(bin, e))?;

  let stderr = child.stderr.take().expect("stderr was requested piped");
  let mut reader = BufReader::new(stderr);
  let mut ring: VecDeque<String> = VecDeque::with_capacity(STDERR_RING_CAPACITY);
  let mut buf: Vec<u8> = Vec::with_capacity(256);
  let mut reported_us = 0i64;
  let mut last_report: Option<Instant> = None;

  loop {
    if cancel.is_cancelled() {
      return Err(terminate(child));
    }

    buf.clear();
    // ffmpeg terminates progress updates with \r and everything else with \n
    let read = reader
      .read_until(b'\r', &mut buf)
      .map_err(|e| fs_err(bin, e))?;
    if read == 0 {
      break;
    }

    let text = String::from_utf8_lossy(&buf);
    for line in text.split(['\r', '\n']) {
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      push_ring_line(&mut ring, line);

      if let Some(window) = progress {
        if let Some(t) = ffmpeg::parse_progress_us(line) {
          reported_us = reported_us.max(t.min(window.span_us));
          let due = last_report.map_or(true, |at| at.elapsed() >= PROGRESS_INTERVAL);
          if due && window.total_us > 0 {
            last_report = Some(Instant::now());
            window
              .sink
              .on_progress(window.base_us + reported_us, window.total_us);
          }
        }
      }
    }
  }

  let status = child.wait().map_err(|e| fs_err(bin, e))?;

  if cancel.is_cancelled() {
    return Err(RenderError::Cancelled);
  }
  if !status.success() {
    return Err(RenderError::SubprocessFailed {
      exit_code: status.code(),
      last_stderr_lines: ring.into_iter().collect(),
    });
  }

  if let Some(window) = progress {
    if window.total_us > 0 {
      window
        .sink
        .on_progress(window.base_us + window.span_us, window.total_us);
    }
  }
  Ok(())
}

pub(crate) fn push_ring_line(ring: &mut VecDeque<String>, line: &str) {
  if ring.len() == STDERR_RING_CAPACITY {
    ring.pop_front();
  }
  ring.push_back(line.to_string());
}

/// Graceful-then-forced subprocess termination after a cancel.
fn terminate(mut child: Child) -> RenderError {
  info!("cancellation requested, stopping ffmpeg");

  // 'q' on stdin asks ffmpeg to finalize and quit; dropping the handle closes
  // the pipe either way.
  if let Some(mut stdin) = child.stdin.take() {
    let _ = stdin.write_all(b"q");
    let _ = stdin.flush();
  }

  let deadline = Instant::now() + CANCEL_GRACE;
  loop {
    match child.try_wait() {
      Ok(Some(_)) => break,
      Ok(None) if Instant::now() >= deadline => {
        warn!("ffmpeg did not stop within the grace window, killing it");
        let _ = child.kill();
        let _ = child.wait();
        break;
      }
      Ok(None) => std::thread::sleep(Duration::from_millis(100)),
      Err(_) => break,
    }
  }

  RenderError::Cancelled
}

/// Moves the staged result onto the final output path. The output path is not
/// touched before this point; a cross-device rename falls back to copy.
pub(crate) fn finalize_move(staged: &Path, output: &Path) -> Result<(), RenderError> {
  if let Some(parent) = output.parent() {
    if !parent.as_os_str().is_empty() {
      create_dir!(parent).map_err(|e| fs_err(parent, e))?;
    }
  }
  match fs::rename(staged, output) {
    Ok(()) => Ok(()),
    Err(_) => {
      fs::copy(staged, output).map_err(|e| fs_err(output, e))?;
      let _ = fs::remove_file(staged);
      Ok(())
    }
  }
}
