//! camstitch-core assembles a single chronological video from independently
//! recorded CCTV clips. Each clip's wall-clock start time is parsed from its
//! filename, every file is probed once for metadata, and the clip set is
//! decomposed into segments: single-camera spans, two-camera split-screen
//! overlaps, and gaps covered by slate cards. The segment list compiles into
//! one ffmpeg invocation when the command line fits, with automatic batch
//! fallback and stream-copy concatenation when it does not.
//!
//! The crate is synchronous; long-running work happens in the ffmpeg
//! subprocess and [`render`] blocks on its progress channel, so hosts call it
//! from a worker thread and observe progress through [`ProgressSink`].

#[macro_use]
extern crate log;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod batch;
pub mod clip;
pub mod encoder;
pub mod error;
pub mod ffmpeg;
pub mod filtergraph;
pub mod pattern;
pub mod probe;
pub mod render;
pub mod report;
pub mod settings;
pub mod timecode;
pub mod timeline;
mod util;

pub use clip::{assemble_clips, ClipRecord, ClipScan, SkippedFile};
pub use encoder::VideoCodec;
pub use error::{ClipError, RenderError};
pub use pattern::{FilenamePattern, PatternSet};
pub use render::render;
pub use report::{report_records, ReportRecord};
pub use settings::{RenderSettings, SplitAlignment, SplitMode};
pub use timecode::Rational;
pub use timeline::{AtomicInterval, Segment};

/// Thread-safe cancellation flag observed at the orchestrator's polling
/// points: before each spawn, between stderr reads, and between batches.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> CancellationToken {
    CancellationToken::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// Receives throttled, monotonic progress updates during a render.
pub trait ProgressSink: Sync {
  /// `rendered_us` never decreases and never exceeds `total_us`.
  fn on_progress(&self, rendered_us: i64, total_us: i64);
}

/// Sink for hosts that do not display progress.
pub struct NullProgress;

impl ProgressSink for NullProgress {
  fn on_progress(&self, _rendered_us: i64, _total_us: i64) {}
}
