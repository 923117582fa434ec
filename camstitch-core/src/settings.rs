//! Render configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::encoder::VideoCodec;
use crate::error::RenderError;
use crate::timecode::Rational;

/// Default slate template; `{start}`, `{end}` and `{duration}` are substituted
/// per gap.
pub const DEFAULT_SLATE_TEMPLATE: &str = "NO FOOTAGE  {start} - {end}  Δ {duration}";

pub const DEFAULT_SLATE_DURATION_US: i64 = 5_000_000;
pub const DEFAULT_BATCH_SIZE: usize = 150;

/// Split-screen arrangement for two-camera overlap segments.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::IntoStaticStr,
)]
pub enum SplitMode {
  #[strum(serialize = "side_by_side")]
  SideBySide,
  #[strum(serialize = "stacked")]
  Stacked,
}

/// Placement of the letterboxed image inside its pane: vertical for
/// `side_by_side`, horizontal for `stacked`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::IntoStaticStr,
)]
pub enum SplitAlignment {
  #[strum(serialize = "top")]
  Top,
  #[strum(serialize = "left")]
  Left,
  #[strum(serialize = "center")]
  Center,
  #[strum(serialize = "bottom")]
  Bottom,
  #[strum(serialize = "right")]
  Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
  pub output_resolution: (u32, u32),
  pub output_fps: Rational,
  pub video_codec: VideoCodec,
  pub pixel_format: String,
  /// Visible length of every gap card, regardless of the real gap span.
  pub slate_duration_us: i64,
  pub slate_text_template: String,
  pub split_mode: SplitMode,
  pub split_alignment: SplitAlignment,
  /// Force batch mode even when a single pass would fit the command line.
  pub use_batch_rendering: bool,
  pub batch_size: usize,
  pub output_path: PathBuf,
}

impl Default for RenderSettings {
  fn default() -> Self {
    RenderSettings {
      output_resolution: (1920, 1080),
      output_fps: Rational::new(30, 1).expect("30/1 is a valid rational"),
      video_codec: VideoCodec::Libx264,
      pixel_format: "yuv420p".to_string(),
      slate_duration_us: DEFAULT_SLATE_DURATION_US,
      slate_text_template: DEFAULT_SLATE_TEMPLATE.to_string(),
      split_mode: SplitMode::SideBySide,
      split_alignment: SplitAlignment::Center,
      use_batch_rendering: false,
      batch_size: DEFAULT_BATCH_SIZE,
      output_path: PathBuf::new(),
    }
  }
}

impl RenderSettings {
  /// Checks the enumerated constraints before any filesystem or subprocess
  /// work happens.
  pub fn validate(&self) -> Result<(), RenderError> {
    let (w, h) = self.output_resolution;
    if w < 2 || h < 2 {
      return Err(RenderError::FilterEmit {
        reason: format!("output resolution {}x{} is too small", w, h),
      });
    }
    // 4:2:0 output and exact half-panes both need even dimensions.
    if w % 2 != 0 || h % 2 != 0 {
      return Err(RenderError::FilterEmit {
        reason: format!("output resolution {}x{} must be even", w, h),
      });
    }
    if !self.output_fps.is_positive() {
      return Err(RenderError::FilterEmit {
        reason: format!("output fps {} is not positive", self.output_fps),
      });
    }
    if self.slate_duration_us <= 0 {
      return Err(RenderError::FilterEmit {
        reason: "slate duration must be positive".to_string(),
      });
    }
    if self.batch_size == 0 {
      return Err(RenderError::FilterEmit {
        reason: "batch size must be at least 1".to_string(),
      });
    }
    if self.output_path.as_os_str().is_empty() {
      return Err(RenderError::FilterEmit {
        reason: "no output path configured".to_string(),
      });
    }
    if !matches!(
      (self.split_mode, self.split_alignment),
      (
        SplitMode::SideBySide,
        SplitAlignment::Top | SplitAlignment::Center | SplitAlignment::Bottom
      ) | (
        SplitMode::Stacked,
        SplitAlignment::Left | SplitAlignment::Center | SplitAlignment::Right
      )
    ) {
      return Err(RenderError::FilterEmit {
        reason: format!(
          "alignment {:?} does not apply to split mode {:?}",
          self.split_alignment, self.split_mode
        ),
      });
    }
    Ok(())
  }
}
