//! Command-line wrapper around camstitch-core: argument parsing, logging
//! setup, file discovery, the terminal progress bar and Ctrl-C wiring.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::str::FromStr;
use std::time::Duration;

use ansi_term::{Color, Style};
use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use flexi_logger::writers::LogWriter;
use flexi_logger::{FileSpec, Level, LevelFilter, LogSpecBuilder, Logger};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::OnceCell;
use path_abs::PathAbs;

use camstitch_core::{
  assemble_clips, render, report_records, CancellationToken, ClipError, FilenamePattern,
  PatternSet, ProgressSink, Rational, RenderSettings, SplitAlignment, SplitMode, VideoCodec,
};

const VIDEO_EXTENSIONS: &[&str] = &[
  "mp4", "avi", "mkv", "mov", "flv", "wmv", "ts", "dav", "h264", "264", "mpg", "mpeg",
];

/// Assemble a single chronological video from independently recorded CCTV clips
#[derive(Parser, Debug)]
#[command(name = "camstitch", version)]
pub struct CliOpts {
  /// Directories (scanned recursively) or individual clip files
  #[arg(short, long, required = true, num_args = 1..)]
  pub input: Vec<PathBuf>,

  /// Output video file
  #[arg(short, long)]
  pub output: PathBuf,

  /// Video encoder: hevc_nvenc, h264_nvenc, libx264 or libx265
  #[arg(long, default_value = "libx264")]
  pub codec: String,

  /// Output resolution as WxH
  #[arg(long, default_value = "1920x1080")]
  pub resolution: String,

  /// Output frame rate, N or N/D
  #[arg(long, default_value = "30")]
  pub fps: String,

  /// Overlap layout: side_by_side or stacked
  #[arg(long, default_value = "side_by_side")]
  pub split_mode: String,

  /// top/center/bottom for side_by_side, left/center/right for stacked
  #[arg(long, default_value = "center")]
  pub split_alignment: String,

  /// Visible duration of each gap slate, in seconds
  #[arg(long, default_value_t = 5.0)]
  pub slate_duration: f64,

  /// Slate text template; {start}, {end} and {duration} are substituted
  #[arg(long)]
  pub slate_template: Option<String>,

  /// Project date (YYYY-MM-DD) for filenames that carry only a time of day
  #[arg(long)]
  pub default_date: Option<String>,

  /// Custom filename regex with named groups year/month/day/hour/minute/second
  /// and optionally frame; tried before the built-in patterns
  #[arg(long)]
  pub pattern: Option<String>,

  /// Force batch rendering regardless of command-line length
  #[arg(long)]
  pub batch: bool,

  /// Maximum number of clips per batch
  #[arg(long, default_value_t = 150)]
  pub batch_size: usize,

  /// Write the scanned clip records to this path as JSON
  #[arg(long)]
  pub report: Option<PathBuf>,

  /// Overwrite the output file without asking
  #[arg(short = 'y', long)]
  pub overwrite: bool,

  /// Only print warnings and errors
  #[arg(long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Print debug output
  #[arg(long)]
  pub verbose: bool,

  /// Log file location
  #[arg(long)]
  pub log_file: Option<PathBuf>,
}

fn confirm(prompt: &str) -> io::Result<bool> {
  let mut buf = String::with_capacity(4);
  let mut stdout = io::stdout();
  let stdin = io::stdin();
  loop {
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;
    stdin.read_line(&mut buf)?;

    match buf.as_str() {
      "y\n" | "Y\n" | "y\r\n" | "Y\r\n" => break Ok(true),
      "n\n" | "N\n" | "n\r\n" | "N\r\n" => break Ok(false),
      other => {
        println!(
          "Sorry, response {:?} is not understood.",
          other.trim_end_matches(['\r', '\n'])
        );
        buf.clear();
        continue;
      }
    }
  }
}

/// Collects video files from the input arguments, recursing into directories.
fn collect_files(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
  fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
      let path = entry?.path();
      if path.is_dir() {
        walk(&path, out)?;
      } else if is_video(&path) {
        out.push(path);
      }
    }
    Ok(())
  }

  fn is_video(path: &Path) -> bool {
    path
      .extension()
      .and_then(|e| e.to_str())
      .map_or(false, |e| {
        VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str())
      })
  }

  let mut files = Vec::new();
  for input in inputs {
    if input.is_dir() {
      walk(input, &mut files)
        .with_context(|| format!("Failed to read input directory {:?}", input))?;
    } else if input.is_file() {
      files.push(input.clone());
    } else {
      bail!("input {:?} does not exist", input);
    }
  }
  files.sort();
  Ok(files)
}

fn parse_settings(opts: &CliOpts) -> anyhow::Result<RenderSettings> {
  let codec = VideoCodec::from_str(&opts.codec)
    .map_err(|_| anyhow!("unknown codec {:?} (expected hevc_nvenc, h264_nvenc, libx264 or libx265)", opts.codec))?;

  let (w, h) = opts
    .resolution
    .split_once(['x', 'X'])
    .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)))
    .ok_or_else(|| anyhow!("resolution {:?} is not WxH", opts.resolution))?;

  let fps = Rational::from_str(&opts.fps)
    .map_err(|_| anyhow!("frame rate {:?} is not N or N/D", opts.fps))?;

  let split_mode = SplitMode::from_str(&opts.split_mode)
    .map_err(|_| anyhow!("unknown split mode {:?}", opts.split_mode))?;
  let split_alignment = SplitAlignment::from_str(&opts.split_alignment)
    .map_err(|_| anyhow!("unknown split alignment {:?}", opts.split_alignment))?;

  if !opts.slate_duration.is_finite() || opts.slate_duration <= 0.0 {
    bail!("slate duration must be positive");
  }

  let defaults = RenderSettings::default();
  Ok(RenderSettings {
    output_resolution: (w, h),
    output_fps: fps,
    video_codec: codec,
    slate_duration_us: (opts.slate_duration * 1_000_000.0).round() as i64,
    slate_text_template: opts
      .slate_template
      .clone()
      .unwrap_or(defaults.slate_text_template),
    split_mode,
    split_alignment,
    use_batch_rendering: opts.batch,
    batch_size: opts.batch_size,
    output_path: opts.output.clone(),
    ..defaults
  })
}

fn parse_patterns(opts: &CliOpts) -> anyhow::Result<PatternSet> {
  let default_date = match &opts.default_date {
    Some(text) => Some(
      NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("default date {:?} is not YYYY-MM-DD", text))?,
    ),
    None => None,
  };

  let mut set = PatternSet::with_default_date(default_date);
  if let Some(pattern) = &opts.pattern {
    let re = regex::Regex::new(pattern)
      .with_context(|| format!("invalid filename pattern {:?}", pattern))?;
    set.push_front(FilenamePattern::CustomRegex(re));
  }
  Ok(set)
}

const PROGRESS_TEMPLATE: &str = if cfg!(target_os = "windows") {
  // Do not use a spinner on Windows since the default console cannot display
  // the characters used for the spinner
  "[{elapsed_precise}] [{wide_bar}] {percent:>3}% (eta {eta})"
} else {
  "{spinner} [{elapsed_precise}] [{wide_bar}] {percent:>3}% (eta {eta})"
};

static PROGRESS_BAR: OnceCell<ProgressBar> = OnceCell::new();

fn get_progress_bar() -> Option<&'static ProgressBar> {
  PROGRESS_BAR.get()
}

fn init_progress_bar() -> &'static ProgressBar {
  PROGRESS_BAR.get_or_init(|| {
    let pb = ProgressBar::new(1);
    pb.set_style(
      ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .expect("progress template is valid")
        .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
  })
}

/// Bridges core progress updates onto the terminal bar. Updates arrive in
/// milliseconds of output timeline.
struct BarSink;

impl ProgressSink for BarSink {
  fn on_progress(&self, rendered_us: i64, total_us: i64) {
    if let Some(pb) = get_progress_bar() {
      pb.set_length((total_us / 1000).max(1) as u64);
      pb.set_position((rendered_us / 1000).max(0) as u64);
    }
  }
}

pub struct StderrLogger {
  level: Level,
}

impl LogWriter for StderrLogger {
  fn write(
    &self,
    _now: &mut flexi_logger::DeferredNow,
    record: &flexi_logger::Record,
  ) -> std::io::Result<()> {
    if record.level() > self.level {
      return Ok(());
    }

    let style = match record.level() {
      Level::Error => Style::default().fg(Color::Fixed(196)).bold(),
      Level::Warn => Style::default().fg(Color::Fixed(208)).bold(),
      Level::Info => Style::default().dimmed(),
      _ => Style::default(),
    };

    let msg = style.paint(format!("{}", record.args()));
    let line = format!("{} {}", style.paint(format!("{}", record.level())), msg);

    if let Some(pbar) = get_progress_bar() {
      pbar.println(line);
    } else {
      eprintln!("{}", line);
    }

    Ok(())
  }

  fn flush(&self) -> std::io::Result<()> {
    Ok(())
  }
}

fn skip_summary(skipped: &[camstitch_core::SkippedFile]) -> String {
  let mut pattern = 0usize;
  let mut date = 0usize;
  let mut timecode = 0usize;
  let mut probe = 0usize;
  for skip in skipped {
    match skip.error {
      ClipError::NoPatternMatch => pattern += 1,
      ClipError::MissingDate => date += 1,
      ClipError::BadTimecode { .. } => timecode += 1,
      ClipError::ProbeFailed { .. } => probe += 1,
    }
  }
  format!(
    "{} skipped ({} no pattern match, {} missing date, {} bad timecode, {} probe failures)",
    skipped.len(),
    pattern,
    date,
    timecode,
    probe
  )
}

pub fn run() -> anyhow::Result<()> {
  let opts = CliOpts::parse();

  let stderr_level = if opts.quiet {
    Level::Warn
  } else if opts.verbose {
    Level::Debug
  } else {
    Level::Info
  };

  let log_file = opts
    .log_file
    .clone()
    .unwrap_or_else(|| std::env::temp_dir().join("camstitch.log"));
  let log_spec = LogSpecBuilder::new().default(LevelFilter::Debug).build();
  let _logger = Logger::with(log_spec)
    .log_to_file_and_writer(
      FileSpec::try_from(PathAbs::new(&log_file)?)?,
      Box::new(StderrLogger {
        level: stderr_level,
      }),
    )
    .start()?;

  let settings = parse_settings(&opts)?;
  let patterns = parse_patterns(&opts)?;

  let files = collect_files(&opts.input)?;
  if files.is_empty() {
    bail!("no video files found under {:?}", opts.input);
  }
  log::info!("found {} candidate files", files.len());

  if settings.output_path.exists() && !opts.overwrite {
    if !confirm(&format!(
      "Output file {:?} exists. Do you want to overwrite it? [Y/n]: ",
      settings.output_path
    ))? {
      println!("Not overwriting, aborting.");
      exit(0);
    }
  }

  let scan = assemble_clips(&files, &patterns)?;
  log::info!("{} clips admitted", scan.clips.len());
  if !scan.skipped.is_empty() {
    log::warn!("{}", skip_summary(&scan.skipped));
  }

  if let Some(report_path) = &opts.report {
    let records = report_records(&scan.clips);
    let json = serde_json::to_string_pretty(&records)?;
    fs::write(report_path, json)
      .with_context(|| format!("Failed to write report to {:?}", report_path))?;
    log::info!("report written to {:?}", report_path);
  }

  if scan.clips.is_empty() {
    bail!("none of the scanned files produced a usable clip record");
  }

  let cancel = CancellationToken::new();
  {
    let cancel = cancel.clone();
    ctrlc::set_handler(move || {
      cancel.cancel();
    })?;
  }

  init_progress_bar();
  let result = render(&scan.clips, &settings, &cancel, &BarSink);
  if let Some(pb) = get_progress_bar() {
    pb.finish_and_clear();
  }

  match result {
    Ok(path) => {
      log::info!("wrote {:?}", path);
      Ok(())
    }
    Err(e) if e.is_cancelled() => {
      log::warn!("render cancelled, no output was produced");
      Ok(())
    }
    Err(e) => {
      for line in e.stderr_tail().iter().rev().take(15).rev() {
        log::error!("ffmpeg: {}", line);
      }
      Err(e.into())
    }
  }
}
