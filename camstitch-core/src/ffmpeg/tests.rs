use std::path::{Path, PathBuf};

use super::*;
use crate::filtergraph::{InputSpec, RenderPlan};
use crate::settings::RenderSettings;

fn plan_with_inputs(count: usize, path_len: usize) -> RenderPlan {
  let stem = "x".repeat(path_len.saturating_sub(12));
  RenderPlan {
    inputs: (0..count)
      .map(|i| InputSpec {
        path: PathBuf::from(format!("/cctv/{}/{:04}.mp4", stem, i)),
        seek_us: 0,
        length_us: 60_000_000,
      })
      .collect(),
    script: String::new(),
    output_duration_us: 60_000_000 * count as i64,
  }
}

fn args_for(plan: &RenderPlan) -> Vec<String> {
  compose_render_args(
    plan,
    &RenderSettings::default(),
    Path::new("/tmp/timeline_0/filter.script"),
    Path::new("/tmp/timeline_0/output.mp4"),
  )
}

#[test]
fn render_args_shape() {
  let plan = plan_with_inputs(2, 20);
  let args = args_for(&plan);

  assert_eq!(args[0], "-hide_banner");
  assert_eq!(args[1], "-y");
  // -ss and -t precede each -i
  let first_input = args.iter().position(|a| a == "-i").unwrap();
  assert_eq!(args[first_input - 4], "-ss");
  assert_eq!(args[first_input - 2], "-t");
  assert_eq!(args.iter().filter(|a| *a == "-i").count(), 2);

  assert!(args.contains(&"-filter_complex_script".to_string()));
  assert!(args.contains(&"-map".to_string()));
  assert!(args.contains(&"[vout]".to_string()));
  assert!(args.contains(&"-vsync".to_string()));
  assert!(args.contains(&"-an".to_string()));
  assert!(args.contains(&"libx264".to_string()));
  assert_eq!(args.last().unwrap(), "/tmp/timeline_0/output.mp4");
}

#[test]
fn trim_values_are_decimal_seconds() {
  let plan = RenderPlan {
    inputs: vec![InputSpec {
      path: PathBuf::from("/cctv/A02/a.mp4"),
      seek_us: 30_000_000,
      length_us: 90_500_000,
    }],
    script: String::new(),
    output_duration_us: 90_500_000,
  };
  let args = args_for(&plan);
  let ss = args.iter().position(|a| a == "-ss").unwrap();
  assert_eq!(args[ss + 1], "30.000000");
  let t = args.iter().position(|a| a == "-t").unwrap();
  assert_eq!(args[t + 1], "90.500000");
}

#[test]
fn concat_args_shape() {
  let args = compose_concat_args(
    Path::new("/tmp/timeline_0/concat_list.txt"),
    Path::new("/tmp/timeline_0/concat_out.mp4"),
  );
  assert_eq!(
    args,
    vec![
      "-hide_banner",
      "-y",
      "-f",
      "concat",
      "-safe",
      "0",
      "-i",
      "/tmp/timeline_0/concat_list.txt",
      "-c",
      "copy",
      "/tmp/timeline_0/concat_out.mp4",
    ]
  );
}

#[test]
fn estimate_grows_with_every_added_clip() {
  let mut last = 0usize;
  for count in [1usize, 2, 10, 50, 100] {
    let estimate = estimate_cmdline_len(&args_for(&plan_with_inputs(count, 40)));
    assert!(estimate > last, "estimate did not grow at {} clips", count);
    last = estimate;
  }
}

#[test]
fn long_paths_push_the_estimate_over_the_windows_limit() {
  // 300 clips with >200-character paths cannot fit a single pass on Windows
  let estimate = estimate_cmdline_len(&args_for(&plan_with_inputs(300, 210)));
  assert!(estimate > CMDLINE_LIMIT_WINDOWS);
}

#[test]
fn short_runs_stay_under_the_limit() {
  let estimate = estimate_cmdline_len(&args_for(&plan_with_inputs(2, 30)));
  assert!(estimate < CMDLINE_LIMIT_WINDOWS);
}

#[test]
fn cmdline_limit_matches_the_platform() {
  if cfg!(windows) {
    assert_eq!(cmdline_limit(), CMDLINE_LIMIT_WINDOWS);
  } else {
    assert_eq!(cmdline_limit(), CMDLINE_LIMIT_UNIX);
  }
}

#[test]
fn progress_line_parsing() {
  let line =
    "frame=  150 fps= 30 q=28.0 size=    1024kB time=00:00:05.00 bitrate= 200.0kbits/s speed=1.50x";
  assert_eq!(parse_progress_us(line), Some(5_000_000));

  assert_eq!(
    parse_progress_us("frame= 90 time=01:02:03.50 speed=1x"),
    Some(3_723_500_000)
  );
  assert_eq!(parse_progress_us("Input #0, mov,mp4,m4a..."), None);
  assert_eq!(parse_progress_us("size= 12kB time=N/A bitrate=N/A"), None);
  assert_eq!(parse_progress_us(""), None);
}

#[test]
fn manifest_lines_escape_single_quotes() {
  assert_eq!(
    concat_manifest_line(Path::new("/tmp/batch_001.mp4")),
    "file '/tmp/batch_001.mp4'\n"
  );
  assert_eq!(
    concat_manifest_line(Path::new("/tmp/it's here/batch_001.mp4")),
    "file '/tmp/it'\\''s here/batch_001.mp4'\n"
  );
}
