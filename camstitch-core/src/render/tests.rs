use std::collections::VecDeque;
use std::fs;

use super::*;

#[test]
fn temp_guard_removes_the_directory_on_drop() {
  let temp = RenderTemp::create().unwrap();
  let dir = temp.dir().to_path_buf();
  fs::write(dir.join("filter.script"), "x").unwrap();
  fs::write(dir.join("batch_001.mp4"), "x").unwrap();
  assert!(dir.is_dir());

  drop(temp);
  assert!(!dir.exists());
}

#[test]
fn temp_directories_are_render_scoped() {
  let a = RenderTemp::create().unwrap();
  let b = RenderTemp::create().unwrap();
  assert_ne!(a.dir(), b.dir());
  assert!(a
    .dir()
    .file_name()
    .unwrap()
    .to_string_lossy()
    .starts_with("timeline_"));
}

#[test]
fn filter_script_is_written_with_owner_only_permissions() {
  let temp = RenderTemp::create().unwrap();
  let path = temp.dir().join("filter.script");
  write_filter_script(&path, "[0:v]null[vout]").unwrap();

  assert_eq!(fs::read_to_string(&path).unwrap(), "[0:v]null[vout]");

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
  }
}

#[test]
fn filter_script_overwrite_truncates() {
  let temp = RenderTemp::create().unwrap();
  let path = temp.dir().join("filter.script");
  write_filter_script(&path, "a long first version").unwrap();
  write_filter_script(&path, "short").unwrap();
  assert_eq!(fs::read_to_string(&path).unwrap(), "short");
}

#[test]
fn stderr_ring_is_bounded() {
  let mut ring: VecDeque<String> = VecDeque::new();
  for i in 0..(STDERR_RING_CAPACITY + 100) {
    push_ring_line(&mut ring, &format!("line {}", i));
  }
  assert_eq!(ring.len(), STDERR_RING_CAPACITY);
  assert_eq!(ring.front().unwrap(), "line 100");
  assert_eq!(
    ring.back().unwrap(),
    &format!("line {}", STDERR_RING_CAPACITY + 99)
  );
}

#[test]
fn cancelled_token_short_circuits_before_spawning() {
  let cancel = CancellationToken::new();
  cancel.cancel();
  // no args and no tool resolution happen when already cancelled
  let result = run_ffmpeg(&[], &cancel, None);
  assert!(matches!(result, Err(RenderError::Cancelled)));
}

#[test]
fn finalize_move_renames_into_place() {
  let temp = RenderTemp::create().unwrap();
  let staged = temp.dir().join("output.mp4");
  fs::write(&staged, b"encoded").unwrap();

  let out_dir = tempfile::tempdir().unwrap();
  let output = out_dir.path().join("nested").join("final.mp4");
  finalize_move(&staged, &output).unwrap();

  assert!(!staged.exists());
  assert_eq!(fs::read(&output).unwrap(), b"encoded");
}

#[test]
fn render_rejects_an_empty_clip_list() {
  let settings = crate::settings::RenderSettings {
    output_path: std::env::temp_dir().join("camstitch_never_written.mp4"),
    ..Default::default()
  };
  let result = render(&[], &settings, &CancellationToken::new(), &crate::NullProgress);
  assert!(matches!(result, Err(RenderError::NothingToRender)));
  assert!(!settings.output_path.exists());
}

#[test]
fn render_validates_settings_first() {
  let settings = crate::settings::RenderSettings {
    output_resolution: (0, 0),
    output_path: "/tmp/x.mp4".into(),
    ..Default::default()
  };
  let result = render(&[], &settings, &CancellationToken::new(), &crate::NullProgress);
  assert!(matches!(result, Err(RenderError::FilterEmit { .. })));
}
