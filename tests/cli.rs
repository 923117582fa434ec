//! CLI smoke tests: argument surface and basic failure modes. Rendering needs
//! ffmpeg and real footage, which these tests do not assume.

use std::process::Command;

fn camstitch_bin() -> Command {
  Command::new(env!("CARGO_BIN_EXE_camstitch"))
}

#[test]
fn version_prints_the_crate_version() {
  let output = camstitch_bin()
    .arg("--version")
    .output()
    .expect("failed to run camstitch");
  assert!(output.status.success());
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(
    stdout.contains(env!("CARGO_PKG_VERSION")),
    "version output was: {}",
    stdout
  );
}

#[test]
fn help_lists_the_main_options() {
  let output = camstitch_bin()
    .arg("--help")
    .output()
    .expect("failed to run camstitch");
  assert!(output.status.success());
  let stdout = String::from_utf8_lossy(&output.stdout);
  for flag in [
    "--input",
    "--output",
    "--codec",
    "--split-mode",
    "--batch-size",
    "--report",
    "--default-date",
  ] {
    assert!(stdout.contains(flag), "help is missing {}", flag);
  }
}

#[test]
fn missing_input_is_a_usage_error() {
  let output = camstitch_bin()
    .args(["-o", "out.mp4"])
    .output()
    .expect("failed to run camstitch");
  assert!(!output.status.success());
}

#[test]
fn nonexistent_input_fails_cleanly() {
  let dir = std::env::temp_dir().join("camstitch_cli_test_missing");
  let output = camstitch_bin()
    .args(["-i"])
    .arg(&dir)
    .args(["-o", "out.mp4", "-y"])
    .output()
    .expect("failed to run camstitch");
  assert!(!output.status.success());
}
