//! Encoder parameter tables.
//!
//! Settings are fixed per codec and tuned for forensic CCTV footage (low
//! light, motion blur); they are deliberately not user-tunable.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::into_vec;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::IntoStaticStr,
)]
pub enum VideoCodec {
  #[strum(serialize = "hevc_nvenc")]
  HevcNvenc,
  #[strum(serialize = "h264_nvenc")]
  H264Nvenc,
  #[strum(serialize = "libx264")]
  Libx264,
  #[strum(serialize = "libx265")]
  Libx265,
}

impl Display for VideoCodec {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(<&'static str>::from(self))
  }
}

impl VideoCodec {
  /// Output container extension implied by the codec.
  pub const fn output_extension(self) -> &'static str {
    "mp4"
  }

  /// Fixed encode arguments appended after the stream mapping.
  pub fn compose_params(self) -> Vec<String> {
    match self {
      Self::HevcNvenc => into_vec![
        "-c:v",
        "hevc_nvenc",
        "-preset",
        "p5",
        "-rc",
        "vbr",
        "-cq",
        "20",
        "-b:v",
        "0",
        "-g",
        "60",
        "-bf",
        "2",
        "-spatial-aq",
        "1",
        "-temporal-aq",
        "1",
      ],
      Self::H264Nvenc => into_vec![
        "-c:v",
        "h264_nvenc",
        "-preset",
        "p5",
        "-rc",
        "vbr",
        "-cq",
        "20",
        "-b:v",
        "0",
        "-g",
        "60",
        "-bf",
        "2",
        "-spatial-aq",
        "1",
        "-temporal-aq",
        "1",
      ],
      Self::Libx264 => into_vec!["-c:v", "libx264", "-crf", "20", "-preset", "medium"],
      Self::Libx265 => into_vec!["-c:v", "libx265", "-crf", "22", "-preset", "medium"],
    }
  }
}
