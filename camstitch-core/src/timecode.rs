//! Timecode and time model.
//!
//! All timeline arithmetic inside the crate uses signed integer microseconds
//! since the Unix epoch (UTC). Frame rates are exact rationals; floating point
//! appears only at the ffmpeg boundary and in report output.


use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ClipError;

pub const MICROS_PER_SEC: i64 = 1_000_000;
pub const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SEC;

/// An exact frame rate or time base, reduced on construction. `den` is always
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
  num: i64,
  den: i64,
}

impl Rational {
  pub fn new(num: i64, den: i64) -> Option<Rational> {
    if den == 0 {
      return None;
    }
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let g = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i64;
    Some(Rational {
      num: num / g,
      den: den / g,
    })
  }

  pub const fn num(self) -> i64 {
    self.num
  }

  pub const fn den(self) -> i64 {
    self.den
  }

  pub fn is_positive(self) -> bool {
    self.num > 0
  }

  /// Smallest integer not less than the rational. Used for the SMPTE frame
  /// field bound: `FF < ceil(fps)`.
  pub fn ceil(self) -> i64 {
    (self.num + self.den - 1).div_euclid(self.den)
  }

  pub fn as_f64(self) -> f64 {
    self.num as f64 / self.den as f64
  }
}

impl fmt::Display for Rational {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.den == 1 {
      write!(f, "{}", self.num)
    } else {
      write!(f, "{}/{}", self.num, self.den)
    }
  }
}

impl FromStr for Rational {
  type Err = ();

  /// Parses ffprobe-style `"30000/1001"` or plain `"30"`.
  fn from_str(s: &str) -> Result<Self, ()> {
    let s = s.trim();
    let (num, den) = match s.split_once('/') {
      Some((n, d)) => (n.parse().map_err(|_| ())?, d.parse().map_err(|_| ())?),
      None => (s.parse().map_err(|_| ())?, 1),
    };
    Rational::new(num, den).ok_or(())
  }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
  while b != 0 {
    let t = b;
    b = a % b;
    a = t;
  }
  a
}

/// Integer division rounding half to even (banker's rounding). `d` must be
/// positive.
pub(crate) fn div_round_half_even(n: i128, d: i128) -> i64 {
  debug_assert!(d > 0);
  let q = n.div_euclid(d);
  let r = n.rem_euclid(d);
  let q = match (2 * r).cmp(&d) {
    std::cmp::Ordering::Greater => q + 1,
    std::cmp::Ordering::Equal if q % 2 != 0 => q + 1,
    _ => q,
  };
  q as i64
}

/// Microsecond offset of frame `ff` within its second at the given rate.
pub(crate) fn frame_to_us(ff: i64, fps: Rational) -> i64 {
  div_round_half_even(
    ff as i128 * MICROS_PER_SEC as i128 * fps.den as i128,
    fps.num as i128,
  )
}

/// Frame index of a sub-second microsecond offset at the given rate.
pub(crate) fn us_to_frame(us: i64, fps: Rational) -> i64 {
  div_round_half_even(
    us as i128 * fps.num as i128,
    fps.den as i128 * MICROS_PER_SEC as i128,
  )
}

/// An SMPTE `HH:MM:SS:FF` timecode, frame-accurate within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timecode {
  pub hours: u32,
  pub minutes: u32,
  pub seconds: u32,
  pub frames: u32,
}

impl Timecode {
  pub const fn new(hours: u32, minutes: u32, seconds: u32, frames: u32) -> Timecode {
    Timecode {
      hours,
      minutes,
      seconds,
      frames,
    }
  }

  /// Parses `HH:MM:SS:FF`. Field ranges are checked against `validate`
  /// separately because the frame bound depends on the frame rate.
  pub fn parse(text: &str) -> Result<Timecode, ClipError> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 4 {
      return Err(ClipError::BadTimecode {
        field: "timecode",
        value: text.to_string(),
      });
    }
    let field = |idx: usize, name: &'static str| -> Result<u32, ClipError> {
      parts[idx].parse().map_err(|_| ClipError::BadTimecode {
        field: name,
        value: parts[idx].to_string(),
      })
    };
    Ok(Timecode {
      hours: field(0, "hours")?,
      minutes: field(1, "minutes")?,
      seconds: field(2, "seconds")?,
      frames: field(3, "frames")?,
    })
  }

  /// Checks `HH<24, MM<60, SS<60, FF<⌈fps⌉`.
  pub fn validate(&self, fps: Rational) -> Result<(), ClipError> {
    let bad = |field: &'static str, value: u32| ClipError::BadTimecode {
      field,
      value: value.to_string(),
    };
    if self.hours >= 24 {
      return Err(bad("hours", self.hours));
    }
    if self.minutes >= 60 {
      return Err(bad("minutes", self.minutes));
    }
    if self.seconds >= 60 {
      return Err(bad("seconds", self.seconds));
    }
    if !fps.is_positive() || i64::from(self.frames) >= fps.ceil() {
      return Err(bad("frames", self.frames));
    }
    Ok(())
  }

  /// Microsecond offset within a day. Call `validate` first.
  pub fn day_offset_us(&self, fps: Rational) -> i64 {
    let secs =
      i64::from(self.hours) * 3600 + i64::from(self.minutes) * 60 + i64::from(self.seconds);
    secs * MICROS_PER_SEC + frame_to_us(i64::from(self.frames), fps)
  }
}

impl fmt::Display for Timecode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{:02}:{:02}:{:02}:{:02}",
      self.hours, self.minutes, self.seconds, self.frames
    )
  }
}

/// Parses an SMPTE string into a microsecond offset within a day.
pub fn parse_smpte(text: &str, fps: Rational) -> Result<i64, ClipError> {
  let tc = Timecode::parse(text)?;
  tc.validate(fps)?;
  Ok(tc.day_offset_us(fps))
}

/// Combines a calendar date with an offset within that day into an absolute
/// instant (microseconds since the Unix epoch, UTC).
pub fn compose_instant(date: Option<NaiveDate>, day_offset_us: i64) -> Result<i64, ClipError> {
  let date = date.ok_or(ClipError::MissingDate)?;
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or(ClipError::MissingDate)?
    .and_utc()
    .timestamp_micros();
  Ok(midnight + day_offset_us)
}

/// ISO-8601 rendering of an instant, microsecond precision, UTC.
pub fn format_instant(instant_us: i64) -> String {
  match DateTime::from_timestamp_micros(instant_us) {
    Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
    None => format!("{}us", instant_us),
  }
}

/// Wall-clock rendering used on slate cards: `YYYY-MM-DD HH:MM:SS`.
pub fn format_wall_clock(instant_us: i64) -> String {
  match DateTime::from_timestamp_micros(instant_us) {
    Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    None => format!("{}us", instant_us),
  }
}

/// SMPTE rendering of an instant against a frame rate. Sub-second microseconds
/// that round up to a whole second carry into the seconds field.
pub fn format_smpte(instant_us: i64, fps: Rational) -> String {
  let day_us = instant_us.rem_euclid(MICROS_PER_DAY);
  let mut secs = day_us / MICROS_PER_SEC;
  let mut ff = us_to_frame(day_us % MICROS_PER_SEC, fps);
  if ff >= fps.ceil() {
    ff = 0;
    secs = (secs + 1) % 86_400;
  }
  let tc = Timecode::new(
    (secs / 3600) as u32,
    ((secs / 60) % 60) as u32,
    (secs % 60) as u32,
    ff as u32,
  );
  tc.to_string()
}

/// Parses an ffmpeg/ffprobe decimal seconds string (`"123.456789"`) into
/// microseconds without a float round trip.
pub fn parse_seconds(s: &str) -> Option<i64> {
  let s = s.trim();
  let (sign, s) = match s.strip_prefix('-') {
    Some(rest) => (-1i64, rest),
    None => (1i64, s),
  };
  let (whole, frac) = match s.split_once('.') {
    Some((w, f)) => (w, f),
    None => (s, ""),
  };
  let whole: i64 = whole.parse().ok()?;
  let mut micros = 0i64;
  let mut scale = MICROS_PER_SEC / 10;
  for c in frac.chars().take(6) {
    micros += i64::from(c.to_digit(10)?) * scale;
    scale /= 10;
  }
  Some(sign * (whole * MICROS_PER_SEC + micros))
}

/// Renders microseconds as decimal seconds for the ffmpeg command line.
pub fn format_seconds(us: i64) -> String {
  let sign = if us < 0 { "-" } else { "" };
  let us = us.unsigned_abs();
  format!(
    "{}{}.{:06}",
    sign,
    us / MICROS_PER_SEC as u64,
    us % MICROS_PER_SEC as u64
  )
}

/// `Hh Mm Ss` with leading zero units suppressed; seconds always present.
pub fn format_duration_brief(us: i64) -> String {
  let total_secs = (us.max(0) + MICROS_PER_SEC / 2) / MICROS_PER_SEC;
  let h = total_secs / 3600;
  let m = (total_secs / 60) % 60;
  let s = total_secs % 60;
  if h > 0 {
    format!("{}h {}m {}s", h, m, s)
  } else if m > 0 {
    format!("{}m {}s", m, s)
  } else {
    format!("{}s", s)
  }
}

/// Parses ffmpeg progress timestamps (`HH:MM:SS.cc`) into microseconds.
pub fn parse_clock_time(s: &str) -> Option<i64> {
  let mut parts = s.splitn(3, ':');
  let hours: i64 = parts.next()?.trim().parse().ok()?;
  let minutes: i64 = parts.next()?.trim().parse().ok()?;
  let seconds_us = parse_seconds(parts.next()?)?;
  Some((hours * 3600 + minutes * 60) * MICROS_PER_SEC + seconds_us)
}
