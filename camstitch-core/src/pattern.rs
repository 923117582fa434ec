//! Filename pattern resolution.
//!
//! DVRs encode the recording start time in the clip filename. A [`PatternSet`]
//! holds an ordered list of patterns; the first one that produces every
//! required field wins. Patterns that carry no date (a bare `HHMMSS` token)
//! need a project default date, otherwise resolution fails with `MissingDate`.


use chrono::NaiveDate;
use regex::Regex;

use crate::error::ClipError;
use crate::regex;
use crate::timecode::Timecode;

/// One recognized filename shape.
#[derive(Debug, Clone)]
pub enum FilenamePattern {
  /// Dahua-style 14-digit stamp: `{prefix?}_{YYYY}{MM}{DD}{HH}{MM}{SS}`.
  DahuaStamp,
  /// `YYYY-MM-DDTHH:MM:SS`. `-` and `_` are accepted between time fields
  /// since `:` is not legal in Windows filenames.
  Iso8601,
  /// A bare `HHMMSS` token; the date comes from the project default.
  CompactHhmmss,
  /// User-supplied regex with named groups `year`, `month`, `day`, `hour`,
  /// `minute`, `second` and optionally `frame`.
  CustomRegex(Regex),
}

/// The date and in-day time recovered from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStart {
  pub date: NaiveDate,
  pub timecode: Timecode,
}

#[derive(Debug, Clone)]
pub struct PatternSet {
  patterns: Vec<FilenamePattern>,
  default_date: Option<NaiveDate>,
}

impl Default for PatternSet {
  fn default() -> Self {
    PatternSet {
      patterns: vec![
        FilenamePattern::DahuaStamp,
        FilenamePattern::Iso8601,
        FilenamePattern::CompactHhmmss,
      ],
      default_date: None,
    }
  }
}

impl PatternSet {
  pub fn new(patterns: Vec<FilenamePattern>, default_date: Option<NaiveDate>) -> PatternSet {
    PatternSet {
      patterns,
      default_date,
    }
  }

  /// The built-in pattern order with a project default date.
  pub fn with_default_date(default_date: Option<NaiveDate>) -> PatternSet {
    PatternSet {
      default_date,
      ..PatternSet::default()
    }
  }

  /// Prepends a custom pattern so it takes precedence over the built-ins.
  pub fn push_front(&mut self, pattern: FilenamePattern) {
    self.patterns.insert(0, pattern);
  }

  /// Resolves a filename against the pattern set.
  ///
  /// A pattern whose regex does not match is skipped; a pattern that matches
  /// but produces an out-of-range field fails the whole resolution with
  /// `BadTimecode` so the record is skipped rather than silently matched by a
  /// weaker pattern.
  pub fn resolve(&self, filename: &str) -> Result<ResolvedStart, ClipError> {
    for pattern in &self.patterns {
      if let Some(result) = pattern.try_match(filename, self.default_date) {
        return result;
      }
    }
    Err(ClipError::NoPatternMatch)
  }
}

impl FilenamePattern {
  /// `None` means the pattern did not match; `Some(Err)` means it matched but
  /// the captured fields are invalid or incomplete.
  fn try_match(
    &self,
    filename: &str,
    default_date: Option<NaiveDate>,
  ) -> Option<Result<ResolvedStart, ClipError>> {
    match self {
      FilenamePattern::DahuaStamp => {
        let caps = regex!(r"(?:^|[^0-9])([0-9]{14})(?:[^0-9]|$)").captures(filename)?;
        let stamp = caps.get(1).map(|m| m.as_str())?;
        Some(resolve_fields(
          &stamp[0..4],
          &stamp[4..6],
          &stamp[6..8],
          &stamp[8..10],
          &stamp[10..12],
          &stamp[12..14],
          None,
          default_date,
        ))
      }
      FilenamePattern::Iso8601 => {
        let caps = regex!(r"([0-9]{4})-([0-9]{2})-([0-9]{2})T([0-9]{2})[:\-_]([0-9]{2})[:\-_]([0-9]{2})")
          .captures(filename)?;
        Some(resolve_fields(
          &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], &caps[6], None, default_date,
        ))
      }
      FilenamePattern::CompactHhmmss => {
        let caps = regex!(r"(?:^|[^0-9])([0-9]{6})(?:[^0-9]|$)").captures(filename)?;
        let token = caps.get(1).map(|m| m.as_str())?;
        Some(resolve_fields(
          "", "", "", &token[0..2], &token[2..4], &token[4..6], None, default_date,
        ))
      }
      FilenamePattern::CustomRegex(re) => {
        let caps = re.captures(filename)?;
        let group = |name: &str| caps.name(name).map(|m| m.as_str());
        // Hour/minute/second groups are mandatory for the pattern to count as
        // a match at all.
        let (hour, minute, second) = match (group("hour"), group("minute"), group("second")) {
          (Some(h), Some(m), Some(s)) => (h, m, s),
          _ => return None,
        };
        Some(resolve_fields(
          group("year").unwrap_or(""),
          group("month").unwrap_or(""),
          group("day").unwrap_or(""),
          hour,
          minute,
          second,
          group("frame"),
          default_date,
        ))
      }
    }
  }
}

#[allow(clippy::too_many_arguments)]
fn resolve_fields(
  year: &str,
  month: &str,
  day: &str,
  hour: &str,
  minute: &str,
  second: &str,
  frame: Option<&str>,
  default_date: Option<NaiveDate>,
) -> Result<ResolvedStart, ClipError> {
  let date = if year.is_empty() || month.is_empty() || day.is_empty() {
    default_date.ok_or(ClipError::MissingDate)?
  } else {
    let y: i32 = parse_field(year, "year")?;
    let m: u32 = parse_field(month, "month")?;
    let d: u32 = parse_field(day, "day")?;
    NaiveDate::from_ymd_opt(y, m, d).ok_or(ClipError::BadTimecode {
      field: "date",
      value: format!("{}-{}-{}", year, month, day),
    })?
  };

  let timecode = Timecode::new(
    parse_field(hour, "hours")?,
    parse_field(minute, "minutes")?,
    parse_field(second, "seconds")?,
    match frame {
      Some(f) => parse_field(f, "frames")?,
      None => 0,
    },
  );

  Ok(ResolvedStart { date, timecode })
}

fn parse_field<T: std::str::FromStr>(text: &str, field: &'static str) -> Result<T, ClipError> {
  text.parse().map_err(|_| ClipError::BadTimecode {
    field,
    value: text.to_string(),
  })
}
