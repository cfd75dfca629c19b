//! Batch timestamp shifting for DateTimeOriginal.
//!
//! Used to repair camera clocks that were off by a fixed amount: preview the
//! shifted timestamps first, then apply them through the regular write path
//! so every backing tag source is updated together.

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::path::PathBuf;

use crate::exiftool::ExifTool;
use crate::metadata;
use crate::rename::EXIF_DATE_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Add,
    Subtract,
}

/// A time shift of whole days/hours/minutes/seconds in one direction.
#[derive(Debug, Clone, Copy)]
pub struct ShiftSpec {
    pub direction: ShiftDirection,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl ShiftSpec {
    /// Parse a CLI shift expression: `[+|-][DD:]HH:MM:SS`.
    ///
    /// A leading `-` subtracts; no sign or `+` adds.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        let (direction, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (ShiftDirection::Subtract, rest),
            None => (ShiftDirection::Add, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let parts: Vec<&str> = rest.split(':').collect();
        let numbers: Vec<i64> = parts
            .iter()
            .map(|p| p.parse::<i64>())
            .collect::<std::result::Result<_, _>>()
            .with_context(|| format!("Invalid shift expression '{spec}'"))?;

        let (days, hours, minutes, seconds) = match numbers.as_slice() {
            [h, m, s] => (0, *h, *m, *s),
            [d, h, m, s] => (*d, *h, *m, *s),
            _ => bail!("Invalid shift expression '{spec}' (expected [DD:]HH:MM:SS)"),
        };

        Ok(Self {
            direction,
            days,
            hours,
            minutes,
            seconds,
        })
    }

    /// The signed duration this spec describes.
    pub fn delta(&self) -> Duration {
        let magnitude = Duration::days(self.days)
            + Duration::hours(self.hours)
            + Duration::minutes(self.minutes)
            + Duration::seconds(self.seconds);
        match self.direction {
            ShiftDirection::Add => magnitude,
            ShiftDirection::Subtract => -magnitude,
        }
    }
}

/// Preview row for one file.
#[derive(Debug, Clone, Serialize)]
pub struct ShiftPreview {
    pub filename: String,
    pub original: String,
    pub new: String,
}

/// Shift one EXIF timestamp string by `delta`. `None` when the input does not
/// parse as an EXIF timestamp.
pub fn shift_timestamp(original: &str, delta: Duration) -> Option<String> {
    let parsed = NaiveDateTime::parse_from_str(original, EXIF_DATE_FORMAT).ok()?;
    Some((parsed + delta).format(EXIF_DATE_FORMAT).to_string())
}

/// Compute the new timestamps for a batch without writing anything.
pub fn preview(tool: &ExifTool, paths: &[PathBuf], spec: ShiftSpec) -> Vec<ShiftPreview> {
    let delta = spec.delta();
    let mut previews = Vec::new();

    for meta in metadata::read_batch(tool, paths) {
        let filename = meta.file_name().to_string();
        let original = match &meta.fields.get("DateTimeOriginal").map(|f| &f.value) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                previews.push(ShiftPreview {
                    filename,
                    original: "Not Found".to_string(),
                    new: "N/A".to_string(),
                });
                continue;
            }
        };

        match shift_timestamp(&original, delta) {
            Some(new) => previews.push(ShiftPreview {
                filename,
                original,
                new,
            }),
            None => previews.push(ShiftPreview {
                filename,
                original,
                new: "Invalid Format".to_string(),
            }),
        }
    }

    previews
}

/// Apply the shift to every file that has a parseable DateTimeOriginal.
/// Returns the number of files written. Files without a usable timestamp are
/// skipped, not failed.
pub fn apply(tool: &ExifTool, paths: &[PathBuf], spec: ShiftSpec) -> Result<usize> {
    let delta = spec.delta();
    let mut written = 0;

    for meta in metadata::read_batch(tool, paths) {
        let original = match meta.fields.get("DateTimeOriginal").map(|f| &f.value) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => continue,
        };
        let Some(new_time) = shift_timestamp(&original, delta) else {
            log::debug!("Skipping {}: unparseable timestamp", meta.source_file);
            continue;
        };

        // Targeted overwrite: an empty original map means every Always source
        // is rewritten and optional sources are left alone.
        let mut new_values = Map::new();
        new_values.insert("DateTimeOriginal".to_string(), json!(new_time));
        let args = metadata::build_args(&Map::new(), &new_values);
        if args.is_empty() {
            continue;
        }

        tool.apply(&args, &[PathBuf::from(&meta.source_file)])
            .with_context(|| format!("Failed to shift {}", meta.source_file))?;
        written += 1;
    }

    Ok(written)
}
