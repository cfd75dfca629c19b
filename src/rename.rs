//! Metadata-derived file renaming.
//!
//! Filenames are generated from a pattern of `${Tag}` placeholders, where an
//! optional `${Tag:%fmt}` form runs EXIF-style timestamps through a chrono
//! format string. The expanded name is sanitized for cross-platform use and
//! the extension is re-cased per the configured rules.

use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::config::{Casing, ExtensionRule, RenameSettings};
use crate::exiftool::ExifTool;
use crate::handlers::value_to_string;

/// The timestamp layout ExifTool reports for date tags.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// One `${Tag}` or `${Tag:%fmt}` occurrence in a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub tag: String,
    pub format: Option<String>,
}

/// Outcome of renaming one file.
#[derive(Debug, Clone, Serialize)]
pub struct RenameOutcome {
    pub original: String,
    pub new: Option<String>,
    pub status: String,
}

/// Extract the placeholders of a rename pattern, in order of appearance.
pub fn parse_placeholders(pattern: &str) -> Vec<Placeholder> {
    let mut placeholders = Vec::new();
    let mut rest = pattern;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let inner = &after[..end];
        let (tag, format) = match inner.split_once(':') {
            Some((tag, fmt)) => (tag, Some(fmt.to_string())),
            None => (inner, None),
        };
        if !tag.is_empty() {
            placeholders.push(Placeholder {
                tag: tag.to_string(),
                format,
            });
        }
        rest = &after[end + 1..];
    }

    placeholders
}

/// Expand a rename pattern against a file's raw tag map into a new base name
/// (no extension). Fails when the pattern has no placeholders or a referenced
/// tag is missing from the file.
pub fn expand_pattern(tags: &Map<String, Value>, pattern: &str) -> Result<String> {
    if pattern.is_empty() {
        bail!("No rename pattern configured");
    }

    let placeholders = parse_placeholders(pattern);
    if placeholders.is_empty() {
        bail!("Pattern contains no valid metadata tags");
    }

    for placeholder in &placeholders {
        if !tags.contains_key(&placeholder.tag) {
            bail!("File is missing tag '{}'", placeholder.tag);
        }
    }

    let mut result = pattern.to_string();
    for placeholder in &placeholders {
        let token = match &placeholder.format {
            Some(fmt) => format!("${{{}:{}}}", placeholder.tag, fmt),
            None => format!("${{{}}}", placeholder.tag),
        };
        let raw = tags
            .get(&placeholder.tag)
            .map(value_to_string)
            .unwrap_or_default();

        let replacement = match &placeholder.format {
            // Date formatting applies when the raw value parses as an EXIF
            // timestamp; anything else falls back to the raw text.
            Some(fmt) => match NaiveDateTime::parse_from_str(&raw, EXIF_DATE_FORMAT) {
                Ok(dt) => format_timestamp(&dt, fmt).unwrap_or_else(|| raw.clone()),
                Err(_) => raw.clone(),
            },
            None => raw.clone(),
        };

        result = result.replace(&token, &replacement);
    }

    Ok(sanitize(&result))
}

/// Format a timestamp with a user-supplied strftime pattern. `None` when the
/// pattern itself is invalid — formatting must not panic on bad settings.
fn format_timestamp(dt: &NaiveDateTime, fmt: &str) -> Option<String> {
    use chrono::format::{Item, StrftimeItems};

    let items: Vec<Item> = StrftimeItems::new(fmt).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    Some(dt.format_with_items(items.into_iter()).to_string())
}

/// Strip filesystem-hostile characters and turn spaces into underscores.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Apply the configured casing rule to an extension (with leading dot).
/// Unlisted extensions keep their original casing.
pub fn apply_extension_rule(extension: &str, rules: &[ExtensionRule]) -> String {
    let lowered = extension.to_lowercase();
    match rules.iter().find(|r| r.extension.to_lowercase() == lowered) {
        Some(rule) => match rule.casing {
            Casing::Lowercase => lowered,
            Casing::Uppercase => extension.to_uppercase(),
        },
        None => extension.to_string(),
    }
}

/// Generate the expected base name for one file by reading exactly the tags
/// its pattern references.
pub fn generate_filename(tool: &ExifTool, path: &Path, pattern: &str) -> Result<String> {
    let placeholders = parse_placeholders(pattern);
    if placeholders.is_empty() {
        bail!("Pattern contains no valid metadata tags");
    }

    let mut tag_args: Vec<String> = Vec::new();
    for placeholder in &placeholders {
        let arg = format!("-{}", placeholder.tag);
        if !tag_args.contains(&arg) {
            tag_args.push(arg);
        }
    }
    // Bare (ungrouped) short tag names, matching how patterns reference them.
    tag_args.push("-s".to_string());

    let records = tool.read_json(&tag_args, &[path.to_path_buf()])?;
    let record = records
        .into_iter()
        .find_map(|r| match r {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .ok_or_else(|| anyhow::anyhow!("Failed to read metadata for {}", path.display()))?;

    expand_pattern(&strip_groups(record), pattern)
}

/// Rename a batch of files from their metadata. Per-file failures are
/// reported in the outcome list; the batch never aborts.
pub fn rename_batch(
    tool: &ExifTool,
    paths: &[PathBuf],
    settings: &RenameSettings,
    dry_run: bool,
) -> Vec<RenameOutcome> {
    let mut outcomes = Vec::new();

    for path in paths {
        let original = file_name_of(path);

        if !path.is_file() {
            outcomes.push(RenameOutcome {
                original,
                new: None,
                status: "Error: Not a file".to_string(),
            });
            continue;
        }

        let base = match generate_filename(tool, path, &settings.pattern) {
            Ok(base) => base,
            Err(e) => {
                outcomes.push(RenameOutcome {
                    original,
                    new: None,
                    status: format!("Error: {e}"),
                });
                continue;
            }
        };

        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let extension = apply_extension_rule(&extension, &settings.extension_rules);

        let directory = path.parent().unwrap_or_else(|| Path::new(""));
        let mut new_path = directory.join(format!("{base}{extension}"));

        // Keep counting up until the name is free (or turns out to be ours).
        let mut counter = 1;
        while new_path.exists() && !same_path(&new_path, path) {
            new_path = directory.join(format!("{base}_{counter}{extension}"));
            counter += 1;
        }

        if same_path(&new_path, path) {
            outcomes.push(RenameOutcome {
                original: original.clone(),
                new: Some(original),
                status: "Skipped".to_string(),
            });
            continue;
        }

        if dry_run {
            outcomes.push(RenameOutcome {
                original,
                new: Some(file_name_of(&new_path)),
                status: "Preview".to_string(),
            });
            continue;
        }

        match std::fs::rename(path, &new_path) {
            Ok(()) => outcomes.push(RenameOutcome {
                original,
                new: Some(file_name_of(&new_path)),
                status: "Renamed".to_string(),
            }),
            Err(e) => outcomes.push(RenameOutcome {
                original,
                new: None,
                status: format!("Error: {e}"),
            }),
        }
    }

    outcomes
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn same_path(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// Drop `Group:` prefixes from record keys so bare-tag patterns match.
fn strip_groups(record: Map<String, Value>) -> Map<String, Value> {
    record
        .into_iter()
        .map(|(key, value)| {
            let bare = key.rsplit(':').next().unwrap_or(&key).to_string();
            (bare, value)
        })
        .collect()
}
