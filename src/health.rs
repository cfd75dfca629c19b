//! Declarative batch health checks.
//!
//! One batched metadata read feeds three per-file checks: are all fields
//! consolidated, are the required fields filled in, and does the filename
//! match the configured rename pattern. Files the tool could not read get an
//! explicit unreadable report instead of being dropped.

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::Settings;
use crate::exiftool::ExifTool;
use crate::metadata::{self, FileMetadata};
use crate::rename;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Ok,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub filename: String,
    pub consolidation: CheckResult,
    pub required_fields: CheckResult,
    pub filename_check: CheckResult,
}

impl FileReport {
    pub fn is_healthy(&self) -> bool {
        self.consolidation.status == CheckStatus::Ok
            && self.required_fields.status == CheckStatus::Ok
            && self.filename_check.status == CheckStatus::Ok
    }
}

/// Run all checks over a batch of files.
pub fn run_check(tool: &ExifTool, paths: &[PathBuf], settings: &Settings) -> Vec<FileReport> {
    if paths.is_empty() {
        return Vec::new();
    }

    let all_metadata = metadata::read_batch(tool, paths);

    let mut reports = Vec::new();
    for path in paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let Some(meta) = all_metadata.iter().find(|m| m.file_name() == filename) else {
            reports.push(FileReport {
                filename: filename.clone(),
                consolidation: CheckResult::error("Failed to read metadata."),
                required_fields: CheckResult::error("Failed to read metadata."),
                filename_check: CheckResult::error("Failed to read metadata."),
            });
            continue;
        };

        let filename_check = check_filename(tool, path, &filename, &settings.rename.pattern);

        reports.push(FileReport {
            filename,
            consolidation: check_consolidation(meta),
            required_fields: check_required_fields(meta, &settings.health.required_fields),
            filename_check,
        });
    }

    reports
}

/// Flag every field whose tag sources disagree or are incomplete.
pub fn check_consolidation(meta: &FileMetadata) -> CheckResult {
    let unconsolidated: Vec<&str> = meta
        .fields
        .iter()
        .filter(|(_, field)| !field.is_consolidated)
        .map(|(name, _)| name.as_str())
        .collect();

    if unconsolidated.is_empty() {
        CheckResult::ok("All fields are consolidated.")
    } else {
        CheckResult::error(format!(
            "Fields not consolidated: {}",
            unconsolidated.join(", ")
        ))
    }
}

/// An empty string or empty list counts as missing.
pub fn check_required_fields(meta: &FileMetadata, required: &[String]) -> CheckResult {
    let missing: Vec<&str> = required
        .iter()
        .filter(|name| {
            match meta.fields.get(*name).map(|f| &f.value) {
                Some(Value::String(s)) => s.is_empty(),
                Some(Value::Array(items)) => items.is_empty(),
                Some(Value::Null) | None => true,
                Some(_) => false,
            }
        })
        .map(|name| name.as_str())
        .collect();

    if missing.is_empty() {
        CheckResult::ok("All required fields are present.")
    } else {
        CheckResult::error(format!("Missing required fields: {}", missing.join(", ")))
    }
}

fn check_filename(
    tool: &ExifTool,
    path: &std::path::Path,
    filename: &str,
    pattern: &str,
) -> CheckResult {
    if pattern.is_empty() {
        return CheckResult::ok("No rename pattern configured.");
    }

    let current_base = match filename.rsplit_once('.') {
        Some((base, _)) => base,
        None => filename,
    };

    match rename::generate_filename(tool, path, pattern) {
        Ok(expected_base) => {
            if current_base == expected_base {
                CheckResult::ok(format!("Filename '{filename}' conforms to the pattern."))
            } else {
                CheckResult::error(format!(
                    "Filename is '{current_base}', but pattern expects '{expected_base}'."
                ))
            }
        }
        Err(e) => CheckResult::error(format!("{e}")),
    }
}
