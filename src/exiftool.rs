//! The ExifTool process boundary.
//!
//! All tag decoding and encoding is delegated to an external `exiftool`
//! executable. Reads are batched into a single `-json` invocation; writes go
//! through a temporary argument file so tag values never touch the command
//! line. The argument file is a scoped resource — it is removed on every exit
//! path, success or failure.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

/// Handle to the external ExifTool executable.
#[derive(Debug, Clone)]
pub struct ExifTool {
    executable: PathBuf,
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ExifTool {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Run one batched read over `paths`, requesting the given `-Tag`
    /// arguments, and return one JSON record per file the tool could process.
    ///
    /// Output records carry grouped tag names (`-G`) and a `SourceFile` entry;
    /// the caller correlates them back to its input paths.
    pub fn read_json(&self, tag_args: &[String], paths: &[PathBuf]) -> Result<Vec<Value>> {
        let mut command = Command::new(&self.executable);
        command.arg("-json").arg("-G").arg("-charset").arg("UTF8");
        for arg in tag_args {
            command.arg(arg);
        }
        for path in paths {
            command.arg(path);
        }

        let output = command
            .output()
            .with_context(|| format!("failed to invoke {}", self.executable.display()))?;

        // ExifTool exits non-zero when any file fails but still emits records
        // for the ones it could read, so only treat empty output as fatal.
        if output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("exiftool read produced no output: {}", stderr.trim());
        }

        let records: Vec<Value> = serde_json::from_slice(&output.stdout)
            .context("failed to parse exiftool JSON output")?;
        Ok(records)
    }

    /// Apply a finished tag-assignment argument list to the target files as a
    /// single in-place invocation.
    ///
    /// Arguments and target paths are written line-by-line into a temporary
    /// argument file passed via `-@`; `-overwrite_original` keeps ExifTool
    /// from leaving `_original` backups behind. On failure the tool's stderr
    /// is surfaced verbatim. No retry.
    pub fn apply(&self, args: &[String], paths: &[PathBuf]) -> Result<()> {
        let mut arg_file =
            tempfile::NamedTempFile::new().context("failed to create exiftool argument file")?;
        for arg in args {
            writeln!(arg_file, "{arg}").context("failed to write exiftool argument file")?;
        }
        for path in paths {
            writeln!(arg_file, "{}", path.display())
                .context("failed to write exiftool argument file")?;
        }
        arg_file
            .flush()
            .context("failed to flush exiftool argument file")?;

        let output = Command::new(&self.executable)
            .arg("-overwrite_original")
            .arg("-charset")
            .arg("UTF8")
            .arg("-@")
            .arg(arg_file.path())
            .output()
            .with_context(|| format!("failed to invoke {}", self.executable.display()))?;

        let result = if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(anyhow::anyhow!("exiftool failed: {}", stderr.trim()))
        };

        // Removal failure must not mask the write's own outcome.
        if let Err(e) = arg_file.close() {
            log::warn!("failed to remove exiftool argument file: {e}");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_path_lookup() {
        let tool = ExifTool::default();
        assert_eq!(tool.executable, PathBuf::from("exiftool"));
    }

    #[test]
    fn apply_surfaces_missing_executable() {
        let tool = ExifTool::new("/nonexistent/exiftool-binary");
        let err = tool
            .apply(&["-XMP-dc:Title=x".to_string()], &[PathBuf::from("a.jpg")])
            .unwrap_err();
        assert!(err.to_string().contains("failed to invoke"));
    }

    #[test]
    fn read_surfaces_missing_executable() {
        let tool = ExifTool::new("/nonexistent/exiftool-binary");
        let err = tool
            .read_json(&["-XMP-dc:Title".to_string()], &[PathBuf::from("a.jpg")])
            .unwrap_err();
        assert!(err.to_string().contains("failed to invoke"));
    }
}
