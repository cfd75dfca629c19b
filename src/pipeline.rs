use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::exiftool::ExifTool;
use crate::keywords::KeywordStore;
use crate::metadata::{self, FileMetadata};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp",
    // HEIC/HEIF
    "heic", "heif",
    // RAW formats
    "cr3", "cr2", "dng", "nef", "arw", "raf", "orf", "rw2", "pef", "srw",
];

/// Result of reading one requested file, with an explicit error entry when
/// the tool could not process it.
#[derive(Debug, Serialize)]
pub struct ReadResult {
    pub filename: String,
    pub metadata: Option<FileMetadata>,
    pub error: Option<String>,
}

/// Result of saving metadata to one file.
#[derive(Debug, Serialize)]
pub struct SaveResult {
    pub filename: String,
    pub args_applied: usize,
    pub error: Option<String>,
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks); only files with supported image
/// extensions are included.
///
/// # Example
///
/// ```rust,no_run
/// use exif_desk::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("photo.jpg"),       // single file
///     PathBuf::from("./photos/"),        // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read metadata for a batch of files and correlate the results back to the
/// requested paths.
///
/// Output order follows the input paths. Any path the tool dropped from its
/// output gets an explicit error entry instead of disappearing silently.
pub fn read_files(tool: &ExifTool, paths: &[PathBuf]) -> Vec<ReadResult> {
    let mut metadata_list = metadata::read_batch(tool, paths);
    let mut results = Vec::with_capacity(paths.len());

    for path in paths {
        let filename = file_name_of(path);
        match metadata_list
            .iter()
            .position(|m| m.file_name() == filename)
        {
            Some(index) => {
                let meta = metadata_list.swap_remove(index);
                results.push(ReadResult {
                    filename,
                    metadata: Some(meta),
                    error: None,
                });
            }
            None => results.push(ReadResult {
                filename,
                metadata: None,
                error: Some("Failed to read metadata".to_string()),
            }),
        }
    }

    results
}

/// Save a field-update payload to a batch of files.
///
/// Each file is read first so the writer can honor `IfExists` sources against
/// that file's own original metadata, then written in its own ExifTool
/// invocation — one file's failure does not stop the rest. Keywords in the
/// payload feed the usage ranking when a store is supplied.
pub fn save_fields(
    tool: &ExifTool,
    paths: &[PathBuf],
    new_values: &Map<String, Value>,
    keyword_store: Option<&mut KeywordStore>,
) -> Vec<SaveResult> {
    if let Some(store) = keyword_store {
        if let Some(Value::Array(items)) = new_values.get("Keywords") {
            let keywords: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if !keywords.is_empty() {
                store.track_usage(&keywords);
                if let Err(e) = store.save() {
                    log::warn!("Failed to persist keyword usage: {e:#}");
                }
            }
        }
    }

    let originals = read_files(tool, paths);
    let mut results = Vec::with_capacity(paths.len());

    for (path, original) in paths.iter().zip(originals) {
        let filename = original.filename;

        let Some(meta) = original.metadata else {
            results.push(SaveResult {
                filename,
                args_applied: 0,
                error: Some("Failed to read original metadata".to_string()),
            });
            continue;
        };

        let args = metadata::build_args(&meta.raw_tags, new_values);
        if args.is_empty() {
            results.push(SaveResult {
                filename,
                args_applied: 0,
                error: None,
            });
            continue;
        }

        match tool.apply(&args, &[path.clone()]) {
            Ok(()) => results.push(SaveResult {
                filename,
                args_applied: args.len(),
                error: None,
            }),
            Err(e) => results.push(SaveResult {
                filename,
                args_applied: 0,
                error: Some(format!("{e:#}")),
            }),
        }
    }

    results
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // ── is_supported_image ───────────────────────────────────────────

    #[test]
    fn supported_image_extensions() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.heic")));
        assert!(is_supported_image(Path::new("photo.cr2")));
        assert!(is_supported_image(Path::new("photo.dng")));
    }

    #[test]
    fn unsupported_image_extensions() {
        assert!(!is_supported_image(Path::new("doc.pdf")));
        assert!(!is_supported_image(Path::new("video.mp4")));
        assert!(!is_supported_image(Path::new("readme.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let images = collect_images(&[jpg.clone()]);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0], jpg);
    }

    #[test]
    fn collect_images_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("readme.txt");
        fs::write(&txt, b"hello").unwrap();

        let images = collect_images(&[txt]);
        assert!(images.is_empty());
    }

    #[test]
    fn collect_images_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.png"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        let images = collect_images(&[PathBuf::from("/nonexistent/path")]);
        assert!(images.is_empty());
    }

    #[test]
    fn collect_images_mixed_files_and_dirs() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("photo.jpg");
        let sub = dir.path().join("folder");
        fs::create_dir(&sub).unwrap();
        fs::write(&jpg, b"fake").unwrap();
        fs::write(sub.join("deep.heic"), b"fake").unwrap();

        let images = collect_images(&[jpg.clone(), sub]);
        assert_eq!(images.len(), 2);
    }

    // ── read_files ───────────────────────────────────────────────────

    #[test]
    fn read_files_synthesizes_error_entries_when_tool_fails() {
        // A missing executable degrades to an empty batch; every requested
        // path must still come back, flagged unreadable.
        let tool = ExifTool::new("/nonexistent/exiftool-binary");
        let results = read_files(
            &tool,
            &[PathBuf::from("a.jpg"), PathBuf::from("b.jpg")],
        );
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.metadata.is_none()));
        assert!(results.iter().all(|r| r.error.is_some()));
        assert_eq!(results[0].filename, "a.jpg");
        assert_eq!(results[1].filename, "b.jpg");
    }
}
