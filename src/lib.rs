//! # exif-desk
//!
//! Local photo metadata backend — schema-mapped EXIF/XMP/IPTC editing, keyword
//! taxonomy, renaming, and batch health checks on top of an external ExifTool
//! process.
//!
//! The heart of the crate is the field schema: every application-level field
//! (Creator, Keywords, DateTimeOriginal, ...) maps onto one or more underlying
//! metadata tags. Reading consolidates the redundant tag sources into a single
//! value plus a consolidation flag; writing fans a new value back out to every
//! source that should carry it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_desk::config::Settings;
//! use exif_desk::exiftool::ExifTool;
//! use exif_desk::pipeline::{collect_images, read_files, save_fields};
//! use serde_json::{Map, json};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load(Some("settings.json".as_ref()))?;
//!     let tool = ExifTool::new(&settings.exiftool_path);
//!
//!     // Collect supported image files from paths (files or directories)
//!     let images = collect_images(&[PathBuf::from("./photos")]);
//!
//!     // One batched read; every field comes back with a consolidation flag
//!     for result in read_files(&tool, &images) {
//!         match result.metadata {
//!             Some(meta) => {
//!                 let creator = &meta.fields["Creator"];
//!                 println!(
//!                     "{}: Creator = {} (consolidated: {})",
//!                     result.filename, creator.value, creator.is_consolidated
//!                 );
//!             }
//!             None => eprintln!("{}: unreadable", result.filename),
//!         }
//!     }
//!
//!     // Update a field across the batch; every backing tag is kept in sync
//!     let mut new_values = Map::new();
//!     new_values.insert("Creator".to_string(), json!("Alice"));
//!     for outcome in save_fields(&tool, &images, &new_values, None) {
//!         if let Some(err) = outcome.error {
//!             eprintln!("{}: {err}", outcome.filename);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The reconciliation engine itself is pure and usable without touching the
//! filesystem:
//!
//! ```rust
//! use exif_desk::metadata::{build_args, consolidate_file};
//! use serde_json::{Map, json};
//!
//! // Read side: first present source wins, disagreement is flagged
//! let mut raw = Map::new();
//! raw.insert("XMP-dc:Creator".to_string(), json!("Alice"));
//! let meta = consolidate_file(raw.clone());
//! assert_eq!(meta.fields["Creator"].value, json!("Alice"));
//! assert!(!meta.fields["Creator"].is_consolidated); // IFD0:Artist missing
//!
//! // Write side: every mandatory tag source receives the new value
//! let mut new_values = Map::new();
//! new_values.insert("Creator".to_string(), json!("Bob"));
//! let args = build_args(&raw, &new_values);
//! assert_eq!(args, vec!["-XMP-dc:Creator=Bob", "-IFD0:Artist=Bob"]);
//! ```
//!
//! ## Modules
//!
//! - [`schema`] — the field → tag-source mapping table
//! - [`handlers`] — bidirectional raw/normalized value converters
//! - [`metadata`] — batched reading with consolidation, write-argument generation
//! - [`exiftool`] — the external ExifTool process boundary
//! - [`pipeline`] — file collection and batch read/save orchestration
//! - [`config`] — settings loading/saving
//! - [`keywords`] — usage-ranked keyword favorites
//! - [`locations`] — reusable GPS location presets
//! - [`rename`] — metadata-derived file renaming
//! - [`health`] — declarative batch health checks
//! - [`timeshift`] — batch timestamp shifting
//! - [`geocode`] — reverse geocoding and GPS-track matching

pub mod config;
pub mod exiftool;
pub mod geocode;
pub mod handlers;
pub mod health;
pub mod keywords;
pub mod locations;
pub mod metadata;
pub mod pipeline;
pub mod rename;
pub mod schema;
pub mod timeshift;
