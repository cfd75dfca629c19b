//! Metadata reading and writing against the field schema.
//!
//! This module provides the two halves of the reconciliation engine:
//!
//! - [`read_batch`] — batched read through ExifTool, per-field value
//!   consolidation across redundant tag sources
//! - [`build_args`] — pure translation of a requested field update into the
//!   ExifTool tag-assignment arguments that keep every source in sync

mod reader;
mod writer;

pub use reader::{FileMetadata, FieldReadResult, consolidate_file, read_batch, SOURCE_FILE_KEY};
pub use writer::build_args;
