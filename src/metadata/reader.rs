use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::exiftool::ExifTool;
use crate::handlers::{ValueHandler, value_to_string};
use crate::schema::{FieldDef, FieldKind, WriteMode, schema};

/// Key ExifTool uses for the per-record source file identifier.
pub const SOURCE_FILE_KEY: &str = "SourceFile";

/// One application field as read from a file.
#[derive(Debug, Clone, Serialize)]
pub struct FieldReadResult {
    /// Consolidated value: a string, an ordered list of strings for list
    /// fields (empty when absent), or null for an absent scalar.
    pub value: Value,
    /// True iff every `Always` source is present and all present sources
    /// agree. A field with no sources present reports true — there is
    /// nothing to disagree about.
    pub is_consolidated: bool,
}

/// All schema fields of one file, plus the raw tag map they were derived from.
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata {
    /// Tool-reported source file identifier; callers correlate results back
    /// to their input paths with this, not by position.
    pub source_file: String,
    pub fields: BTreeMap<String, FieldReadResult>,
    /// Raw tag map with read-side handler conversions already applied.
    pub raw_tags: Map<String, Value>,
}

impl FileMetadata {
    /// The file name component of the source file identifier.
    pub fn file_name(&self) -> &str {
        self.source_file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_file)
    }
}

/// Read every schema field for a batch of files in one ExifTool invocation.
///
/// A failed invocation degrades to an empty result list; callers are expected
/// to synthesize an "unreadable" entry for any input path missing from the
/// output, since ExifTool silently drops files it cannot process.
pub fn read_batch(tool: &ExifTool, paths: &[PathBuf]) -> Vec<FileMetadata> {
    if paths.is_empty() {
        return Vec::new();
    }

    let records = match tool.read_json(&schema().read_args(), paths) {
        Ok(records) => records,
        Err(e) => {
            log::warn!("metadata read failed: {e:#}");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .filter_map(|record| match record {
            Value::Object(raw) => Some(consolidate_file(raw)),
            other => {
                log::debug!("skipping non-object exiftool record: {other}");
                None
            }
        })
        .collect()
}

/// Derive the per-field read results for one file from its raw tag map.
///
/// Read-side value handlers are applied to the map first, so consolidation
/// compares normalized values (e.g. Canon timezone minutes become `"+09:00"`
/// before being held against `ExifIFD:OffsetTimeOriginal`).
pub fn consolidate_file(mut raw: Map<String, Value>) -> FileMetadata {
    for field in schema().fields() {
        for source in &field.sources {
            if source.handler == ValueHandler::Identity {
                continue;
            }
            if let Some(value) = raw.get(source.tag_id) {
                let normalized = source.handler.read(value);
                raw.insert(source.tag_id.to_string(), normalized);
            }
        }
    }

    let source_file = raw
        .get(SOURCE_FILE_KEY)
        .map(value_to_string)
        .unwrap_or_default();

    let mut fields = BTreeMap::new();
    for field in schema().fields() {
        fields.insert(field.name.to_string(), consolidate_field(field, &raw));
    }

    FileMetadata {
        source_file,
        fields,
        raw_tags: raw,
    }
}

fn consolidate_field(field: &FieldDef, raw: &Map<String, Value>) -> FieldReadResult {
    // First present source in declared order supplies the value.
    let present: Vec<&Value> = field
        .sources
        .iter()
        .filter_map(|source| raw.get(source.tag_id))
        .collect();

    let value = match field.kind {
        FieldKind::List => match present.first() {
            Some(Value::Array(items)) => Value::Array(
                items
                    .iter()
                    .map(|item| Value::String(value_to_string(item)))
                    .collect(),
            ),
            // A single keyword comes back as a bare scalar; coerce it.
            Some(scalar) => Value::Array(vec![Value::String(value_to_string(scalar))]),
            None => Value::Array(Vec::new()),
        },
        FieldKind::Scalar => match present.first() {
            Some(v) => Value::String(value_to_string(v)),
            None => Value::Null,
        },
    };

    let is_consolidated = if present.is_empty() {
        true
    } else {
        let all_mandatory_present = field
            .sources
            .iter()
            .filter(|source| source.write_mode == WriteMode::Always)
            .all(|source| raw.contains_key(source.tag_id));
        let first = value_to_string(present[0]);
        all_mandatory_present && present.iter().all(|v| value_to_string(v) == first)
    };

    FieldReadResult {
        value,
        is_consolidated,
    }
}
