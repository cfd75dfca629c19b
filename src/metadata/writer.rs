use serde_json::{Map, Value};

use crate::handlers::value_to_string;
use crate::schema::{FieldKind, WriteMode, schema};

/// Translate a field-update request into ExifTool tag-assignment arguments.
///
/// For every `(field, new value)` entry, each of the field's tag sources is
/// checked for eligibility: `Always` sources are written unconditionally,
/// `IfExists` sources only when their tag is present in `original` (the raw
/// tag map captured when the file was read). List fields emit a clear
/// (`-Tag=`) followed by one append (`-Tag+=item`) per non-blank item so the
/// write overwrites instead of accumulating; scalar fields emit a single
/// assignment, where an empty value clears the tag.
///
/// Field names not in the schema are skipped silently — callers may send
/// payloads from a newer or older schema than ours. The function is pure and
/// its output order is stable for identical inputs: arguments follow schema
/// declaration order, never payload order.
pub fn build_args(original: &Map<String, Value>, new_values: &Map<String, Value>) -> Vec<String> {
    let mut args = Vec::new();

    for field in schema().fields() {
        let Some(new_value) = new_values.get(field.name) else {
            continue;
        };

        let eligible = field.sources.iter().filter(|source| match source.write_mode {
            WriteMode::Always => true,
            WriteMode::IfExists => original.contains_key(source.tag_id),
        });

        match field.kind {
            FieldKind::List => {
                let items = list_items(new_value);
                for source in eligible {
                    args.push(format!("-{}=", source.tag_id));
                    for item in &items {
                        // A failed write-side conversion falls back to the
                        // raw value — the user's change must not be dropped.
                        let converted = source
                            .handler
                            .write(item)
                            .unwrap_or_else(|| item.clone());
                        args.push(format!("-{}+={converted}", source.tag_id));
                    }
                }
            }
            FieldKind::Scalar => {
                let value = value_to_string(new_value).trim().to_string();
                for source in eligible {
                    let converted = source
                        .handler
                        .write(&value)
                        .unwrap_or_else(|| value.clone());
                    args.push(format!("-{}={converted}", source.tag_id));
                }
            }
        }
    }

    args
}

/// Trimmed, non-blank list items in payload order. A bare scalar becomes a
/// single item; null becomes no items (clear only).
fn list_items(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().map(value_to_string).collect(),
        Value::Null => Vec::new(),
        scalar => vec![value_to_string(scalar)],
    };

    raw.into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn scalar_field_writes_every_always_source() {
        let args = build_args(&Map::new(), &map(&[("Creator", json!("Bob"))]));
        assert_eq!(args, vec!["-XMP-dc:Creator=Bob", "-IFD0:Artist=Bob"]);
    }

    #[test]
    fn empty_scalar_clears_the_tag() {
        let args = build_args(&Map::new(), &map(&[("Title", json!("  "))]));
        assert_eq!(args, vec!["-XMP-dc:Title="]);
    }

    #[test]
    fn list_field_clears_then_appends_skipping_blanks() {
        let args = build_args(&Map::new(), &map(&[("Keywords", json!(["a", "", "b"]))]));
        assert_eq!(
            args,
            vec!["-XMP-dc:Subject=", "-XMP-dc:Subject+=a", "-XMP-dc:Subject+=b"]
        );
    }

    #[test]
    fn empty_list_emits_clear_only() {
        let args = build_args(&Map::new(), &map(&[("Keywords", json!([]))]));
        assert_eq!(args, vec!["-XMP-dc:Subject="]);
    }

    #[test]
    fn if_exists_source_skipped_when_absent_from_original() {
        let args = build_args(&Map::new(), &map(&[("OffsetTimeOriginal", json!("+01:30"))]));
        assert_eq!(args, vec!["-ExifIFD:OffsetTimeOriginal=+01:30"]);
    }

    #[test]
    fn if_exists_source_written_when_present_with_conversion() {
        let original = map(&[("Canon:TimeZone", json!(540))]);
        let args = build_args(&original, &map(&[("OffsetTimeOriginal", json!("+01:30"))]));
        assert_eq!(
            args,
            vec!["-ExifIFD:OffsetTimeOriginal=+01:30", "-Canon:TimeZone=90"]
        );
    }

    #[test]
    fn failed_conversion_falls_back_to_raw_value() {
        let original = map(&[("Canon:TimeZone", json!(540))]);
        let args = build_args(&original, &map(&[("OffsetTimeOriginal", json!("junk"))]));
        assert_eq!(
            args,
            vec!["-ExifIFD:OffsetTimeOriginal=junk", "-Canon:TimeZone=junk"]
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let args = build_args(&Map::new(), &map(&[("NotAField", json!("x"))]));
        assert!(args.is_empty());
    }

    #[test]
    fn output_is_stable_across_calls() {
        let new_values = map(&[
            ("Creator", json!("Bob")),
            ("Keywords", json!(["a", "b"])),
            ("Title", json!("Hello")),
        ]);
        let first = build_args(&Map::new(), &new_values);
        let second = build_args(&Map::new(), &new_values);
        assert_eq!(first, second);
        // Schema declaration order, not payload order: Title precedes Creator.
        let title_pos = first.iter().position(|a| a.contains("Title")).unwrap();
        let creator_pos = first.iter().position(|a| a.contains("Creator")).unwrap();
        assert!(title_pos < creator_pos);
    }

    #[test]
    fn writing_creator_repairs_fragmented_metadata() {
        // Read side: XMP creator present, IFD0:Artist missing — unconsolidated.
        let original = map(&[("XMP-dc:Creator", json!("Alice"))]);
        let meta = crate::metadata::consolidate_file(original.clone());
        let creator = &meta.fields["Creator"];
        assert_eq!(creator.value, json!("Alice"));
        assert!(!creator.is_consolidated);

        // Write side: both Always sources get the new value.
        let args = build_args(&original, &map(&[("Creator", json!("Bob"))]));
        assert_eq!(args, vec!["-XMP-dc:Creator=Bob", "-IFD0:Artist=Bob"]);

        // After applying those assignments, the next read consolidates.
        let repaired = map(&[
            ("XMP-dc:Creator", json!("Bob")),
            ("IFD0:Artist", json!("Bob")),
        ]);
        let meta = crate::metadata::consolidate_file(repaired);
        assert!(meta.fields["Creator"].is_consolidated);
    }

    #[test]
    fn numeric_scalar_payload_stringified() {
        let args = build_args(&Map::new(), &map(&[("LatitudeShown", json!(48.8566))]));
        assert_eq!(args, vec!["-XMP-iptcExt:LocationShownGPSLatitude=48.8566"]);
    }
}
