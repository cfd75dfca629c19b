//! The metadata field schema — single source of truth for how application-level
//! fields map onto the underlying EXIF/XMP/IPTC tags managed by ExifTool.
//!
//! Every high-level field (e.g. `Creator`, `DateTimeOriginal`) is backed by one
//! or more tag sources. The order of the sources matters: on read, the first
//! source present in a file supplies the field's value. The write mode of each
//! source decides whether it is rewritten on every save or only when the file
//! already carries that tag.
//!
//! The schema is built once and shared for the lifetime of the process via
//! [`schema`].

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::handlers::ValueHandler;

/// How a field's value is shaped: a single string or an ordered list of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    List,
}

/// Write policy for a single tag source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Rewritten unconditionally on every save.
    Always,
    /// Rewritten only if the tag was present in the file's original metadata.
    IfExists,
}

/// One underlying tag backing an application field.
#[derive(Debug, Clone)]
pub struct TagSource {
    /// Group-qualified ExifTool tag name, e.g. `"ExifIFD:DateTimeOriginal"`.
    pub tag_id: &'static str,
    pub write_mode: WriteMode,
    pub handler: ValueHandler,
}

impl TagSource {
    fn always(tag_id: &'static str) -> Self {
        Self {
            tag_id,
            write_mode: WriteMode::Always,
            handler: ValueHandler::Identity,
        }
    }

    fn if_exists(tag_id: &'static str) -> Self {
        Self {
            tag_id,
            write_mode: WriteMode::IfExists,
            handler: ValueHandler::Identity,
        }
    }

    fn with_handler(mut self, handler: ValueHandler) -> Self {
        self.handler = handler;
        self
    }
}

/// Definition of one application-level metadata field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Unique field identifier used in read results and save payloads.
    pub name: &'static str,
    /// Human-readable label for UI consumption.
    pub label: &'static str,
    /// Presentational grouping (not part of any invariant).
    pub group: &'static str,
    pub kind: FieldKind,
    /// Request raw (unformatted) values from ExifTool for this field's tags.
    pub raw_numeric: bool,
    /// Ordered tag sources; the first one present wins on read.
    pub sources: Vec<TagSource>,
}

/// The full field table plus a name index.
#[derive(Debug)]
pub struct Schema {
    fields: Vec<FieldDef>,
    by_name: HashMap<&'static str, usize>,
}

impl Schema {
    fn build() -> Self {
        let fields = field_table();
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name, i))
            .collect();
        Self { fields, by_name }
    }

    /// All field definitions in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field by its application-level name.
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// All application-level field names, in declaration order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// The union of all underlying tag identifiers, deduplicated, in first-seen
    /// order. This is the tag set a batched read must request to populate every
    /// field.
    pub fn tag_ids(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for field in &self.fields {
            for source in &field.sources {
                if !seen.contains(&source.tag_id) {
                    seen.push(source.tag_id);
                }
            }
        }
        seen
    }

    /// ExifTool request arguments for the batched read: one `-Tag` per unique
    /// tag, with a `#` suffix where the owning field asks for raw values.
    pub fn read_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut seen = Vec::new();
        for field in &self.fields {
            for source in &field.sources {
                if seen.contains(&source.tag_id) {
                    continue;
                }
                seen.push(source.tag_id);
                if field.raw_numeric {
                    args.push(format!("-{}#", source.tag_id));
                } else {
                    args.push(format!("-{}", source.tag_id));
                }
            }
        }
        args
    }

    /// Group labels in first-seen order, each with its member field names.
    pub fn groups(&self) -> Vec<(&'static str, Vec<&'static str>)> {
        let mut groups: Vec<(&'static str, Vec<&'static str>)> = Vec::new();
        for field in &self.fields {
            match groups.iter_mut().find(|(g, _)| *g == field.group) {
                Some((_, members)) => members.push(field.name),
                None => groups.push((field.group, vec![field.name])),
            }
        }
        groups
    }
}

/// The process-wide schema instance.
pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(Schema::build)
}

fn field_table() -> Vec<FieldDef> {
    vec![
        FieldDef {
            name: "Title",
            label: "Title",
            group: "Content",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-dc:Title")],
        },
        FieldDef {
            name: "Keywords",
            label: "Keywords",
            group: "Content",
            kind: FieldKind::List,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-dc:Subject")],
        },
        FieldDef {
            name: "DateTimeOriginal",
            label: "Date Time Original",
            group: "Date & Time",
            kind: FieldKind::Scalar,
            raw_numeric: true,
            sources: vec![
                TagSource::always("XMP-dc:Date"),
                TagSource::always("ExifIFD:DateTimeOriginal"),
                TagSource::always("ExifIFD:CreateDate"),
            ],
        },
        FieldDef {
            name: "OffsetTimeOriginal",
            label: "Offset Time Original",
            group: "Date & Time",
            kind: FieldKind::Scalar,
            raw_numeric: true,
            sources: vec![
                TagSource::always("ExifIFD:OffsetTimeOriginal"),
                TagSource::if_exists("Canon:TimeZone")
                    .with_handler(ValueHandler::MinutesToOffset),
            ],
        },
        FieldDef {
            name: "Creator",
            label: "Creator",
            group: "Creator",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![
                TagSource::always("XMP-dc:Creator"),
                TagSource::always("IFD0:Artist"),
            ],
        },
        FieldDef {
            name: "Copyright",
            label: "Copyright",
            group: "Creator",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![
                TagSource::always("XMP-dc:Rights"),
                TagSource::always("IFD0:Copyright"),
            ],
        },
        FieldDef {
            name: "LatitudeCreated",
            label: "Latitude",
            group: "Location Created",
            kind: FieldKind::Scalar,
            raw_numeric: true,
            sources: vec![
                TagSource::always("XMP-iptcExt:LocationCreatedGPSLatitude"),
                TagSource::if_exists("XMP-exif:GPSLatitude"),
            ],
        },
        FieldDef {
            name: "LongitudeCreated",
            label: "Longitude",
            group: "Location Created",
            kind: FieldKind::Scalar,
            raw_numeric: true,
            sources: vec![
                TagSource::always("XMP-iptcExt:LocationCreatedGPSLongitude"),
                TagSource::if_exists("XMP-exif:GPSLongitude"),
            ],
        },
        FieldDef {
            name: "LocationCreated",
            label: "Location",
            group: "Location Created",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationCreatedSublocation")],
        },
        FieldDef {
            name: "CityCreated",
            label: "City",
            group: "Location Created",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationCreatedCity")],
        },
        FieldDef {
            name: "StateCreated",
            label: "State",
            group: "Location Created",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationCreatedProvinceState")],
        },
        FieldDef {
            name: "CountryCreated",
            label: "Country",
            group: "Location Created",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationCreatedCountryName")],
        },
        FieldDef {
            name: "CountryCodeCreated",
            label: "Country Code",
            group: "Location Created",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationCreatedCountryCode")],
        },
        FieldDef {
            name: "LatitudeShown",
            label: "Latitude",
            group: "Location Shown",
            kind: FieldKind::Scalar,
            raw_numeric: true,
            sources: vec![TagSource::always("XMP-iptcExt:LocationShownGPSLatitude")],
        },
        FieldDef {
            name: "LongitudeShown",
            label: "Longitude",
            group: "Location Shown",
            kind: FieldKind::Scalar,
            raw_numeric: true,
            sources: vec![TagSource::always("XMP-iptcExt:LocationShownGPSLongitude")],
        },
        FieldDef {
            name: "LocationShown",
            label: "Location",
            group: "Location Shown",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationShownSublocation")],
        },
        FieldDef {
            name: "CityShown",
            label: "City",
            group: "Location Shown",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationShownCity")],
        },
        FieldDef {
            name: "StateShown",
            label: "State",
            group: "Location Shown",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationShownProvinceState")],
        },
        FieldDef {
            name: "CountryShown",
            label: "Country",
            group: "Location Shown",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationShownCountryName")],
        },
        FieldDef {
            name: "CountryCodeShown",
            label: "Country Code",
            group: "Location Shown",
            kind: FieldKind::Scalar,
            raw_numeric: false,
            sources: vec![TagSource::always("XMP-iptcExt:LocationShownCountryCode")],
        },
    ]
}
