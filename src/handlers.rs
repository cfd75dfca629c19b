//! Value handlers — bidirectional converters between a tag's on-disk raw form
//! and the normalized form the rest of the engine works with.
//!
//! The handler set is closed and small, so it is an enum rather than a
//! registry: every tag source in the schema names one variant, and match arms
//! stay exhaustive at compile time.

use serde_json::Value;

/// A named bidirectional converter attached to a tag source.
///
/// Handlers are total over their input domain: malformed input yields an empty
/// sentinel on the read side and `None` on the write side, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueHandler {
    /// No conversion.
    Identity,
    /// Canon-style timezone minutes ↔ `"±HH:MM"` offset string.
    MinutesToOffset,
}

impl ValueHandler {
    /// Convert a raw tag value into its normalized form.
    pub fn read(&self, raw: &Value) -> Value {
        match self {
            ValueHandler::Identity => raw.clone(),
            ValueHandler::MinutesToOffset => {
                Value::String(minutes_to_offset(&value_to_string(raw)))
            }
        }
    }

    /// Convert a normalized value back into the tag's raw form.
    ///
    /// `None` means the conversion failed; the writer falls back to the
    /// unconverted value rather than dropping the write.
    pub fn write(&self, value: &str) -> Option<String> {
        match self {
            ValueHandler::Identity => Some(value.to_string()),
            ValueHandler::MinutesToOffset => offset_to_minutes(value).map(|m| m.to_string()),
        }
    }
}

/// Render any raw tag value as a plain string for conversion and comparison.
/// Lists are joined with `", "`; null renders empty.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        Value::Object(_) => value.to_string(),
    }
}

/// Format a signed number of minutes as a `"±HH:MM"` offset string.
///
/// Returns an empty string when the input is not a whole number of minutes.
/// The sign comes from the hour component, except when the hour is zero, where
/// an integer carries no sign of its own — then the raw minutes decide
/// (−15 minutes must render `"-00:15"`).
pub fn minutes_to_offset(raw: &str) -> String {
    let minutes: i64 = match parse_minutes(raw) {
        Some(m) => m,
        None => return String::new(),
    };

    let hours = minutes / 60;
    let rem = (minutes % 60).abs();
    let sign = if hours < 0 || (hours == 0 && minutes < 0) {
        '-'
    } else {
        '+'
    };
    format!("{sign}{:02}:{rem:02}", hours.abs())
}

/// Parse a `"±HH:MM"` offset string (or a bare integer) into total signed
/// minutes. `None` when neither form parses.
pub fn offset_to_minutes(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some((hours_part, minutes_part)) = trimmed.split_once(':') {
        let negative = hours_part.starts_with('-');
        let hours: i64 = hours_part
            .strip_prefix('+')
            .unwrap_or(hours_part)
            .parse()
            .ok()?;
        let minutes: i64 = minutes_part.parse().ok()?;
        let total = hours.abs() * 60 + minutes;
        return Some(if negative { -total } else { total });
    }

    // Bare minute count, e.g. "90" or "-540"
    parse_minutes(trimmed)
}

fn parse_minutes(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(m) = trimmed.parse::<i64>() {
        return Some(m);
    }
    // ExifTool may hand back minutes as a float-typed number ("540.0")
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.fract() == 0.0)
        .map(|f| f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── minutes_to_offset ────────────────────────────────────────────

    #[test]
    fn positive_minutes() {
        assert_eq!(minutes_to_offset("90"), "+01:30");
        assert_eq!(minutes_to_offset("540"), "+09:00");
        assert_eq!(minutes_to_offset("0"), "+00:00");
    }

    #[test]
    fn negative_minutes() {
        assert_eq!(minutes_to_offset("-90"), "-01:30");
        assert_eq!(minutes_to_offset("-540"), "-09:00");
    }

    #[test]
    fn negative_minutes_with_zero_hours_keep_their_sign() {
        // The hour component is 0, whose integer sign is useless — the raw
        // minutes decide.
        assert_eq!(minutes_to_offset("-15"), "-00:15");
        assert_eq!(minutes_to_offset("15"), "+00:15");
    }

    #[test]
    fn non_numeric_input_yields_empty_sentinel() {
        assert_eq!(minutes_to_offset("not a number"), "");
        assert_eq!(minutes_to_offset(""), "");
        assert_eq!(minutes_to_offset("1:30"), "");
    }

    #[test]
    fn float_typed_whole_minutes_accepted() {
        assert_eq!(minutes_to_offset("540.0"), "+09:00");
        assert_eq!(minutes_to_offset("540.5"), "");
    }

    // ── offset_to_minutes ────────────────────────────────────────────

    #[test]
    fn parses_signed_offsets() {
        assert_eq!(offset_to_minutes("+01:30"), Some(90));
        assert_eq!(offset_to_minutes("-01:30"), Some(-90));
        assert_eq!(offset_to_minutes("-00:15"), Some(-15));
        assert_eq!(offset_to_minutes("09:00"), Some(540));
    }

    #[test]
    fn parses_bare_minutes() {
        assert_eq!(offset_to_minutes("90"), Some(90));
        assert_eq!(offset_to_minutes("-540"), Some(-540));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(offset_to_minutes(""), None);
        assert_eq!(offset_to_minutes("abc"), None);
        assert_eq!(offset_to_minutes("+aa:bb"), None);
    }

    #[test]
    fn round_trip_through_both_directions() {
        for offset in ["+01:30", "-01:30", "-00:15", "+00:00", "+09:00", "-11:45"] {
            let minutes = offset_to_minutes(offset).unwrap();
            assert_eq!(minutes_to_offset(&minutes.to_string()), offset);
        }
    }

    // ── ValueHandler ─────────────────────────────────────────────────

    #[test]
    fn identity_passes_values_through() {
        let v = json!("hello");
        assert_eq!(ValueHandler::Identity.read(&v), v);
        assert_eq!(
            ValueHandler::Identity.write("hello"),
            Some("hello".to_string())
        );
    }

    #[test]
    fn minutes_handler_reads_numbers_and_numeric_strings() {
        let h = ValueHandler::MinutesToOffset;
        assert_eq!(h.read(&json!(90)), json!("+01:30"));
        assert_eq!(h.read(&json!("-15")), json!("-00:15"));
        assert_eq!(h.read(&json!("junk")), json!(""));
    }

    #[test]
    fn minutes_handler_write_signals_failure_with_none() {
        let h = ValueHandler::MinutesToOffset;
        assert_eq!(h.write("+01:30"), Some("90".to_string()));
        assert_eq!(h.write("540"), Some("540".to_string()));
        assert_eq!(h.write("garbage"), None);
    }

    // ── value_to_string ──────────────────────────────────────────────

    #[test]
    fn stringifies_scalars_and_lists() {
        assert_eq!(value_to_string(&json!("a")), "a");
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!(["a", "b"])), "a, b");
        assert_eq!(value_to_string(&Value::Null), "");
    }
}
