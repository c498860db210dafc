//! Multi-format parsing of source entries into records.
//!
//! Format is chosen by filename extension when a hint is present, otherwise
//! by content sniffing (Jsonnet first, since it is a superset of JSON, then
//! YAML, then CSV).

use catsync_core::Record;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

/// Parse raw bytes into records.
pub fn parse(filename: Option<&str>, content: &[u8]) -> Result<Vec<Record>, ParseError> {
    match filename.and_then(extension) {
        Some("json") => parse_json(content),
        Some("yaml" | "yml") => parse_yaml(content),
        Some("jsonnet" | "libsonnet") => {
            parse_jsonnet(filename.unwrap_or("source.jsonnet"), content)
        }
        Some("csv") => parse_csv(content),
        _ => sniff(filename.unwrap_or("source"), content),
    }
}

fn extension(filename: &str) -> Option<&str> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
}

/// No recognised extension: try each format in turn. Jsonnet subsumes JSON;
/// CSV is last because almost any single line looks like a CSV header, so
/// it only participates when the first line actually contains a separator.
fn sniff(filename: &str, content: &[u8]) -> Result<Vec<Record>, ParseError> {
    let jsonnet_err = match parse_jsonnet(filename, content) {
        Ok(records) => return Ok(records),
        Err(e) => e,
    };
    let yaml_err = match parse_yaml(content) {
        Ok(records) => return Ok(records),
        Err(e) => e,
    };
    if looks_like_csv(content) {
        if let Ok(records) = parse_csv(content) {
            return Ok(records);
        }
    }

    Err(ParseError::UnknownFormat {
        message: format!("{jsonnet_err}; {yaml_err}"),
    })
}

fn looks_like_csv(content: &[u8]) -> bool {
    std::str::from_utf8(content)
        .ok()
        .and_then(|text| text.lines().find(|line| !line.trim().is_empty()))
        .is_some_and(|header| header.contains(','))
}

fn parse_json(content: &[u8]) -> Result<Vec<Record>, ParseError> {
    let value: Value = serde_json::from_slice(content).map_err(|e| ParseError::Json {
        message: e.to_string(),
    })?;
    records_from_value(value)
}

fn parse_yaml(content: &[u8]) -> Result<Vec<Record>, ParseError> {
    let mut records = Vec::new();
    for document in serde_yaml::Deserializer::from_slice(content) {
        let value = Value::deserialize(document).map_err(|e| ParseError::Yaml {
            message: e.to_string(),
        })?;
        if value.is_null() {
            // Empty document, e.g. a trailing `---`.
            continue;
        }
        records.extend(records_from_value(value)?);
    }
    Ok(records)
}

fn parse_jsonnet(filename: &str, content: &[u8]) -> Result<Vec<Record>, ParseError> {
    records_from_value(jsonnet_to_value(filename, content)?)
}

/// Evaluate a Jsonnet snippet to a JSON value. The filename is bound so
/// `std.thisFile` resolves to it; hidden (`::`) fields are dropped by
/// manifestation.
pub(crate) fn jsonnet_to_value(filename: &str, content: &[u8]) -> Result<Value, ParseError> {
    let code = std::str::from_utf8(content).map_err(|e| ParseError::Encoding {
        message: e.to_string(),
    })?;

    let mut state_builder = jrsonnet_evaluator::State::builder();
    state_builder.context_initializer(jrsonnet_stdlib::ContextInitializer::new(
        jrsonnet_evaluator::trace::PathResolver::new_cwd_fallback(),
    ));
    let state = state_builder.build();

    let evaluated =
        state
            .evaluate_snippet(filename, code)
            .map_err(|e| ParseError::Jsonnet {
                message: e.to_string(),
            })?;
    let manifested = evaluated
        .manifest(jrsonnet_evaluator::manifest::JsonFormat::default())
        .map_err(|e| ParseError::Jsonnet {
            message: e.to_string(),
        })?;

    serde_json::from_str(&manifested).map_err(|e| ParseError::Jsonnet {
        message: e.to_string(),
    })
}

fn parse_csv(content: &[u8]) -> Result<Vec<Record>, ParseError> {
    let text = std::str::from_utf8(content).map_err(|e| ParseError::Encoding {
        message: e.to_string(),
    })?;
    // The first non-empty row is the header.
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ParseError::Csv {
            message: e.to_string(),
        })?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| ParseError::Csv {
            message: e.to_string(),
        })?;
        let mut record = Record::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            record.insert(header.to_string(), Value::String(cell.to_string()));
        }
        records.push(record);
    }
    Ok(records)
}

/// Apply the common shape rule: an object is one record, an array is one
/// record per object element, anything else is not record data.
fn records_from_value(value: Value) -> Result<Vec<Record>, ParseError> {
    match value {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(ParseError::NotRecords),
            })
            .collect(),
        _ => Err(ParseError::NotRecords),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn must_parse(filename: Option<&str>, content: &str) -> Vec<Record> {
        parse(filename, content.as_bytes()).expect("parse should succeed")
    }

    #[test]
    fn test_json_object_yields_one_record() {
        let records = must_parse(
            Some("things.json"),
            r#"{"key": "value", "nested": {"another_key": "another_value"}}"#,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["key"], json!("value"));
        assert_eq!(records[0]["nested"]["another_key"], json!("another_value"));
    }

    #[test]
    fn test_json_array_yields_records_in_order() {
        let records = must_parse(
            Some("things.json"),
            r#"[{"key": "value"}, {"another_key": "another_value"}]"#,
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["key"], json!("value"));
        assert_eq!(records[1]["another_key"], json!("another_value"));
    }

    #[test]
    fn test_yaml_object() {
        let records = must_parse(Some("things.yaml"), "key: value\nnested:\n  another_key: another_value\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["nested"]["another_key"], json!("another_value"));
    }

    #[test]
    fn test_yaml_multidoc() {
        let records = must_parse(Some("things.yaml"), "a: 1\n---\nb: 2\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["a"], json!(1));
        assert_eq!(records[1]["b"], json!(2));
    }

    #[test]
    fn test_yaml_array() {
        let records = must_parse(Some("things.yml"), "- key: value\n- another_key: another_value\n");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_csv_headers() {
        let records = must_parse(Some("things.csv"), "id,name\nP1,Alpha\nP2,Beta\n");
        assert_eq!(
            records,
            vec![
                serde_json::from_value::<Record>(json!({"id": "P1", "name": "Alpha"})).unwrap(),
                serde_json::from_value::<Record>(json!({"id": "P2", "name": "Beta"})).unwrap(),
            ]
        );
    }

    #[test]
    fn test_csv_leading_blank_lines_skipped() {
        let records = must_parse(Some("things.csv"), "\nid,name\nP1,Alpha\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], json!("P1"));
    }

    #[test]
    fn test_csv_values_are_strings() {
        let records = must_parse(Some("things.csv"), "id,count\nP1,3\n");
        assert_eq!(records[0]["count"], json!("3"));
    }

    #[test]
    fn test_jsonnet_this_file_and_hidden_fields() {
        let records = must_parse(
            Some("file.thing"),
            "{\n  name: std.thisFile,\n  hidden:: true,\n}\n",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], json!("file.thing"));
        assert!(!records[0].contains_key("hidden"));
    }

    #[test]
    fn test_jsonnet_array() {
        let records = must_parse(
            Some("things.jsonnet"),
            r#"[{key: "value"}, {another_key: "another_value"}]"#,
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["key"], json!("value"));
    }

    #[test]
    fn test_sniff_yaml_without_filename() {
        let records = must_parse(None, "we: hate yaml\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["we"], json!("hate yaml"));
    }

    #[test]
    fn test_sniff_json_without_filename() {
        let records = must_parse(None, r#"{"key": "value"}"#);
        assert_eq!(records[0]["key"], json!("value"));
    }

    #[test]
    fn test_sniff_csv_without_filename() {
        let records = must_parse(None, "id,name,description\nP123,My name is,What\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["description"], json!("What"));
    }

    #[test]
    fn test_malformed_json_is_typed_error() {
        let err = parse(Some("things.json"), b"{\"key\": ").unwrap_err();
        assert!(matches!(err, ParseError::Json { .. }));
    }

    #[test]
    fn test_scalar_document_is_not_records() {
        let err = parse(Some("things.json"), b"\"just a string\"").unwrap_err();
        assert!(matches!(err, ParseError::NotRecords));
    }

    #[test]
    fn test_array_of_scalars_is_not_records() {
        let err = parse(Some("things.json"), b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ParseError::NotRecords));
    }

    #[test]
    fn test_unknown_format_is_typed_error() {
        let err = parse(None, &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ParseError::UnknownFormat { .. }));
    }
}
