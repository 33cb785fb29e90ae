use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::NormalizeError;

pub fn read_source(path: &Path) -> Result<String, NormalizeError> {
    fs::read_to_string(path).map_err(|source| NormalizeError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses the single structured document held by `content`. Content that
/// looks bare is parsed as-is first; otherwise, or when that parse fails, the
/// text is sliced from the first `{` to the last `}` so an export pasted into
/// markdown or prose still loads.
pub fn locate_payload(content: &str) -> Result<Value, NormalizeError> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();

    if is_bare_document(trimmed) {
        match serde_json::from_str(trimmed) {
            Ok(document) => return Ok(document),
            Err(err) => debug!(error = %err, "bare parse failed; slicing embedded object"),
        }
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(NormalizeError::malformed("no '{'...'}' pair found in source"));
    };
    if end < start {
        return Err(NormalizeError::malformed(
            "last '}' precedes first '{' in source",
        ));
    }

    serde_json::from_str(&trimmed[start..=end]).map_err(|err| {
        NormalizeError::malformed(format!(
            "failed to parse embedded document at byte {start}: {err}"
        ))
    })
}

fn is_bare_document(text: &str) -> bool {
    (text.starts_with('{') && text.ends_with('}')) || (text.starts_with('[') && text.ends_with(']'))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_bare_array_document() {
        let value = locate_payload("  [{\"result\": []}]\n").expect("bare array should parse");
        assert!(value.is_array());
    }

    #[test]
    fn slices_document_embedded_in_markdown() {
        let content = "# id598\n\nExport below:\n\n```json\n{\"result\": [{\"type\": \"rectanglelabels\"}]}\n```\n";
        let value = locate_payload(content).expect("embedded object should parse");
        assert_eq!(value["result"][0]["type"], "rectanglelabels");
    }

    #[test]
    fn bracketed_markdown_wrapper_falls_back_to_slice() {
        let content = "[Label Studio](https://labelstud.io) export:\n```json\n{\"result\": [{\"type\": \"rectanglelabels\"}]}\n```\n[back]";
        let value = locate_payload(content).expect("wrapped object should parse");
        assert_eq!(value["result"][0]["type"], "rectanglelabels");
    }

    #[test]
    fn bracketed_wrapper_without_object_reports_slice_detail() {
        let err = locate_payload("[see notes] nothing here [end]").unwrap_err();
        assert!(err.to_string().contains("no '{'...'}' pair"));

        let err = locate_payload("[intro] {\"result\": [1,]} [end]").unwrap_err();
        assert!(err.to_string().contains("embedded document"), "{err}");
    }

    #[test]
    fn ignores_byte_order_mark() {
        let value = locate_payload("\u{feff}{\"result\": []}").expect("bom should be skipped");
        assert!(value.get("result").is_some());
    }

    #[test]
    fn missing_braces_is_malformed() {
        let err = locate_payload("no structured data here").unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedPayload { .. }));
    }

    #[test]
    fn reversed_braces_is_malformed() {
        let err = locate_payload("} before {").unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedPayload { .. }));
    }

    #[test]
    fn parse_failure_carries_parser_detail() {
        let err = locate_payload("prefix {\"result\": [1, 2,]} suffix").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("malformed payload"));
        assert!(message.contains("line 1"), "missing parser detail: {message}");
    }

    #[test]
    fn read_source_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_source(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, NormalizeError::FileNotFound { .. }));
    }

    #[test]
    fn read_source_reads_utf8_labels() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{\"result\": [\"硬化肾小球\"]}}").expect("write temp file");
        let content = read_source(file.path()).expect("file should read");
        assert!(content.contains("硬化肾小球"));
    }
}
