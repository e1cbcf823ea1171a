//! JSON-or-file command line inputs.
//!
//! `--context`, `--history` and `--configuration` each accept either an
//! inline JSON document or a path to a file containing one.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::ConfigError;

/// Resolve an input that is either inline JSON or a path to a JSON file.
///
/// - Inline JSON wins when `input` parses.
/// - Otherwise `input` is treated as a path; an existing file must hold
///   valid JSON.
/// - A path that does not exist resolves to `fallback`.
pub fn parse_json_input(input: &str, fallback: Value) -> Result<Value, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(fallback);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let path = Path::new(trimmed);
    if !path.is_file() {
        debug!(input = %trimmed, "JSON input is neither inline JSON nor a file, using fallback");
        return Ok(fallback);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| {
        warn!(path = %path.display(), "JSON input file is not valid JSON");
        ConfigError::InvalidJson(format!("{}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn inline_json_is_parsed() {
        let value = parse_json_input(r#"{"user": "ada"}"#, json!({})).unwrap();
        assert_eq!(value["user"], "ada");
    }

    #[test]
    fn missing_file_falls_back() {
        let value = parse_json_input("context.json", json!([])).unwrap();
        assert_eq!(value, json!([]));
    }

    #[test]
    fn empty_input_falls_back() {
        let value = parse_json_input("   ", json!({"a": 1})).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn file_contents_are_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"thought": "earlier"}}]"#).unwrap();
        let value = parse_json_input(file.path().to_str().unwrap(), json!([])).unwrap();
        assert_eq!(value[0]["thought"], "earlier");
    }

    #[test]
    fn invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = parse_json_input(file.path().to_str().unwrap(), json!({})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson(_)));
    }
}
