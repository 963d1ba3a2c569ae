//! Batch decoding of assessment requests
//!
//! Accepts either a JSON array or NDJSON (one request per line) and reports
//! per-record validation failures without aborting the batch.

use crate::error::AssessError;
use crate::schema::input::RawInput;

/// Adapter for decoding and checking batches of `RawInput`
pub struct InputAdapter;

impl InputAdapter {
    /// Parse a JSON string containing an array of requests
    pub fn parse_array(json: &str) -> Result<Vec<RawInput>, AssessError> {
        let inputs: Vec<RawInput> = serde_json::from_str(json)?;
        Ok(inputs)
    }

    /// Parse NDJSON (newline-delimited JSON) containing requests
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawInput>, AssessError> {
        let mut inputs = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            inputs.push(Self::parse_line(trimmed, line_num + 1)?);
        }
        Ok(inputs)
    }

    /// Parse a single request, naming the line on failure
    pub fn parse_line(line: &str, line_num: usize) -> Result<RawInput, AssessError> {
        serde_json::from_str::<RawInput>(line).map_err(|e| AssessError::InvalidInput {
            field: format!("line {}", line_num),
            reason: e.to_string(),
        })
    }

    /// Decode one raw NDJSON line, rejecting invalid UTF-8 as bad input
    pub fn decode_line(bytes: &[u8], line_num: usize) -> Result<RawInput, AssessError> {
        let line = std::str::from_utf8(bytes).map_err(|e| AssessError::InvalidInput {
            field: format!("line {}", line_num),
            reason: e.to_string(),
        })?;
        Self::parse_line(line.trim(), line_num)
    }

    /// Range-check a batch, returning only the failing records
    pub fn validate_records(inputs: &[RawInput]) -> Vec<ValidationResult> {
        inputs
            .iter()
            .enumerate()
            .filter_map(|(idx, input)| {
                input.validate().err().map(|error| ValidationResult { index: idx, error })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub error: AssessError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ndjson() {
        let ndjson = "{\"age\": 50, \"cp\": 1}\n\n{\"age\": 61, \"thal\": 2}\n";
        let inputs = InputAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[1].age, Some(61));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"age\": 50}\n{\"age\": \n";
        match InputAdapter::parse_ndjson(ndjson) {
            Err(AssessError::InvalidInput { field, .. }) => assert_eq!(field, "line 2"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_line_rejects_invalid_utf8() {
        match InputAdapter::decode_line(b"{\"age\": \"\xff\"}", 2) {
            Err(e @ AssessError::InvalidInput { .. }) => {
                assert!(e.is_client_error());
                assert!(e.to_string().contains("line 2"));
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }

        let input = InputAdapter::decode_line(b"  {\"age\": 61}\r", 3).unwrap();
        assert_eq!(input.age, Some(61));
    }

    #[test]
    fn test_parse_array() {
        let inputs = InputAdapter::parse_array(r#"[{"age": 40}, {"sex": 1}]"#).unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(InputAdapter::parse_array("not json").is_err());
    }

    #[test]
    fn test_validate_records() {
        let inputs = vec![
            RawInput {
                age: Some(45),
                ..Default::default()
            },
            RawInput {
                cholesterol: Some(900),
                ..Default::default()
            },
        ];

        let failures = InputAdapter::validate_records(&inputs);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        assert!(failures[0].error.is_client_error());
    }
}
