//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use expect_test::Expect;
use std::io::Write;

/// Three brands, three respondents. Respondent 1 knows brands 1 and 3,
/// respondent 2 is under age and knows brand 2, respondent 3 knows none.
pub const SURVEY: &str = r#"{
  "entity_types": { "Brand": [1, 2, 3] },
  "fields": [
    { "name": "Aware", "entity_types": ["Brand"] },
    { "name": "Age" }
  ],
  "variables": [
    { "name": "Fan", "expression": "Aware == 1 and Age >= 18" }
  ],
  "respondents": [
    { "id": 1, "answers": [
      { "field": "Age", "value": 30 },
      { "field": "Aware", "context": { "Brand": 1 }, "value": 1 },
      { "field": "Aware", "context": { "Brand": 3 }, "value": 1 }
    ] },
    { "id": 2, "answers": [
      { "field": "Age", "value": 16 },
      { "field": "Aware", "context": { "Brand": 2 }, "value": 1 }
    ] },
    { "id": 3, "answers": [
      { "field": "Age", "value": 45 }
    ] }
  ]
}"#;

/// Create a new command for the fieldexpr binary.
pub fn fieldexpr() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fieldexpr"))
}

/// Create a temporary file with the given content.
pub fn temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// The sample survey written to a temporary file.
pub fn survey_file() -> tempfile::NamedTempFile {
    temp_file(SURVEY)
}

/// Run a command and check that stdout matches the expected output.
pub fn check_stdout(args: &[&str], expected: Expect) {
    let output = fieldexpr()
        .args(args)
        .output()
        .expect("failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);
    expected.assert_eq(&stdout);
}

/// Run a command and check that stderr matches the expected output.
pub fn check_stderr(args: &[&str], expected: Expect) {
    let output = fieldexpr()
        .args(args)
        .output()
        .expect("failed to execute command");
    let stderr = String::from_utf8_lossy(&output.stderr);
    expected.assert_eq(&stderr);
}
