//! Integration tests for the `check` command.

mod common;

use common::{check_stdout, fieldexpr, survey_file};
use expect_test::expect;
use predicates::prelude::*;

#[test]
fn check_constant_expression() {
    check_stdout(
        &["check", "1 + 2"],
        expect![[r#"
            OK
            entity types: -
            result entity types: -
            fields: -
            variables: -
            constant: 3
        "#]],
    );
}

#[test]
fn check_blank_expression() {
    fieldexpr()
        .args(["check", "  "])
        .assert()
        .success()
        .stdout("OK (blank)\n");
}

#[test]
fn check_reports_dependencies() {
    let survey = survey_file();
    fieldexpr()
        .args(["check", "--survey", survey.path().to_str().unwrap()])
        .args(["--boolean", "Fan and result.brand > 1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entity types: Brand\n"))
        .stdout(predicate::str::contains("result entity types: Brand\n"))
        .stdout(predicate::str::contains("variables: Fan\n"))
        .stdout(predicate::str::contains("Aware"))
        .stdout(predicate::str::contains("constant").not());
}

#[test]
fn check_syntax_error() {
    fieldexpr()
        .args(["--no-color", "check", "1 + ) 2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[P001] Error"))
        .stderr(predicate::str::contains("<expression>:1:5"));
}

#[test]
fn check_unknown_identifiers() {
    fieldexpr()
        .args(["check", "--no-color", "foo + bar"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with(
            "Errors in metric variable expression:\n",
        ))
        .stderr(predicate::str::contains("Unknown identifier 'foo'"))
        .stderr(predicate::str::contains("Unknown identifier 'bar'"));
}

#[test]
fn check_no_color_has_no_escapes() {
    fieldexpr()
        .args(["check", "--no-color", "foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\x1b[").not());
}

#[test]
fn check_missing_survey_file() {
    fieldexpr()
        .args(["check", "--survey", "/nonexistent/survey.json", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: could not read"));
}

#[test]
fn check_bad_variable_in_survey() {
    let survey = common::temp_file(
        r#"{ "variables": [{ "name": "Broken", "expression": "Missing * 2" }] }"#,
    );
    fieldexpr()
        .args(["--no-color", "check", "--survey", survey.path().to_str().unwrap(), "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Errors in variable 'Broken':"))
        .stderr(predicate::str::contains("Unknown identifier 'Missing'"));
}
