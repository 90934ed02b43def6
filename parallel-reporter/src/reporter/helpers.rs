// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalization of runner-provided values into display strings.

use crate::events::{ErrorPayload, ErrorValue};
use camino::Utf8Path;
use itertools::Itertools;
use parallel_report_metadata::TestError;
use regex::Regex;
use serde_json::Value;
use std::{fmt, sync::LazyLock};

/// Assertion libraries prefix the interesting part of their diff output with this marker.
const ASSERTION_MARKER: &str = "[1] \"";

pub(crate) const NO_MESSAGE: &str = "No error message available";
pub(crate) const NO_STACK: &str = "No stack trace available";
pub(crate) const NOT_AVAILABLE: &str = "Not Available/Applicable";

/// Arrays and objects with at least this many entries are shown as a placeholder.
const MAX_DISPLAYED_ENTRIES: usize = 20;
const OBJECT_PLACEHOLDER: &str = "{ object }";
const SECRET_PLACEHOLDER: &str = "<secret>";
const SECRET_KEY: &str = "_secret";
const SECRET_STRING_PREFIX: &str = "{\"_secret\":\"";

// Bracket remnants such as `[31m` left behind once the escape character itself is gone.
static ANSI_REMNANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d{1,3}(;\d{1,3})*m").expect("ANSI remnant regex is valid"));

/// Builds an error snapshot from a runner error payload.
pub(crate) fn resolve_error(payload: &ErrorPayload, file: &str, test_name: &str) -> TestError {
    TestError {
        stack: format_stack(payload.stack.as_deref()),
        message: format_error_message(payload.message.as_deref()),
        actual: format_error_value(payload.actual.as_ref()),
        expected: format_error_value(payload.expected.as_ref()),
        file: file.to_owned(),
        test_name: test_name.to_owned(),
    }
}

pub(crate) fn format_error_message(message: Option<&str>) -> String {
    let Some(message) = message else {
        return NO_MESSAGE.to_owned();
    };
    let message = match message.find(ASSERTION_MARKER) {
        Some(index) => &message[index..],
        None => message,
    };
    strip_terminal_codes(message).trim().to_owned()
}

pub(crate) fn format_stack(stack: Option<&str>) -> String {
    match stack {
        Some(stack) => strip_terminal_codes(stack).trim().to_owned(),
        None => NO_STACK.to_owned(),
    }
}

/// Renders the actual or expected value of an assertion.
pub fn format_error_value(value: Option<&ErrorValue>) -> String {
    match value {
        None | Some(ErrorValue::Value(Value::Null)) => NOT_AVAILABLE.to_owned(),
        Some(ErrorValue::Pattern { pattern, flags }) => format!("/{pattern}/{flags}"),
        Some(ErrorValue::Value(Value::String(s))) => s.clone(),
        Some(ErrorValue::Value(other)) => {
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        }
    }
}

/// Removes terminal escape sequences and control characters other than newlines.
///
/// Tabs become single spaces.
pub(crate) fn strip_terminal_codes(input: &str) -> String {
    // strip_str drops tabs along with the other control characters.
    let stripped = strip_ansi_escapes::strip_str(input.replace('\t', " "));
    let stripped = ANSI_REMNANT.replace_all(&stripped, "");
    stripped
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect()
}

/// Returns `path` relative to `root`, or `path` unchanged if it is not under `root`.
pub(crate) fn relative_to(root: &Utf8Path, path: &str) -> String {
    if root.as_str().is_empty() {
        return path.to_owned();
    }
    match Utf8Path::new(path).strip_prefix(root) {
        Ok(relative) => relative.as_str().to_owned(),
        Err(_) => path.to_owned(),
    }
}

/// A step argument, classified for display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepArgument<'a> {
    /// A number, shown as-is.
    Number(&'a serde_json::Number),
    /// A boolean, shown as-is.
    Boolean(bool),
    /// An array or object.
    Object(&'a Value),
    /// A value marked as secret, never shown.
    Secret,
    /// A string, shown quoted.
    Text(&'a str),
    /// A null value.
    Null,
}

impl<'a> StepArgument<'a> {
    /// Classifies a raw JSON argument.
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(*b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) if s.starts_with(SECRET_STRING_PREFIX) => Self::Secret,
            Value::String(s) => Self::Text(s),
            Value::Object(map) if map.contains_key(SECRET_KEY) => Self::Secret,
            Value::Array(_) | Value::Object(_) => Self::Object(value),
        }
    }
}

impl fmt::Display for StepArgument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Object(value) => {
                let entries = match value {
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    _ => 0,
                };
                if entries >= MAX_DISPLAYED_ENTRIES {
                    return f.write_str(OBJECT_PLACEHOLDER);
                }
                match serde_json::to_string_pretty(value) {
                    Ok(pretty) => f.write_str(&pretty),
                    Err(_) => f.write_str(OBJECT_PLACEHOLDER),
                }
            }
            Self::Secret => f.write_str(SECRET_PLACEHOLDER),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Formats a step's arguments as a single display string.
pub fn format_step_args(args: &[Value]) -> String {
    args.iter().map(StepArgument::classify).join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(42), "42" ; "integer")]
    #[test_case(json!(1.5), "1.5" ; "float")]
    #[test_case(json!(true), "true" ; "boolean")]
    #[test_case(json!(null), "null" ; "null")]
    #[test_case(json!("/users"), "'/users'" ; "string")]
    #[test_case(json!({"_secret": "hunter2"}), "<secret>" ; "secret object")]
    #[test_case(json!("{\"_secret\":\"hunter2\"}"), "<secret>" ; "secret string")]
    #[test_case(json!({"a": 1}), "{\n  \"a\": 1\n}" ; "small object")]
    #[test_case(json!([]), "[]" ; "empty array")]
    fn step_argument_display(value: Value, expected: &str) {
        assert_eq!(StepArgument::classify(&value).to_string(), expected);
    }

    #[test]
    fn large_objects_are_elided() {
        let array = Value::Array((0..20).map(|i| json!(i)).collect());
        assert_eq!(StepArgument::classify(&array).to_string(), "{ object }");

        let array = Value::Array((0..19).map(|i| json!(i)).collect());
        assert_ne!(StepArgument::classify(&array).to_string(), "{ object }");

        let object: serde_json::Map<_, _> = (0..25).map(|i| (format!("k{i}"), json!(i))).collect();
        assert_eq!(
            StepArgument::classify(&Value::Object(object)).to_string(),
            "{ object }"
        );
    }

    #[test]
    fn step_args_are_joined() {
        assert_eq!(
            format_step_args(&[json!("/users"), json!(200), json!({"_secret": "x"})]),
            "'/users', 200, <secret>"
        );
        assert_eq!(format_step_args(&[]), "");
    }

    #[test_case(None, "No error message available" ; "absent")]
    #[test_case(Some("plain failure"), "plain failure" ; "plain")]
    #[test_case(
        Some("expected values to match\n\n[1] \"foo\"\n[2] \"bar\""),
        "[1] \"foo\"\n[2] \"bar\""
        ; "assertion marker"
    )]
    #[test_case(Some("\u{1b}[31mred\u{1b}[39m text"), "red text" ; "ansi escapes")]
    #[test_case(Some("[32mgreen[39m text"), "green text" ; "ansi remnants")]
    fn error_message_normalization(input: Option<&str>, expected: &str) {
        assert_eq!(format_error_message(input), expected);
    }

    #[test]
    fn error_value_normalization() {
        assert_eq!(format_error_value(None), "Not Available/Applicable");
        assert_eq!(
            format_error_value(Some(&ErrorValue::Value(Value::Null))),
            "Not Available/Applicable"
        );
        assert_eq!(
            format_error_value(Some(&ErrorValue::Value(json!("text")))),
            "text"
        );
        assert_eq!(
            format_error_value(Some(&ErrorValue::Value(json!({"id": 1})))),
            "{\n  \"id\": 1\n}"
        );
        assert_eq!(
            format_error_value(Some(&ErrorValue::Pattern {
                pattern: "^a+$".to_owned(),
                flags: "i".to_owned(),
            })),
            "/^a+$/i"
        );
    }

    #[test]
    fn resolve_error_fills_defaults() {
        let error = resolve_error(&ErrorPayload::default(), "tests/a.ts", "logs in");
        assert_eq!(
            error,
            TestError {
                stack: "No stack trace available".to_owned(),
                message: "No error message available".to_owned(),
                actual: "Not Available/Applicable".to_owned(),
                expected: "Not Available/Applicable".to_owned(),
                file: "tests/a.ts".to_owned(),
                test_name: "logs in".to_owned(),
            }
        );
    }

    #[test]
    fn stack_is_stripped() {
        assert_eq!(
            format_stack(Some("\u{1b}[2mat foo (a.ts:1:1)\u{1b}[22m\r\n    at bar")),
            "at foo (a.ts:1:1)\n    at bar"
        );
    }

    #[test]
    fn stack_is_trimmed_and_tabs_are_kept_as_spaces() {
        assert_eq!(
            format_stack(Some("\n  Error:\tboom\n\tat foo (a.ts:1:1)\u{7}\n\n")),
            "Error: boom\n at foo (a.ts:1:1)"
        );
        assert_eq!(strip_terminal_codes("expected\tvalue"), "expected value");
    }

    #[test_case("/work", "/work/tests/a.ts", "tests/a.ts" ; "under root")]
    #[test_case("/work", "/elsewhere/a.ts", "/elsewhere/a.ts" ; "outside root")]
    #[test_case("/work", "tests/a.ts", "tests/a.ts" ; "already relative")]
    #[test_case("", "/work/a.ts", "/work/a.ts" ; "empty root")]
    fn relative_paths(root: &str, path: &str, expected: &str) {
        assert_eq!(relative_to(Utf8Path::new(root), path), expected);
    }
}
