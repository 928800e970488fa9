//! Structural matching of expected against actual values.
//!
//! Both trees are walked together while tracking the current [`Path`]. At each
//! path the most specific matching rule applies; without one, the default is
//! equality:
//!
//! - scalars must be equal (numbers by value) and of the same kind
//! - sequences must have the same length and match index by index
//! - mappings must contain every expected key; extra actual keys are tolerated
//!   unless [`MatchingConfig::strict`] is used
//!
//! A `type` rule on a container cascades: values are ignored in the whole
//! subtree, while structure and kinds are still checked, until a more specific
//! rule takes over.
//!
//! Every mismatch is collected; matching never stops at the first one.

use crate::path::Path;
use crate::rules::{MatchingRule, RuleEntry, RuleLogic, RuleSet};
use crate::value::{Scalar, Value, ValueKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Category of a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Same kind, different value (or a bound/include violation)
    Mismatch,
    /// Different runtime category
    TypeMismatch,
    /// Expected key or element absent from the actual value
    MissingKey,
    /// Actual key or element not allowed by the expectation
    ExtraKey,
    /// Scalar text does not match the rule's pattern
    RegexMismatch,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mismatch => "Mismatch",
            Self::TypeMismatch => "TypeMismatch",
            Self::MissingKey => "MissingKey",
            Self::ExtraKey => "ExtraKey",
            Self::RegexMismatch => "RegexMismatch",
        };
        f.write_str(name)
    }
}

/// One difference between expected and actual values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Location of the difference, e.g. `$.song`
    pub path: String,
    /// Category
    pub kind: MismatchKind,
    /// Expected value at the path, absent for extra keys
    pub expected: Option<Value>,
    /// Actual value at the path, absent for missing keys
    pub actual: Option<Value>,
    /// Human-readable explanation
    pub description: String,
}

/// Matching behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingConfig {
    /// Tolerate actual mapping keys the expectation does not mention
    pub allow_unexpected_keys: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            allow_unexpected_keys: true,
        }
    }
}

impl MatchingConfig {
    /// Report unexpected mapping keys as [`MismatchKind::ExtraKey`].
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            allow_unexpected_keys: false,
        }
    }
}

/// Match `actual` against `expected` under `rules` with the default config.
///
/// Returns an empty vector for a perfect match.
#[must_use]
pub fn match_value(expected: &Value, actual: &Value, rules: &RuleSet) -> Vec<MatchResult> {
    match_value_with(expected, actual, rules, &MatchingConfig::default())
}

/// Match `actual` against `expected` under `rules` and `config`.
#[must_use]
pub fn match_value_with(
    expected: &Value,
    actual: &Value,
    rules: &RuleSet,
    config: &MatchingConfig,
) -> Vec<MatchResult> {
    let matcher = Matcher { rules, config };
    let mut mismatches = Vec::new();
    matcher.compare(expected, actual, &Path::root(), false, &mut mismatches);
    mismatches
}

struct Matcher<'a> {
    rules: &'a RuleSet,
    config: &'a MatchingConfig,
}

impl Matcher<'_> {
    /// `by_type` is set inside the subtree of a cascading `type` rule.
    fn compare(
        &self,
        expected: &Value,
        actual: &Value,
        path: &Path,
        by_type: bool,
        out: &mut Vec<MatchResult>,
    ) {
        if let Some(entry) = self.rules.lookup(path) {
            self.apply_entry(entry, expected, actual, path, out);
        } else if by_type {
            self.compare_type(expected, actual, path, None, None, out);
        } else {
            self.compare_default(expected, actual, path, out);
        }
    }

    fn apply_entry(
        &self,
        entry: &RuleEntry,
        expected: &Value,
        actual: &Value,
        path: &Path,
        out: &mut Vec<MatchResult>,
    ) {
        match entry.logic() {
            RuleLogic::And => {
                for rule in entry.rules() {
                    self.apply_rule(rule, expected, actual, path, out);
                }
            }
            RuleLogic::Or => {
                let mut failures = Vec::new();
                for rule in entry.rules() {
                    let mut attempt = Vec::new();
                    self.apply_rule(rule, expected, actual, path, &mut attempt);
                    if attempt.is_empty() {
                        return;
                    }
                    failures.extend(attempt);
                }
                out.extend(failures);
            }
        }
    }

    fn apply_rule(
        &self,
        rule: &MatchingRule,
        expected: &Value,
        actual: &Value,
        path: &Path,
        out: &mut Vec<MatchResult>,
    ) {
        match rule {
            MatchingRule::Equality => self.compare_default(expected, actual, path, out),
            MatchingRule::Type { min, max } => {
                self.compare_type(expected, actual, path, *min, *max, out);
            }
            MatchingRule::Regex(re) => match scalar_text(actual) {
                Some(text) if re.is_match(&text) => {}
                Some(text) => out.push(mismatch(
                    path,
                    MismatchKind::RegexMismatch,
                    expected,
                    actual,
                    format!("Expected '{text}' to match regex '{}'", re.as_str()),
                )),
                None => out.push(type_mismatch(path, ValueKind::String, expected, actual)),
            },
            MatchingRule::Include(needle) => match actual.as_str() {
                Some(text) if text.contains(needle.as_str()) => {}
                Some(text) => out.push(mismatch(
                    path,
                    MismatchKind::Mismatch,
                    expected,
                    actual,
                    format!("Expected '{text}' to include '{needle}'"),
                )),
                None => out.push(type_mismatch(path, ValueKind::String, expected, actual)),
            },
            MatchingRule::Integer => match actual {
                Value::Scalar(Scalar::Number(n)) if n.is_i64() || n.is_u64() => {}
                Value::Scalar(Scalar::Number(n)) => out.push(mismatch(
                    path,
                    MismatchKind::Mismatch,
                    expected,
                    actual,
                    format!("Expected an integer but got {n}"),
                )),
                _ => out.push(type_mismatch(path, ValueKind::Number, expected, actual)),
            },
            MatchingRule::Decimal => match actual {
                Value::Scalar(Scalar::Number(n)) if n.is_f64() => {}
                Value::Scalar(Scalar::Number(n)) => out.push(mismatch(
                    path,
                    MismatchKind::Mismatch,
                    expected,
                    actual,
                    format!("Expected a decimal but got {n}"),
                )),
                _ => out.push(type_mismatch(path, ValueKind::Number, expected, actual)),
            },
            MatchingRule::Number => {
                if actual.kind() != ValueKind::Number {
                    out.push(type_mismatch(path, ValueKind::Number, expected, actual));
                }
            }
            MatchingRule::Boolean => {
                if actual.kind() != ValueKind::Bool {
                    out.push(type_mismatch(path, ValueKind::Bool, expected, actual));
                }
            }
        }
    }

    fn compare_default(
        &self,
        expected: &Value,
        actual: &Value,
        path: &Path,
        out: &mut Vec<MatchResult>,
    ) {
        match (expected, actual) {
            (Value::Scalar(e), Value::Scalar(a)) => {
                if e.kind() != a.kind() {
                    out.push(type_mismatch(path, e.kind(), expected, actual));
                } else if e != a {
                    out.push(mismatch(
                        path,
                        MismatchKind::Mismatch,
                        expected,
                        actual,
                        format!("Expected {expected} but received {actual}"),
                    ));
                }
            }
            (Value::Sequence(e), Value::Sequence(a)) => {
                for index in 0..e.len().max(a.len()) {
                    let child = path.index(index);
                    match (e.get(index), a.get(index)) {
                        (Some(ev), Some(av)) => self.compare(ev, av, &child, false, out),
                        (Some(ev), None) => out.push(missing(&child, ev)),
                        (None, Some(av)) => out.push(extra(&child, av, "element")),
                        (None, None) => {}
                    }
                }
            }
            (Value::Mapping(e), Value::Mapping(a)) => self.compare_mapping(e, a, path, false, out),
            _ => out.push(type_mismatch(path, expected.kind(), expected, actual)),
        }
    }

    fn compare_type(
        &self,
        expected: &Value,
        actual: &Value,
        path: &Path,
        min: Option<usize>,
        max: Option<usize>,
        out: &mut Vec<MatchResult>,
    ) {
        if expected.kind() != actual.kind() {
            out.push(type_mismatch(path, expected.kind(), expected, actual));
            return;
        }
        match (expected, actual) {
            (Value::Sequence(e), Value::Sequence(a)) => {
                let received = a.len();
                if let Some(min) = min.filter(|min| received < *min) {
                    out.push(mismatch(
                        path,
                        MismatchKind::Mismatch,
                        expected,
                        actual,
                        format!("Expected at least {min} element(s) but received {received}"),
                    ));
                }
                if let Some(max) = max.filter(|max| received > *max) {
                    out.push(mismatch(
                        path,
                        MismatchKind::Mismatch,
                        expected,
                        actual,
                        format!("Expected at most {max} element(s) but received {received}"),
                    ));
                }
                for (index, av) in a.iter().enumerate() {
                    if let Some(template) = e.get(index).or_else(|| e.first()) {
                        self.compare(template, av, &path.index(index), true, out);
                    }
                }
            }
            (Value::Mapping(e), Value::Mapping(a)) => self.compare_mapping(e, a, path, true, out),
            _ => {}
        }
    }

    fn compare_mapping(
        &self,
        expected: &BTreeMap<String, Value>,
        actual: &BTreeMap<String, Value>,
        path: &Path,
        by_type: bool,
        out: &mut Vec<MatchResult>,
    ) {
        for (key, ev) in expected {
            let child = path.field(key);
            match actual.get(key) {
                Some(av) => self.compare(ev, av, &child, by_type, out),
                None => out.push(missing(&child, ev)),
            }
        }
        if !self.config.allow_unexpected_keys {
            for (key, av) in actual {
                if !expected.contains_key(key) {
                    out.push(extra(&path.field(key), av, "key"));
                }
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Scalar(scalar) => scalar.as_text(),
        _ => None,
    }
}

fn mismatch(
    path: &Path,
    kind: MismatchKind,
    expected: &Value,
    actual: &Value,
    description: String,
) -> MatchResult {
    MatchResult {
        path: path.to_string(),
        kind,
        expected: Some(expected.clone()),
        actual: Some(actual.clone()),
        description,
    }
}

fn type_mismatch(path: &Path, wanted: ValueKind, expected: &Value, actual: &Value) -> MatchResult {
    let found = actual.kind();
    mismatch(
        path,
        MismatchKind::TypeMismatch,
        expected,
        actual,
        format!("Expected a {wanted} but received a {found} ({actual})"),
    )
}

fn missing(path: &Path, expected: &Value) -> MatchResult {
    MatchResult {
        path: path.to_string(),
        kind: MismatchKind::MissingKey,
        expected: Some(expected.clone()),
        actual: None,
        description: format!("Expected {expected} at {path} but it was missing"),
    }
}

fn extra(path: &Path, actual: &Value, what: &str) -> MatchResult {
    MatchResult {
        path: path.to_string(),
        kind: MismatchKind::ExtraKey,
        expected: None,
        actual: Some(actual.clone()),
        description: format!("Unexpected {what} {path} with value {actual}"),
    }
}
