//! Matching rules.
//!
//! Rules relax exact equality at specific paths. They are declared in the
//! `matchingRules` block of a message, either as a flat map of `$`-rooted
//! paths (applied to the message contents) or split into `body`/`content` and
//! `metadata` categories. Each path maps to one of:
//!
//! - a shorthand string: `"type"`, `"regex:^Hello"`, `"min:1"`, ...
//! - a matcher object: `{"match": "type", "min": 1}`, `{"regex": "^\\d+$"}`
//! - a matcher list: `{"matchers": [...], "combine": "AND"}`
//!
//! Matcher objects may carry `"eachElement": true` to apply to every child of
//! the path instead of the path itself.

use crate::error::ParseError;
use crate::path::{Path, PathPattern};
use regex::Regex;
use serde_json::Value as Json;
use std::fmt;
use tracing::debug;

/// A single matching rule.
#[derive(Debug, Clone)]
pub enum MatchingRule {
    /// Exact equality (the default)
    Equality,
    /// Same runtime category; values ignored. Bounds apply to sequences.
    Type {
        /// Minimum sequence length
        min: Option<usize>,
        /// Maximum sequence length
        max: Option<usize>,
    },
    /// Scalar text must match the pattern
    Regex(Regex),
    /// String must contain the value
    Include(String),
    /// Number without a fractional representation
    Integer,
    /// Number with a fractional representation
    Decimal,
    /// Any number
    Number,
    /// Any boolean
    Boolean,
}

impl PartialEq for MatchingRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            (Self::Type { min: a, max: b }, Self::Type { min: c, max: d }) => a == c && b == d,
            (Self::Include(a), Self::Include(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equality => f.write_str("equality"),
            Self::Type { min: None, max: None } => f.write_str("type"),
            Self::Type { min, max } => {
                f.write_str("type(")?;
                if let Some(min) = min {
                    write!(f, "min={min}")?;
                }
                if min.is_some() && max.is_some() {
                    f.write_str(", ")?;
                }
                if let Some(max) = max {
                    write!(f, "max={max}")?;
                }
                f.write_str(")")
            }
            Self::Regex(re) => write!(f, "regex '{}'", re.as_str()),
            Self::Include(value) => write!(f, "include '{value}'"),
            Self::Integer => f.write_str("integer"),
            Self::Decimal => f.write_str("decimal"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
        }
    }
}

/// How several rules declared at one path combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleLogic {
    /// Every rule must pass
    #[default]
    And,
    /// At least one rule must pass
    Or,
}

/// Rules declared under one path pattern.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pattern: PathPattern,
    rules: Vec<MatchingRule>,
    logic: RuleLogic,
}

impl RuleEntry {
    /// Path pattern the rules apply to.
    #[must_use]
    pub const fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Rules at this path.
    #[must_use]
    pub fn rules(&self) -> &[MatchingRule] {
        &self.rules
    }

    /// Combination logic.
    #[must_use]
    pub const fn logic(&self) -> RuleLogic {
        self.logic
    }
}

/// Rules for one value (message contents or metadata).
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    entries: Vec<RuleEntry>,
}

impl RuleSet {
    /// Create an empty rule set; every path falls back to equality.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add rules under a pattern.
    pub fn push(&mut self, pattern: PathPattern, rules: Vec<MatchingRule>, logic: RuleLogic) {
        self.entries.push(RuleEntry {
            pattern,
            rules,
            logic,
        });
    }

    /// Number of declared entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no rules are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most specific entry whose pattern matches `path`.
    ///
    /// On equal specificity the entry declared first wins.
    #[must_use]
    pub fn lookup(&self, path: &Path) -> Option<&RuleEntry> {
        let mut best: Option<(u32, &RuleEntry)> = None;
        for entry in &self.entries {
            if let Some(weight) = entry.pattern.weight(path) {
                if best.is_none_or(|(current, _)| weight > current) {
                    best = Some((weight, entry));
                }
            }
        }
        best.map(|(_, entry)| entry)
    }

    /// Parse a map of path expression to rule definition.
    ///
    /// Keys that do not start with `$` are taken as a single top-level field
    /// name, which is how metadata rules are usually keyed.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidMatchingRule`] for bad paths, unknown
    /// matchers or invalid regular expressions.
    pub fn from_json(value: &Json) -> Result<Self, ParseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ParseError::malformed("matching rules must be an object"))?;

        let mut set = Self::new();
        for (key, spec) in obj {
            let pattern = if key.starts_with('$') {
                PathPattern::parse(key).map_err(|reason| ParseError::invalid_rule(key, reason))?
            } else {
                PathPattern::field(key.as_str())
            };
            let (rules, logic, each_element) = parse_rule_spec(key, spec)?;
            let pattern = if each_element { pattern.each_element() } else { pattern };
            set.push(pattern, rules, logic);
        }
        Ok(set)
    }

    fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }
}

/// Content and metadata rules of one message.
#[derive(Debug, Clone, Default)]
pub struct MessageRules {
    /// Rules applied to the message contents
    pub content: RuleSet,
    /// Rules applied to the message metadata
    pub metadata: RuleSet,
}

impl MessageRules {
    /// Parse a message's `matchingRules` block.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the block or any rule in it is invalid.
    pub fn from_json(value: &Json) -> Result<Self, ParseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ParseError::malformed("matchingRules must be an object"))?;

        let categorised = obj
            .keys()
            .any(|k| matches!(k.as_str(), "body" | "content" | "metadata"));
        if !categorised {
            return Ok(Self {
                content: RuleSet::from_json(value)?,
                metadata: RuleSet::new(),
            });
        }

        let mut rules = Self::default();
        for (category, category_rules) in obj {
            match category.as_str() {
                "body" | "content" => rules.content.extend(RuleSet::from_json(category_rules)?),
                "metadata" => rules.metadata.extend(RuleSet::from_json(category_rules)?),
                other => {
                    debug!(category = other, "ignoring matching rules for unsupported category");
                }
            }
        }
        Ok(rules)
    }
}

fn parse_rule_spec(
    path: &str,
    spec: &Json,
) -> Result<(Vec<MatchingRule>, RuleLogic, bool), ParseError> {
    match spec {
        Json::String(shorthand) => {
            let rule = parse_shorthand(path, shorthand)?;
            Ok((vec![rule], RuleLogic::And, false))
        }
        Json::Object(obj) => {
            let each_element = obj
                .get("eachElement")
                .and_then(Json::as_bool)
                .unwrap_or(false);
            let Some(matchers) = obj.get("matchers") else {
                return Ok((vec![parse_matcher(path, spec)?], RuleLogic::And, each_element));
            };

            let list = matchers
                .as_array()
                .ok_or_else(|| ParseError::invalid_rule(path, "'matchers' must be an array"))?;
            if list.is_empty() {
                return Err(ParseError::invalid_rule(path, "'matchers' is empty"));
            }
            let logic = match obj.get("combine").and_then(Json::as_str) {
                None | Some("AND") => RuleLogic::And,
                Some("OR") => RuleLogic::Or,
                Some(other) => {
                    let reason = format!("unknown combine '{other}'");
                    return Err(ParseError::invalid_rule(path, reason));
                }
            };
            let rules = list
                .iter()
                .map(|matcher| parse_matcher(path, matcher))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((rules, logic, each_element))
        }
        _ => Err(ParseError::invalid_rule(path, "rule must be a string or an object")),
    }
}

fn parse_matcher(path: &str, matcher: &Json) -> Result<MatchingRule, ParseError> {
    let obj = match matcher {
        Json::String(shorthand) => return parse_shorthand(path, shorthand),
        Json::Object(obj) => obj,
        _ => return Err(ParseError::invalid_rule(path, "matcher must be a string or an object")),
    };

    let min = bound(path, obj, "min")?;
    let max = bound(path, obj, "max")?;
    let string_field = |name: &str| {
        obj.get(name)
            .and_then(Json::as_str)
            .ok_or_else(|| ParseError::invalid_rule(path, format!("'{name}' must be a string")))
    };

    match obj.get("match").and_then(Json::as_str) {
        Some("type" | "min" | "max") => Ok(MatchingRule::Type { min, max }),
        Some("equality") => Ok(MatchingRule::Equality),
        Some("regex") => compile_regex(path, string_field("regex")?),
        Some("include") => Ok(MatchingRule::Include(string_field("value")?.to_string())),
        Some("integer") => Ok(MatchingRule::Integer),
        Some("decimal") => Ok(MatchingRule::Decimal),
        Some("number") => Ok(MatchingRule::Number),
        Some("boolean") => Ok(MatchingRule::Boolean),
        Some(other) => Err(ParseError::invalid_rule(path, format!("unknown matcher '{other}'"))),
        None if obj.contains_key("regex") => compile_regex(path, string_field("regex")?),
        None if min.is_some() || max.is_some() => Ok(MatchingRule::Type { min, max }),
        None => Err(ParseError::invalid_rule(path, "matcher has no 'match' field")),
    }
}

fn bound(
    path: &str,
    obj: &serde_json::Map<String, Json>,
    name: &str,
) -> Result<Option<usize>, ParseError> {
    obj.get(name)
        .map(|v| {
            v.as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    let reason = format!("'{name}' must be a non-negative integer");
                    ParseError::invalid_rule(path, reason)
                })
        })
        .transpose()
}

fn parse_shorthand(path: &str, shorthand: &str) -> Result<MatchingRule, ParseError> {
    let (name, arg) = match shorthand.split_once(':') {
        Some((name, arg)) => (name.trim(), Some(arg)),
        None => (shorthand.trim(), None),
    };
    let length = |arg: &str| {
        arg.trim()
            .parse::<usize>()
            .map_err(|e| ParseError::invalid_rule(path, format!("bad length '{arg}': {e}")))
    };

    match (name, arg) {
        ("equality", None) => Ok(MatchingRule::Equality),
        ("type", None) => Ok(MatchingRule::Type { min: None, max: None }),
        ("regex", Some(pattern)) => compile_regex(path, pattern),
        ("include", Some(value)) => Ok(MatchingRule::Include(value.to_string())),
        ("integer", None) => Ok(MatchingRule::Integer),
        ("decimal", None) => Ok(MatchingRule::Decimal),
        ("number", None) => Ok(MatchingRule::Number),
        ("boolean", None) => Ok(MatchingRule::Boolean),
        ("min", Some(n)) => Ok(MatchingRule::Type { min: Some(length(n)?), max: None }),
        ("max", Some(n)) => Ok(MatchingRule::Type { min: None, max: Some(length(n)?) }),
        _ => Err(ParseError::invalid_rule(path, format!("unknown rule '{shorthand}'"))),
    }
}

fn compile_regex(path: &str, pattern: &str) -> Result<MatchingRule, ParseError> {
    Regex::new(pattern)
        .map(MatchingRule::Regex)
        .map_err(|e| ParseError::invalid_rule(path, format!("invalid regex '{pattern}': {e}")))
}
