//! Path expressions.
//!
//! [`Path`] is a concrete location inside a value, tracked while matching and
//! printed in mismatch reports (`$.items[0].name`). [`PathPattern`] is the
//! parsed form of a matching rule key and may contain wildcards
//! (`$.items[*].name`, `$.headers.*`).

use std::fmt;
use std::str::FromStr;

/// One step of a concrete path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    /// Mapping key
    Field(String),
    /// Sequence index
    Index(usize),
}

/// Concrete path from the root of a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    tokens: Vec<PathToken>,
}

impl Path {
    /// The root path `$`.
    #[must_use]
    pub const fn root() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Child path for a mapping key.
    #[must_use]
    pub fn field(&self, key: &str) -> Self {
        self.child(PathToken::Field(key.to_string()))
    }

    /// Child path for a sequence index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(PathToken::Index(index))
    }

    /// Steps from the root.
    #[must_use]
    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    fn child(&self, token: PathToken) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(token);
        Self { tokens }
    }
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn write_field(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    if !key.is_empty() && key.chars().all(is_field_char) {
        write!(f, ".{key}")
    } else {
        write!(f, "['{key}']")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for token in &self.tokens {
            match token {
                PathToken::Field(key) => write_field(f, key)?,
                PathToken::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// One step of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    /// Exact mapping key
    Field(String),
    /// Exact sequence index
    Index(usize),
    /// Any key or index
    Wildcard,
}

/// Parsed matching rule path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Parse a `$`-rooted path expression.
    ///
    /// # Errors
    ///
    /// Returns a description of the first syntax problem found.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let trimmed = expr.trim();
        let rest = trimmed
            .strip_prefix('$')
            .ok_or_else(|| format!("path '{trimmed}' must start with '$'"))?;
        let chars: Vec<char> = rest.chars().collect();
        let mut segments = Vec::new();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    pos += 1;
                    if chars.get(pos) == Some(&'*') {
                        pos += 1;
                        segments.push(PatternSegment::Wildcard);
                        continue;
                    }
                    let start = pos;
                    while pos < chars.len() && is_field_char(chars[pos]) {
                        pos += 1;
                    }
                    if start == pos {
                        return Err(format!("empty field name at offset {}", start + 1));
                    }
                    segments.push(PatternSegment::Field(chars[start..pos].iter().collect()));
                }
                '[' => {
                    pos += 1;
                    match chars.get(pos).copied() {
                        Some('*') => {
                            pos += 1;
                            segments.push(PatternSegment::Wildcard);
                        }
                        Some(quote @ ('\'' | '"')) => {
                            pos += 1;
                            let start = pos;
                            while pos < chars.len() && chars[pos] != quote {
                                pos += 1;
                            }
                            if pos == chars.len() {
                                return Err("unterminated quoted field name".to_string());
                            }
                            let name = chars[start..pos].iter().collect();
                            segments.push(PatternSegment::Field(name));
                            pos += 1;
                        }
                        Some(c) if c.is_ascii_digit() => {
                            let start = pos;
                            while pos < chars.len() && chars[pos].is_ascii_digit() {
                                pos += 1;
                            }
                            let digits: String = chars[start..pos].iter().collect();
                            let index = digits
                                .parse::<usize>()
                                .map_err(|e| format!("bad index '{digits}': {e}"))?;
                            segments.push(PatternSegment::Index(index));
                        }
                        _ => return Err(format!("bad subscript at offset {}", pos + 1)),
                    }
                    if chars.get(pos) != Some(&']') {
                        return Err(format!("expected ']' at offset {}", pos + 1));
                    }
                    pos += 1;
                }
                c => return Err(format!("unexpected '{c}' at offset {}", pos + 1)),
            }
        }

        Ok(Self { segments })
    }

    /// Pattern for a single top-level key, e.g. a bare metadata name.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PatternSegment::Field(name.into())],
        }
    }

    /// Extend the pattern to every child of the current location.
    #[must_use]
    pub fn each_element(mut self) -> Self {
        self.segments.push(PatternSegment::Wildcard);
        self
    }

    /// Pattern segments from the root.
    #[must_use]
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Specificity of this pattern for `path`, or `None` if it does not match.
    ///
    /// Exact segments weigh 2 and wildcards 1, so when several patterns match
    /// the same path the most specific one has the highest weight.
    #[must_use]
    pub fn weight(&self, path: &Path) -> Option<u32> {
        if self.segments.len() != path.tokens().len() {
            return None;
        }
        let mut weight = 1;
        for (segment, token) in self.segments.iter().zip(path.tokens()) {
            weight += match (segment, token) {
                (PatternSegment::Wildcard, _) => 1,
                (PatternSegment::Field(a), PathToken::Field(b)) if a == b => 2,
                (PatternSegment::Index(a), PathToken::Index(b)) if a == b => 2,
                _ => return None,
            };
        }
        Some(weight)
    }
}

impl FromStr for PathPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                PatternSegment::Field(key) => write_field(f, key)?,
                PatternSegment::Index(index) => write!(f, "[{index}]")?,
                PatternSegment::Wildcard => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = Path::root().field("items").index(2).field("unit price");
        assert_eq!(path.to_string(), "$.items[2]['unit price']");
        assert_eq!(Path::root().to_string(), "$");
    }

    #[test]
    fn test_parse_patterns() {
        let pattern = PathPattern::parse("$.items[*].name").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                PatternSegment::Field("items".to_string()),
                PatternSegment::Wildcard,
                PatternSegment::Field("name".to_string()),
            ]
        );

        let pattern: PathPattern = "$['content-type'][0].*".parse().unwrap();
        assert_eq!(pattern.to_string(), "$.content-type[0][*]");

        assert!(PathPattern::parse("$").unwrap().segments().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_syntax() {
        assert!(PathPattern::parse("text").is_err());
        assert!(PathPattern::parse("$.").is_err());
        assert!(PathPattern::parse("$.items[").is_err());
        assert!(PathPattern::parse("$.items[1").is_err());
        assert!(PathPattern::parse("$['open").is_err());
        assert!(PathPattern::parse("$.a b").is_err());
    }

    #[test]
    fn test_weight_prefers_exact_segments() {
        let path = Path::root().field("items").index(0);
        let exact = PathPattern::parse("$.items[0]").unwrap();
        let wildcard = PathPattern::parse("$.items[*]").unwrap();
        let other = PathPattern::parse("$.items[1]").unwrap();

        assert!(exact.weight(&path) > wildcard.weight(&path));
        assert!(wildcard.weight(&path).is_some());
        assert_eq!(other.weight(&path), None);
        assert_eq!(PathPattern::parse("$.items").unwrap().weight(&path), None);
    }

    #[test]
    fn test_each_element() {
        let pattern = PathPattern::parse("$.items").unwrap().each_element();
        assert!(pattern.weight(&Path::root().field("items").index(7)).is_some());
        assert!(pattern.weight(&Path::root().field("items")).is_none());
    }
}
