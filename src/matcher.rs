//! Matching of fully-qualified parameter names against key patterns.
//!
//! A pattern without `*` matches exactly one name. A pattern with `*` is
//! compiled once into an anchored regular expression in which every `*`
//! matches any run of characters, dots and brackets included.

use regex::Regex;

use crate::error::{ConfigError, Result};

/// Matches names against a single key pattern.
#[derive(Debug, Clone)]
pub struct KeyMatcher {
    pattern: String,
    regex: Option<Regex>,
}

impl KeyMatcher {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let regex = if pattern.contains('*') {
            let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
            let expression = format!("^{}$", escaped.join(".*"));
            let regex = Regex::new(&expression).map_err(|e| {
                ConfigError::value(format!("invalid key pattern '{pattern}': {e}"))
            })?;
            Some(regex)
        } else {
            None
        };
        Ok(Self { pattern, regex })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, key: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(key),
            None => self.pattern == key,
        }
    }
}

/// Matches a name if any of its patterns does.
#[derive(Debug, Clone, Default)]
pub struct MultiKeyMatcher {
    matchers: Vec<KeyMatcher>,
}

impl MultiKeyMatcher {
    /// Builds a matcher from `patterns`; duplicates are kept once, in first-seen order.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = Self::default();
        for pattern in patterns {
            matcher.register(pattern.as_ref())?;
        }
        Ok(matcher)
    }

    /// Adds a pattern unless an identical one is already registered.
    pub fn register(&mut self, pattern: &str) -> Result<()> {
        if !self.matchers.iter().any(|m| m.pattern() == pattern) {
            self.matchers.push(KeyMatcher::new(pattern)?);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn matches(&self, key: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern_matches_exactly() {
        let matcher = KeyMatcher::new("a.b[0]").unwrap();
        assert!(matcher.matches("a.b[0]"));
        assert!(!matcher.matches("a.b[0].c"));
        assert!(!matcher.matches("A.b[0]"));
        assert!(!matcher.matches("xa.b[0]"));
    }

    #[test]
    fn test_wildcard_spans_segments() {
        let matcher = KeyMatcher::new("a.*.b").unwrap();
        assert!(matcher.matches("a.x.b"));
        assert!(matcher.matches("a.x.y.b"));
        assert!(matcher.matches("a.list[3].b"));
        assert!(!matcher.matches("a.b"));
        assert!(!matcher.matches("a.x.bc"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let matcher = KeyMatcher::new("paths[0].*").unwrap();
        assert!(matcher.matches("paths[0].file"));
        assert!(!matcher.matches("paths0.file"));

        let matcher = KeyMatcher::new("a+b*").unwrap();
        assert!(matcher.matches("a+b.c"));
        assert!(!matcher.matches("aab.c"));
    }

    #[test]
    fn test_multi_matcher() {
        let matcher = MultiKeyMatcher::new(["*.path", "root", "*.path"]).unwrap();
        assert_eq!(matcher.len(), 2);
        assert!(matcher.matches("storage.path"));
        assert!(matcher.matches("root"));
        assert!(!matcher.matches("root.path.x"));

        let empty = MultiKeyMatcher::default();
        assert!(empty.is_empty());
        assert!(!empty.matches("anything"));
    }
}
