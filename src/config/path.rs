//! Parsing of fully-qualified parameter names.
//!
//! A name is `segment(.segment)*`, where each segment is a key optionally
//! followed by one or more `[index]` selectors, e.g. `server.hosts[1].port`.

use crate::error::{ConfigError, Result};

/// One navigation step of a parsed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step<'a> {
    Key(&'a str),
    Index(usize),
}

/// Returns `fqn[index]`, the name of an element of the list at `fqn`.
pub fn key_for_list_element(fqn: &str, index: usize) -> String {
    format!("{fqn}[{index}]")
}

/// Joins a group name and a child key; an empty group name denotes the root.
pub(crate) fn join_key(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Whether `key` can be used as a single segment of a name.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['.', '[', ']', '*'])
}

/// Splits `fqn` into navigation steps, rejecting malformed names.
pub(crate) fn parse(fqn: &str) -> Result<Vec<Step<'_>>> {
    let invalid = |reason: &str| ConfigError::key(format!("invalid key '{fqn}': {reason}"));

    if fqn.is_empty() {
        return Err(invalid("empty name"));
    }

    let mut steps = Vec::new();
    for segment in fqn.split('.') {
        let (key, mut selectors) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };
        if !is_valid_key(key) {
            return Err(invalid("empty or malformed segment"));
        }
        steps.push(Step::Key(key));

        while !selectors.is_empty() {
            let close = selectors
                .find(']')
                .ok_or_else(|| invalid("unterminated index"))?;
            let digits = selectors
                .strip_prefix('[')
                .map(|s| &s[..close - 1])
                .ok_or_else(|| invalid("unexpected text after index"))?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("index must be a non-negative integer"));
            }
            let index = digits
                .parse()
                .map_err(|_| invalid("index is too large"))?;
            steps.push(Step::Index(index));
            selectors = &selectors[close + 1..];
        }
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_keys_and_indices() {
        assert_eq!(parse("a").unwrap(), vec![Step::Key("a")]);
        assert_eq!(
            parse("a.b[2].c").unwrap(),
            vec![Step::Key("a"), Step::Key("b"), Step::Index(2), Step::Key("c")]
        );
        assert_eq!(
            parse("matrix[1][0]").unwrap(),
            vec![Step::Key("matrix"), Step::Index(1), Step::Index(0)]
        );
        assert_eq!(parse("with-dash_1").unwrap(), vec![Step::Key("with-dash_1")]);
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for fqn in [
            "", ".", "a.", ".a", "a..b", "[0]", "a[", "a[]", "a[x]", "a[-1]", "a]", "a[0]b",
            "a*", "a.*.b", "a[0]]",
        ] {
            let err = parse(fqn).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Key, "input: {fqn:?}");
        }
    }

    #[test]
    fn test_list_element_names() {
        assert_eq!(key_for_list_element("a.b", 3), "a.b[3]");
        assert_eq!(key_for_list_element("m[0]", 1), "m[0][1]");
        assert_eq!(join_key("", "x"), "x");
        assert_eq!(join_key("a[1]", "x"), "a[1].x");
    }
}
