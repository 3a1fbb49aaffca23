//! Reference resolution for string values.
//!
//! A string may embed `${name}`, where `name` is any parameter name such as
//! `server.port` or `hosts[0]`. Each reference is replaced by the text of the
//! named scalar. `$$` produces a literal `$`, so `$${x}` ends up as `${x}`.

use tracing::trace;

use super::path;
use super::value::Group;
use crate::error::{ConfigError, Result};

const MAX_ITERATIONS: usize = 100;

/// Resolves all references in `root` until no more substitutions are made.
///
/// `root` is only replaced once every reference resolved; on error it is
/// left exactly as it was.
pub(crate) fn resolve_references(root: &mut Group) -> Result<bool> {
    let mut working = root.clone();
    let changed = resolve_in_place(&mut working)?;
    if changed {
        *root = working;
    }
    Ok(changed)
}

/// Escapes are kept intact while references are substituted and only
/// collapsed at the end, so an escaped reference is never resolved.
fn resolve_in_place(root: &mut Group) -> Result<bool> {
    let mut changed = false;
    for pass in 0..MAX_ITERATIONS {
        let snapshot = root.clone();
        let mut substitutions = 0;
        let mut failure = None;
        root.visit_strings_mut("", &mut |fqn, value| {
            if failure.is_some() {
                return;
            }
            match resolve_string(value, &snapshot) {
                Ok(count) => substitutions += count,
                Err(e) => failure = Some(e.in_context(&format!("resolving '{fqn}'"))),
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        trace!(pass, substitutions, "reference resolution pass");
        if substitutions == 0 {
            let mut unescaped = false;
            root.visit_strings_mut("", &mut |_, value| {
                if value.contains("$$") {
                    *value = value.replace("$$", "$");
                    unescaped = true;
                }
            });
            return Ok(changed || unescaped);
        }
        changed = true;
    }

    Err(ConfigError::value(format!(
        "references still unresolved after {MAX_ITERATIONS} passes, possibly circular"
    )))
}

/// Substitutes every `${...}` in `s`, returning the number of substitutions.
fn resolve_string(s: &mut String, root: &Group) -> Result<usize> {
    if !s.contains('$') {
        return Ok(0);
    }

    let mut result = String::with_capacity(s.len());
    let mut substitutions = 0;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                result.push_str("$$");
            }
            Some('{') => {
                chars.next();
                let name = consume_until(&mut chars, '}')
                    .ok_or_else(|| ConfigError::parse(format!("unclosed reference in '{s}'")))?;
                result.push_str(&lookup_text(root, &name)?);
                substitutions += 1;
            }
            _ => result.push('$'),
        }
    }

    *s = result;
    Ok(substitutions)
}

fn consume_until(chars: &mut std::iter::Peekable<std::str::Chars>, delim: char) -> Option<String> {
    let mut result = String::new();
    for ch in chars.by_ref() {
        if ch == delim {
            return Some(result);
        }
        result.push(ch);
    }
    None
}

fn lookup_text(root: &Group, name: &str) -> Result<String> {
    let steps = path::parse(name)?;
    let value = super::lookup(root, &steps)
        .ok_or_else(|| ConfigError::key(format!("referenced parameter '{name}' does not exist")))?;
    value.scalar_text().ok_or_else(|| {
        ConfigError::type_mismatch(format!(
            "referenced parameter '{name}' is a {}, not a scalar",
            value.config_type()
        ))
    })
}

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::error::ErrorKind;

    fn load(text: &str) -> Configuration {
        Configuration::load_toml_str(text).unwrap()
    }

    #[test]
    fn test_simple_reference() {
        let mut config = load(
            r#"
            host = "localhost"
            url = "http://${host}/api"
            "#,
        );
        assert!(config.resolve_references().unwrap());
        assert_eq!(config.get_string("url").unwrap(), "http://localhost/api");
    }

    #[test]
    fn test_nested_path() {
        let mut config = load(
            r#"
            [server]
            host = "example.com"
            port = 8080

            [client]
            endpoint = "https://${server.host}:${server.port}"
            "#,
        );
        config.resolve_references().unwrap();
        assert_eq!(
            config.get_string("client.endpoint").unwrap(),
            "https://example.com:8080"
        );
    }

    #[test]
    fn test_chained_references() {
        let mut config = load(
            r#"
            a = "hello"
            b = "${a} world"
            c = "${b}!"
            "#,
        );
        config.resolve_references().unwrap();
        assert_eq!(config.get_string("c").unwrap(), "hello world!");
    }

    #[test]
    fn test_escape_survives_other_substitutions() {
        let mut config = load(
            r#"
            name = "app"
            value = "${name} uses $${VAR} for env vars"
            "#,
        );
        config.resolve_references().unwrap();
        assert_eq!(
            config.get_string("value").unwrap(),
            "app uses ${VAR} for env vars"
        );
    }

    #[test]
    fn test_indexed_and_temporal_references() {
        let mut config = load(
            r#"
            hosts = ["a.example", "b.example"]
            day = 2024-02-29
            backup = "${hosts[1]}/${day}"
            "#,
        );
        config.resolve_references().unwrap();
        assert_eq!(config.get_string("backup").unwrap(), "b.example/2024-02-29");
    }

    #[test]
    fn test_nothing_to_resolve() {
        let mut config = load(r#"plain = "no references, only $ signs""#);
        assert!(!config.resolve_references().unwrap());
    }

    #[test]
    fn test_failures() {
        let mut config = load("a = \"${b}\"\nb = \"${a}\"");
        assert_eq!(config.resolve_references().unwrap_err().kind(), ErrorKind::Value);

        let mut config = load(r#"url = "${nonexistent.path}""#);
        assert_eq!(config.resolve_references().unwrap_err().kind(), ErrorKind::Key);

        let mut config = load("list = [1]\nx = \"${list}\"");
        assert_eq!(config.resolve_references().unwrap_err().kind(), ErrorKind::Type);

        let mut config = load(r#"x = "${open""#);
        assert_eq!(config.resolve_references().unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_failure_leaves_tree_untouched() {
        let mut config = load(
            r#"
            a = "x"
            b = "${a}"
            c = "$${a}"
            z = "${missing}"
            "#,
        );
        let before = config.clone();
        assert_eq!(config.resolve_references().unwrap_err().kind(), ErrorKind::Key);
        assert_eq!(config, before);
        assert_eq!(config.get_string("b").unwrap(), "${a}");
        assert_eq!(config.get_string("c").unwrap(), "$${a}");
    }
}
