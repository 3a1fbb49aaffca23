//! Environment variables as a configuration layer.

use tracing::{trace, warn};

use super::path::{is_valid_key, join_key};
use super::value::Value;
use super::Configuration;

/// Collects the variables named `{prefix}{separator}...` into an overlay for `base`.
///
/// `APP__SERVER__PORT=80` becomes `server.port = 80`: segments are
/// lowercased and joined with dots. Values are coerced to the most specific
/// scalar, except where `base` already holds a string, which keeps the raw text.
pub(crate) fn env_overlay<I>(base: &Configuration, vars: I, prefix: &str, separator: &str) -> Configuration
where
    I: IntoIterator<Item = (String, String)>,
{
    let prefix_with_sep = format!("{prefix}{separator}");
    let mut overlay = Configuration::new();

    for (key, raw) in vars {
        let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
            continue;
        };
        if path_str.is_empty() {
            continue;
        }

        let segments: Vec<String> = path_str
            .split(separator)
            .map(|s| s.to_lowercase())
            .collect();
        if !segments.iter().all(|s| is_valid_key(s)) {
            trace!(variable = %key, "skipping variable that does not map to a parameter name");
            continue;
        }
        let fqn = segments.iter().fold(String::new(), |acc, s| join_key(&acc, s));

        let value = match base.value(&fqn) {
            Ok(Value::String(_)) => Value::String(raw),
            _ => coerce_value(&raw),
        };
        if let Err(e) = overlay.set(&fqn, value) {
            warn!(variable = %key, error = %e, "ignoring conflicting environment variable");
        }
    }

    overlay
}

fn coerce_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return Value::FloatingPoint(f);
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigType;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce_value("TRUE"), Value::Boolean(true));
        assert_eq!(coerce_value("-42"), Value::Integer(-42));
        assert_eq!(coerce_value("2.5"), Value::FloatingPoint(2.5));
        assert_eq!(coerce_value("1e5"), Value::String("1e5".into()));
        assert_eq!(coerce_value("99999999999999999999"), Value::String("99999999999999999999".into()));
        assert_eq!(coerce_value("-"), Value::String("-".into()));
    }

    #[test]
    fn test_overlay_maps_names() {
        let base = Configuration::new();
        let overlay = env_overlay(
            &base,
            vars(&[
                ("APP__SERVER__PORT", "8080"),
                ("APP__DEBUG", "true"),
                ("OTHER__PORT", "1"),
                ("APP__", "ignored"),
                ("APP__BAD.NAME", "ignored"),
            ]),
            "APP",
            "__",
        );

        assert_eq!(overlay.get_i64("server.port").unwrap(), 8080);
        assert!(overlay.get_bool("debug").unwrap());
        assert_eq!(overlay.list_parameter_names(false, true), vec!["server", "server.port", "debug"]);
    }

    #[test]
    fn test_string_targets_keep_raw_text() {
        let mut base = Configuration::new();
        base.set_string("build.version", "1.0").unwrap();
        let overlay = env_overlay(&base, vars(&[("APP_BUILD_VERSION", "2.0")]), "APP", "_");
        assert_eq!(overlay.type_of("build.version").unwrap(), ConfigType::String);
        assert_eq!(overlay.get_string("build.version").unwrap(), "2.0");
    }

    #[test]
    fn test_conflicting_variables_are_skipped() {
        let base = Configuration::new();
        let overlay = env_overlay(
            &base,
            vars(&[("APP__A", "1"), ("APP__A__B", "2")]),
            "APP",
            "__",
        );
        assert_eq!(overlay.get_i64("a").unwrap(), 1);
        assert!(!overlay.contains("a.b"));
    }
}
