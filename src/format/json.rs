//! JSON bridge, built on `serde_json`.
//!
//! JSON has no temporal types: dates and times are written as strings and
//! read back as strings.

use serde_json::{Number, Value as JsonValue};
use tracing::trace;

use super::{checked_key, open_list, store, store_group, store_null, NullValuePolicy};
use crate::cast::checked_cast;
use crate::config::{join_key, key_for_list_element, Configuration, Group, Value};
use crate::error::{ConfigError, Result};

pub(crate) fn parse(text: &str, policy: NullValuePolicy) -> Result<Configuration> {
    let document: JsonValue =
        serde_json::from_str(text).map_err(|e| ConfigError::parse(format!("invalid JSON: {e}")))?;
    let JsonValue::Object(object) = document else {
        return Err(ConfigError::parse("the top level of a JSON configuration must be an object"));
    };

    let mut config = Configuration::new();
    for (key, node) in object {
        handle_node(node, &mut config, checked_key(&key)?, false, policy)?;
    }
    Ok(config)
}

fn handle_node(
    node: JsonValue,
    config: &mut Configuration,
    fqn: &str,
    append: bool,
    policy: NullValuePolicy,
) -> Result<()> {
    trace!(%fqn, append, "visiting JSON node");
    match node {
        JsonValue::Null => store_null(config, fqn, append, policy),
        JsonValue::Bool(b) => store(config, fqn, b, append),
        JsonValue::Number(n) => match integer_of(&n, fqn)? {
            Some(i) => store(config, fqn, i, append),
            None => {
                let f = n
                    .as_f64()
                    .ok_or_else(|| ConfigError::parse(format!("unsupported number {n} at '{fqn}'")))?;
                store(config, fqn, f, append)
            }
        },
        JsonValue::String(s) => store(config, fqn, s, append),
        JsonValue::Array(items) => {
            let list = open_list(config, fqn, append)?;
            for item in items {
                handle_node(item, config, &list, true, policy)?;
            }
            Ok(())
        }
        JsonValue::Object(object) => {
            let mut group = Configuration::new();
            for (key, child) in object {
                handle_node(child, &mut group, checked_key(&key)?, false, policy)?;
            }
            store_group(config, fqn, group, append)
        }
    }
}

/// The integer value of `n`, `None` for floating point numbers.
fn integer_of(n: &Number, fqn: &str) -> Result<Option<i64>> {
    if let Some(i) = n.as_i64() {
        return Ok(Some(i));
    }
    match n.as_u64() {
        Some(u) => checked_cast::<i64, u64>(u)
            .map(Some)
            .map_err(|e| ConfigError::parse(format!("integer at '{fqn}' is out of range: {e}"))),
        None => Ok(None),
    }
}

/// JSON has no NaN or infinity; writing them as `null` would not read back.
pub(crate) fn to_string(group: &Group) -> Result<String> {
    if let Some(fqn) = non_finite_in_group(group, "") {
        return Err(ConfigError::value(format!(
            "cannot serialize as JSON: '{fqn}' is not a finite number"
        )));
    }
    serde_json::to_string_pretty(group)
        .map_err(|e| ConfigError::value(format!("cannot serialize as JSON: {e}")))
}

fn non_finite_in_group(group: &Group, prefix: &str) -> Option<String> {
    group
        .iter()
        .find_map(|(key, value)| non_finite(value, &join_key(prefix, key)))
}

fn non_finite(value: &Value, fqn: &str) -> Option<String> {
    match value {
        Value::FloatingPoint(f) if !f.is_finite() => Some(fqn.to_string()),
        Value::List(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, item)| non_finite(item, &key_for_list_element(fqn, index))),
        Value::Group(group) => non_finite_in_group(group, fqn),
        _ => None,
    }
}
