//! YAML bridge, built on the `yaml-rust2` event parser.
//!
//! Events are read rather than a resolved document so that every node keeps
//! its tag. Untagged plain scalars are resolved with the YAML 1.2 core
//! schema; quoted scalars are strings. Explicit tags select the type instead:
//! `!!str`, `!!bool`, `!!int`, `!!float`, `!!null`, and `!!timestamp`,
//! `!date`, `!time`, `!datetime` for temporal values.

use std::collections::HashMap;

use tracing::trace;
use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::TScalarStyle;

use super::{checked_key, open_list, store, store_group, store_null, NullValuePolicy};
use crate::config::{Configuration, Value};
use crate::error::{ConfigError, Result};
use crate::temporal::{Date, DateTime, Time};

const CORE_SCHEMA_PREFIX: &str = "tag:yaml.org,2002:";

/// A parsed YAML node with its tag, before any typing.
#[derive(Debug, Clone)]
enum Node {
    Scalar {
        text: String,
        plain: bool,
        tag: Option<String>,
    },
    Sequence(Vec<Node>),
    Mapping(Vec<(Node, Node)>),
}

enum Item {
    Node(Node),
    End,
}

#[derive(Default)]
struct EventLog(Vec<Event>);

impl EventReceiver for EventLog {
    fn on_event(&mut self, event: Event) {
        self.0.push(event);
    }
}

/// Rebuilds the node tree of the first document from the event stream.
struct TreeBuilder {
    events: std::vec::IntoIter<Event>,
    anchors: HashMap<usize, Node>,
}

impl TreeBuilder {
    fn next_item(&mut self) -> Result<Option<Item>> {
        while let Some(event) = self.events.next() {
            let (anchor, node) = match event {
                Event::Scalar(text, style, anchor, tag) => {
                    let tag = tag.map(|t| format!("{}{}", t.handle, t.suffix));
                    let plain = style == TScalarStyle::Plain;
                    (anchor, Node::Scalar { text, plain, tag })
                }
                Event::SequenceStart(anchor, tag) => {
                    let tag = tag.map(|t| format!("{}{}", t.handle, t.suffix));
                    check_collection_tag(tag.as_deref(), "seq")?;
                    let mut items = Vec::new();
                    while let Some(Item::Node(item)) = self.next_item()? {
                        items.push(item);
                    }
                    (anchor, Node::Sequence(items))
                }
                Event::MappingStart(anchor, tag) => {
                    let tag = tag.map(|t| format!("{}{}", t.handle, t.suffix));
                    check_collection_tag(tag.as_deref(), "map")?;
                    let mut entries = Vec::new();
                    while let Some(Item::Node(key)) = self.next_item()? {
                        let Some(Item::Node(value)) = self.next_item()? else {
                            return Err(ConfigError::parse("YAML mapping key without a value"));
                        };
                        entries.push((key, value));
                    }
                    (anchor, Node::Mapping(entries))
                }
                Event::Alias(id) => {
                    let node = self
                        .anchors
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| ConfigError::parse(format!("unknown YAML alias {id}")))?;
                    return Ok(Some(Item::Node(node)));
                }
                Event::SequenceEnd | Event::MappingEnd => return Ok(Some(Item::End)),
                _ => continue,
            };
            // Anchor ids start at 1; 0 marks a node without anchor.
            if anchor > 0 {
                self.anchors.insert(anchor, node.clone());
            }
            return Ok(Some(Item::Node(node)));
        }
        Ok(None)
    }
}

fn check_collection_tag(tag: Option<&str>, expected: &str) -> Result<()> {
    match tag.map(normalized_tag) {
        None | Some("") => Ok(()),
        Some(tag) if tag == expected => Ok(()),
        Some(tag) => Err(ConfigError::parse(format!(
            "tag '{tag}' cannot be applied to a YAML {expected}"
        ))),
    }
}

pub(crate) fn parse(text: &str, policy: NullValuePolicy) -> Result<Configuration> {
    let mut log = EventLog::default();
    Parser::new(text.chars())
        .load(&mut log, false)
        .map_err(|e| ConfigError::parse(format!("invalid YAML: {e}")))?;
    let mut builder = TreeBuilder {
        events: log.0.into_iter(),
        anchors: HashMap::new(),
    };

    let mut config = Configuration::new();
    match builder.next_item()? {
        // An empty document is an empty configuration.
        None | Some(Item::End) => {}
        Some(Item::Node(Node::Mapping(entries))) => {
            for (key, node) in entries {
                let key = key_text(key)?;
                handle_node(node, &mut config, checked_key(&key)?, false, policy)?;
            }
        }
        Some(Item::Node(_)) => {
            return Err(ConfigError::parse("the top level of a YAML configuration must be a mapping"))
        }
    }
    Ok(config)
}

fn handle_node(
    node: Node,
    config: &mut Configuration,
    fqn: &str,
    append: bool,
    policy: NullValuePolicy,
) -> Result<()> {
    trace!(%fqn, append, "visiting YAML node");
    match node {
        Node::Scalar { text, plain, tag } => {
            let value = match tag {
                Some(tag) => tagged_value(&text, &tag, fqn)?,
                None if plain => plain_value(&text, fqn)?,
                None => Some(Value::String(text)),
            };
            match value {
                Some(value) => store(config, fqn, value, append),
                None => store_null(config, fqn, append, policy),
            }
        }
        Node::Sequence(items) => {
            let list = open_list(config, fqn, append)?;
            for item in items {
                handle_node(item, config, &list, true, policy)?;
            }
            Ok(())
        }
        Node::Mapping(entries) => {
            let mut group = Configuration::new();
            for (key, child) in entries {
                let key = key_text(key)?;
                handle_node(child, &mut group, checked_key(&key)?, false, policy)?;
            }
            store_group(config, fqn, group, append)
        }
    }
}

/// Mapping keys may be any scalar; numbers and booleans keep their text.
fn key_text(key: Node) -> Result<String> {
    match key {
        Node::Scalar { text, .. } => Ok(text),
        _ => Err(ConfigError::parse("YAML mapping keys must be scalars")),
    }
}

/// Core schema resolution of an untagged plain scalar; `None` is null.
fn plain_value(text: &str, fqn: &str) -> Result<Option<Value>> {
    let value = match text {
        "" | "~" | "null" | "Null" | "NULL" => return Ok(None),
        "true" | "True" | "TRUE" => Value::Boolean(true),
        "false" | "False" | "FALSE" => Value::Boolean(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Value::FloatingPoint(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Value::FloatingPoint(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Value::FloatingPoint(f64::NAN),
        t => match integer_value(t, fqn)? {
            Some(i) => Value::Integer(i),
            None if looks_like_float(t) => match t.parse::<f64>() {
                Ok(f) => Value::FloatingPoint(f),
                Err(_) => Value::String(t.to_string()),
            },
            None => Value::String(t.to_string()),
        },
    };
    Ok(Some(value))
}

/// Decimal, `0x` and `0o` integers; a literal too wide for i64 is an error.
fn integer_value(text: &str, fqn: &str) -> Result<Option<i64>> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(octal) = text.strip_prefix("0o") {
        (octal, 8)
    } else {
        (text.strip_prefix(['+', '-']).unwrap_or(text), 10)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Ok(None);
    }
    let parsed = if radix == 10 {
        text.parse::<i64>()
    } else {
        i64::from_str_radix(digits, radix)
    };
    parsed
        .map(Some)
        .map_err(|e| ConfigError::parse(format!("integer '{text}' at '{fqn}' is out of range: {e}")))
}

fn looks_like_float(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b))
}

/// `!!str`, `!<tag:yaml.org,2002:str>`, `tag:yaml.org,2002:str` and `!str`
/// all name the tag `str`.
fn normalized_tag(raw: &str) -> &str {
    let tag = raw.trim_start_matches('!');
    let tag = tag
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(tag);
    tag.strip_prefix(CORE_SCHEMA_PREFIX).unwrap_or(tag)
}

fn tagged_value(text: &str, raw_tag: &str, fqn: &str) -> Result<Option<Value>> {
    let tag = normalized_tag(raw_tag);
    let text = text.trim();
    let invalid = |e: &dyn std::fmt::Display| {
        ConfigError::parse(format!("invalid {tag} '{text}' at '{fqn}': {e}"))
    };

    let value = match tag {
        // `!` alone is the non-specific tag, which makes a scalar a string.
        "" | "str" => Value::String(text.to_string()),
        "null" => return Ok(None),
        "bool" => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Value::Boolean(true),
            "false" | "no" | "off" => Value::Boolean(false),
            _ => return Err(invalid(&"not a boolean")),
        },
        "int" => match integer_value(text, fqn)? {
            Some(i) => Value::Integer(i),
            None => return Err(invalid(&"not an integer")),
        },
        "float" => match plain_value(text, fqn)? {
            Some(Value::FloatingPoint(f)) => Value::FloatingPoint(f),
            _ => Value::FloatingPoint(text.parse::<f64>().map_err(|e| invalid(&e))?),
        },
        "timestamp" => match DateTime::parse(text) {
            Ok(dt) => Value::DateTime(dt),
            Err(_) => Value::Date(Date::parse(text).map_err(|e| invalid(&e))?),
        },
        "date" => Value::Date(Date::parse(text).map_err(|e| invalid(&e))?),
        "time" => Value::Time(Time::parse(text).map_err(|e| invalid(&e))?),
        "datetime" | "date_time" => Value::DateTime(DateTime::parse(text).map_err(|e| invalid(&e))?),
        _ => return Err(ConfigError::parse(format!("unsupported tag '{raw_tag}' at '{fqn}'"))),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigType;
    use crate::error::ErrorKind;
    use crate::temporal::TimeOffset;

    fn load(text: &str) -> Result<Configuration> {
        parse(text, NullValuePolicy::Fail)
    }

    #[test]
    fn test_plain_document() {
        let config = load(
            "name: dragon\n\
             debug: true\n\
             workers: 8\n\
             ratio: 0.5\n\
             servers:\n  - host: a\n    port: 1\n  - host: b\n    port: 2\n\
             matrix: [[1, 2], [3]]\n\
             1: numeric key\n",
        )
        .unwrap();

        assert_eq!(config.get_string("name").unwrap(), "dragon");
        assert!(config.get_bool("debug").unwrap());
        assert_eq!(config.get_i32("workers").unwrap(), 8);
        assert_eq!(config.get_f64("ratio").unwrap(), 0.5);
        assert_eq!(config.get_string("servers[1].host").unwrap(), "b");
        assert_eq!(config.get_i32("matrix[0][1]").unwrap(), 2);
        assert_eq!(config.get_string("1").unwrap(), "numeric key");
    }

    #[test]
    fn test_tags_select_types() {
        let config = load(
            "as_string: !!str 42\n\
             as_int: !!int \"17\"\n\
             as_float: !!float 3\n\
             as_bool: !!bool \"true\"\n\
             stamp: !!timestamp 2001-12-14t21:59:43.10-05:00\n\
             day: !!timestamp 2002-12-14\n\
             local_day: !date 14.12.2002\n\
             alarm: !time 08:30\n",
        )
        .unwrap();

        assert_eq!(config.get_string("as_string").unwrap(), "42");
        assert_eq!(config.get_i64("as_int").unwrap(), 17);
        assert_eq!(config.type_of("as_float").unwrap(), ConfigType::FloatingPoint);
        assert!(config.get_bool("as_bool").unwrap());

        let stamp = config.get_date_time("stamp").unwrap();
        assert_eq!(stamp.offset(), Some(TimeOffset::new(-5, 0).unwrap()));
        assert_eq!(stamp.time().nanosecond(), 100_000_000);
        assert_eq!(config.get_date("day").unwrap(), Date::new(2002, 12, 14).unwrap());
        assert_eq!(config.get_date("local_day").unwrap(), Date::new(2002, 12, 14).unwrap());
        assert_eq!(config.get_time("alarm").unwrap(), Time::new(8, 30, 0, 0).unwrap());
    }

    #[test]
    fn test_core_schema_resolution() {
        let config = load(
            "hex: 0x1F
             octal: 0o17
             signed: +5
             exp: 1e3
             inf: -.inf
             quoted: \"42\"\n\
             single: 'true'
             word: yes
             version: 1.2.3
",
        )
        .unwrap();

        assert_eq!(config.get_i64("hex").unwrap(), 31);
        assert_eq!(config.get_i64("octal").unwrap(), 15);
        assert_eq!(config.get_i64("signed").unwrap(), 5);
        assert_eq!(config.get_f64("exp").unwrap(), 1000.0);
        assert_eq!(config.get_f64("inf").unwrap(), f64::NEG_INFINITY);
        assert_eq!(config.get_string("quoted").unwrap(), "42");
        assert_eq!(config.get_string("single").unwrap(), "true");
        assert_eq!(config.get_string("word").unwrap(), "yes");
        assert_eq!(config.get_string("version").unwrap(), "1.2.3");
    }

    #[test]
    fn test_anchors_and_aliases() {
        let config = load(
            "defaults: &defaults
  retries: 3
             primary: *defaults
             port: &port 8080
             ports: [*port, 9090]
",
        )
        .unwrap();

        assert_eq!(config.get_i64("primary.retries").unwrap(), 3);
        assert_eq!(config.get_i64_list("ports").unwrap(), vec![8080, 9090]);
    }

    #[test]
    fn test_untagged_dates_stay_strings() {
        let config = load("day: 2002-12-14\n").unwrap();
        assert_eq!(config.type_of("day").unwrap(), ConfigType::String);
    }

    #[test]
    fn test_rejected_documents() {
        for text in [
            "- just\n- a list\n",
            "a: !!binary aGVsbG8=\n",
            "a: !date not-a-date\n",
            "a: !!int [1]\n",
            "a: b: c\n",
            "? [1, 2]\n: complex key\n",
            "a: null\n",
            "a: !!str [1]\n",
            "a: !custom value\n",
            "big: 18446744073709551615\n",
        ] {
            assert_eq!(load(text).unwrap_err().kind(), ErrorKind::Parse, "input: {text}");
        }
    }

    #[test]
    fn test_empty_document() {
        assert!(load("").unwrap().is_empty());
        assert!(load("# only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_normalized_tag() {
        assert_eq!(normalized_tag("!!str"), "str");
        assert_eq!(normalized_tag("!date"), "date");
        assert_eq!(normalized_tag("!<tag:yaml.org,2002:int>"), "int");
        assert_eq!(normalized_tag("tag:yaml.org,2002:float"), "float");
    }
}
