//! TOML bridge, built on the `toml` crate.

use ::toml::value::{Date as TomlDate, Datetime, Offset, Time as TomlTime};
use ::toml::{Table, Value as TomlValue};
use tracing::trace;

use super::{checked_key, open_list, store, store_group};
use crate::cast::checked_cast;
use crate::config::{Configuration, Group, Value};
use crate::error::{ConfigError, Result};
use crate::temporal::{Date, DateTime, Time, TimeOffset};

pub(crate) fn parse(text: &str) -> Result<Configuration> {
    let table: Table = text
        .parse()
        .map_err(|e: ::toml::de::Error| ConfigError::parse(format!("invalid TOML: {e}")))?;
    let mut config = Configuration::new();
    for (key, node) in table {
        handle_node(node, &mut config, checked_key(&key)?, false)?;
    }
    Ok(config)
}

fn handle_node(node: TomlValue, config: &mut Configuration, fqn: &str, append: bool) -> Result<()> {
    trace!(%fqn, append, kind = node.type_str(), "visiting TOML node");
    match node {
        TomlValue::Boolean(b) => store(config, fqn, b, append),
        TomlValue::Integer(i) => store(config, fqn, i, append),
        TomlValue::Float(f) => store(config, fqn, f, append),
        TomlValue::String(s) => store(config, fqn, s, append),
        TomlValue::Datetime(dt) => store(config, fqn, from_toml_datetime(&dt)?, append),
        TomlValue::Array(items) => {
            let list = open_list(config, fqn, append)?;
            for item in items {
                handle_node(item, config, &list, true)?;
            }
            Ok(())
        }
        TomlValue::Table(table) => {
            let mut group = Configuration::new();
            for (key, child) in table {
                handle_node(child, &mut group, checked_key(&key)?, false)?;
            }
            store_group(config, fqn, group, append)
        }
    }
}

fn from_toml_datetime(dt: &Datetime) -> Result<Value> {
    let date = dt.date.map(|d| Date::new(d.year, d.month, d.day)).transpose()?;
    let time = dt
        .time
        .map(|t| Time::new(t.hour, t.minute, t.second, t.nanosecond))
        .transpose()?;
    let offset = match dt.offset {
        None => None,
        Some(Offset::Z) => Some(TimeOffset::utc()),
        Some(Offset::Custom { minutes }) => Some(TimeOffset::from_minutes(i32::from(minutes))?),
    };
    match (date, time) {
        (Some(date), None) => Ok(Value::Date(date)),
        (None, Some(time)) => Ok(Value::Time(time)),
        (Some(date), Some(time)) => Ok(Value::DateTime(DateTime::new(date, time, offset))),
        (None, None) => Err(ConfigError::parse(format!("unsupported TOML datetime '{dt}'"))),
    }
}

fn to_toml_date(date: Date) -> TomlDate {
    TomlDate {
        year: date.year(),
        month: date.month(),
        day: date.day(),
    }
}

fn to_toml_time(time: Time) -> TomlTime {
    TomlTime {
        hour: time.hour(),
        minute: time.minute(),
        second: time.second(),
        nanosecond: time.nanosecond(),
    }
}

fn to_toml_value(value: &Value) -> Result<TomlValue> {
    let converted = match value {
        Value::Boolean(b) => TomlValue::Boolean(*b),
        Value::Integer(i) => TomlValue::Integer(*i),
        Value::FloatingPoint(f) => TomlValue::Float(*f),
        Value::String(s) => TomlValue::String(s.clone()),
        Value::Date(d) => TomlValue::Datetime(Datetime {
            date: Some(to_toml_date(*d)),
            time: None,
            offset: None,
        }),
        Value::Time(t) => TomlValue::Datetime(Datetime {
            date: None,
            time: Some(to_toml_time(*t)),
            offset: None,
        }),
        Value::DateTime(dt) => {
            let offset = match dt.offset() {
                None => None,
                Some(o) if o.is_utc() => Some(Offset::Z),
                Some(o) => Some(Offset::Custom {
                    minutes: checked_cast::<i16, i32>(o.minutes())
                        .map_err(|e| ConfigError::value(e.to_string()))?,
                }),
            };
            TomlValue::Datetime(Datetime {
                date: Some(to_toml_date(dt.date())),
                time: Some(to_toml_time(dt.time())),
                offset,
            })
        }
        Value::List(items) => TomlValue::Array(items.iter().map(to_toml_value).collect::<Result<_>>()?),
        Value::Group(group) => TomlValue::Table(to_table(group)?),
    };
    Ok(converted)
}

/// Converts a group into a TOML table, keeping key order.
pub(crate) fn to_table(group: &Group) -> Result<Table> {
    group
        .iter()
        .map(|(key, value)| Ok((key.to_string(), to_toml_value(value)?)))
        .collect()
}

pub(crate) fn to_string(group: &Group) -> Result<String> {
    let table = to_table(group)?;
    ::toml::to_string(&table).map_err(|e| ConfigError::value(format!("cannot serialize as TOML: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigType;
    use crate::error::ErrorKind;

    const DOCUMENT: &str = r#"
title = "dragon"
enabled = true
ratio = 0.25
count = 42
day = 1979-05-27
alarm = 07:32:00.5
local = 1979-05-27T07:32:00
zulu = 1979-05-27T07:32:00Z
shifted = 1979-05-27T00:32:00.999999-07:00
matrix = [[1, 2], [3]]
mixed = [1, "two", 3.0]

[server]
host = "localhost"
ports = [8000, 8001]

[[server.routes]]
path = "/a"

[[server.routes]]
path = "/b"
"#;

    #[test]
    fn test_parse_maps_all_kinds() {
        let config = parse(DOCUMENT).unwrap();

        assert_eq!(config.get_string("title").unwrap(), "dragon");
        assert!(config.get_bool("enabled").unwrap());
        assert_eq!(config.get_f64("ratio").unwrap(), 0.25);
        assert_eq!(config.get_i32("count").unwrap(), 42);
        assert_eq!(config.get_date("day").unwrap(), Date::new(1979, 5, 27).unwrap());
        assert_eq!(
            config.get_time("alarm").unwrap(),
            Time::new(7, 32, 0, 500_000_000).unwrap()
        );
        assert!(config.get_date_time("local").unwrap().is_local());
        assert_eq!(
            config.get_date_time("zulu").unwrap().offset(),
            Some(TimeOffset::utc())
        );
        assert_eq!(
            config.get_date_time("shifted").unwrap().offset().unwrap().minutes(),
            -420
        );
        assert_eq!(
            config.get::<Vec<Vec<i32>>>("matrix").unwrap(),
            vec![vec![1, 2], vec![3]]
        );
        assert_eq!(config.type_of("mixed[1]").unwrap(), ConfigType::String);
        assert_eq!(config.get_i32_list("server.ports").unwrap(), vec![8000, 8001]);
        assert_eq!(config.get_string("server.routes[1].path").unwrap(), "/b");
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(parse("a = ").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse("a = 1\na = 2").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse(r#""a.b" = 1"#).unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_output_reparses_to_equal_tree() {
        let config = parse(DOCUMENT).unwrap();
        let text = to_string(config.root()).unwrap();
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed, config);
        assert_eq!(to_string(reparsed.root()).unwrap(), text);
    }

    #[test]
    fn test_scalars_after_groups_serialize() {
        let mut config = Configuration::new();
        config.set_i64("group.x", 1).unwrap();
        config.set_string("after", "value").unwrap();
        config.set("empty", Value::List(Vec::new())).unwrap();
        config.set_group("nothing", Configuration::new()).unwrap();

        let reparsed = parse(&to_string(config.root()).unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }
}
