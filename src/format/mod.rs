//! Bridges between the configuration tree and textual formats.
//!
//! Each bridge walks its parser's document and replays it onto a
//! [`Configuration`] through the public setters: scalars are set or
//! appended, arrays become lists filled element by element, and tables
//! become groups built as sub-configurations. TOML is always available;
//! the other formats depend on cargo features and report
//! [`ConfigError::FeatureNotBuilt`] when compiled out.

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "libconfig")]
mod libconfig;
pub(crate) mod toml;
#[cfg(feature = "yaml")]
mod yaml;

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::config::{is_valid_key, key_for_list_element, Configuration, IntoValue, Value};
use crate::error::{ConfigError, Result};

/// A supported configuration text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Toml,
    Json,
    Yaml,
    Libconfig,
}

impl Format {
    /// Infers the format from a file extension (case-insensitive).
    ///
    /// `.toml`, `.json`, `.yaml`/`.yml` and `.cfg`/`.conf`/`.libconfig` are recognized.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "cfg" | "conf" | "libconfig" => Ok(Self::Libconfig),
            _ => Err(ConfigError::parse(format!(
                "cannot infer the configuration format of '{}'",
                path.display()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
            Self::Libconfig => "libconfig",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a JSON or YAML `null` turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullValuePolicy {
    /// Drop the entry; inside a list the element is left out.
    Skip,
    EmptyString,
    /// Store the string `"null"`.
    NullString,
    EmptyList,
    /// Reject the document with a parse error.
    #[default]
    Fail,
}

pub(crate) fn load(text: &str, format: Format, policy: NullValuePolicy) -> Result<Configuration> {
    let config = match format {
        Format::Toml => toml::parse(text)?,
        Format::Json => load_json(text, policy)?,
        Format::Yaml => load_yaml(text, policy)?,
        Format::Libconfig => load_libconfig(text)?,
    };
    debug!(%format, parameters = config.root().len(), "parsed configuration");
    Ok(config)
}

#[cfg(feature = "json")]
fn load_json(text: &str, policy: NullValuePolicy) -> Result<Configuration> {
    json::parse(text, policy)
}

#[cfg(not(feature = "json"))]
fn load_json(_text: &str, _policy: NullValuePolicy) -> Result<Configuration> {
    Err(ConfigError::FeatureNotBuilt("JSON"))
}

#[cfg(feature = "yaml")]
fn load_yaml(text: &str, policy: NullValuePolicy) -> Result<Configuration> {
    yaml::parse(text, policy)
}

#[cfg(not(feature = "yaml"))]
fn load_yaml(_text: &str, _policy: NullValuePolicy) -> Result<Configuration> {
    Err(ConfigError::FeatureNotBuilt("YAML"))
}

#[cfg(feature = "libconfig")]
fn load_libconfig(text: &str) -> Result<Configuration> {
    libconfig::parse(text)
}

#[cfg(not(feature = "libconfig"))]
fn load_libconfig(_text: &str) -> Result<Configuration> {
    Err(ConfigError::FeatureNotBuilt("libconfig"))
}

#[cfg(feature = "json")]
pub(crate) fn to_json(config: &Configuration) -> Result<String> {
    json::to_string(config.root())
}

#[cfg(not(feature = "json"))]
pub(crate) fn to_json(_config: &Configuration) -> Result<String> {
    Err(ConfigError::FeatureNotBuilt("JSON"))
}

// Helpers shared by the bridges. `fqn` names the node to set, or the list
// to append to when `append` is true.

/// Rejects document keys that cannot be addressed by a parameter name.
fn checked_key(key: &str) -> Result<&str> {
    if is_valid_key(key) {
        Ok(key)
    } else {
        Err(ConfigError::parse(format!("unsupported parameter name '{key}'")))
    }
}

fn store(config: &mut Configuration, fqn: &str, value: impl IntoValue, append: bool) -> Result<()> {
    if append {
        config.append(fqn, value)
    } else {
        config.set(fqn, value)
    }
}

/// Creates a list for an array node and returns the name its elements are appended to.
fn open_list(config: &mut Configuration, fqn: &str, append: bool) -> Result<String> {
    if append {
        let index = config.list_len(fqn)?;
        config.append_list(fqn)?;
        Ok(key_for_list_element(fqn, index))
    } else {
        config.create_list(fqn)?;
        Ok(fqn.to_string())
    }
}

fn store_group(config: &mut Configuration, fqn: &str, group: Configuration, append: bool) -> Result<()> {
    if append {
        config.append_group(fqn, group)
    } else {
        config.set_group(fqn, group)
    }
}

#[cfg(any(feature = "json", feature = "yaml"))]
fn store_null(config: &mut Configuration, fqn: &str, append: bool, policy: NullValuePolicy) -> Result<()> {
    match policy {
        NullValuePolicy::Skip => Ok(()),
        NullValuePolicy::EmptyString => store(config, fqn, "", append),
        NullValuePolicy::NullString => store(config, fqn, "null", append),
        NullValuePolicy::EmptyList => store(config, fqn, Value::List(Vec::new()), append),
        NullValuePolicy::Fail => Err(ConfigError::parse(format!("null value at '{fqn}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("a/b.toml").unwrap(), Format::Toml);
        assert_eq!(Format::from_path("B.JSON").unwrap(), Format::Json);
        assert_eq!(Format::from_path("x.yml").unwrap(), Format::Yaml);
        assert_eq!(Format::from_path("x.Yaml").unwrap(), Format::Yaml);
        assert_eq!(Format::from_path("app.cfg").unwrap(), Format::Libconfig);
        assert_eq!(Format::from_path("app.conf").unwrap(), Format::Libconfig);

        for path in ["x.ini", "noextension", ".toml"] {
            let err = Format::from_path(path).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse, "path: {path}");
        }
    }

    #[test]
    fn test_checked_key() {
        assert_eq!(checked_key("name").unwrap(), "name");
        assert_eq!(checked_key("a.b").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(checked_key("").unwrap_err().kind(), ErrorKind::Parse);
    }

    #[cfg(not(feature = "yaml"))]
    #[test]
    fn test_missing_feature_is_reported() {
        let err = Configuration::load_yaml_str("a: 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FeatureNotBuilt);
    }
}
