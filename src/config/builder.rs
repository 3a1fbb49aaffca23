use std::path::{Path, PathBuf};

use tracing::debug;

use super::env::env_overlay;
use super::Configuration;
use crate::error::{ConfigError, Result};
use crate::format::{Format, NullValuePolicy};

/// A configuration source in the loading pipeline.
#[derive(Debug)]
enum Layer {
    File { path: PathBuf, required: bool },
    Text { text: String, format: Format },
    Env { prefix: String, separator: String },
}

/// Builder for a configuration layered from files, text and environment variables.
///
/// Layers are merged in registration order, with later layers overriding
/// earlier ones. Groups are merged recursively; other values (including
/// lists) are replaced entirely. The format of a file is inferred from its
/// extension.
///
/// ## Variable References
///
/// After merging, string values may reference other parameters using
/// `${path.to.field}` syntax:
///
/// ```toml
/// [server]
/// host = "localhost"
/// port = 8080
/// url = "http://${server.host}:${server.port}/api"
/// ```
///
/// Use `$$` to escape a literal `$` (e.g., `$${VAR}` becomes `${VAR}`).
///
/// ## Example
///
/// ```no_run
/// use dragon_cfg::Configuration;
///
/// // defaults -> env overrides -> local file overrides env
/// let config = Configuration::builder()
///     .with_file("config/default.toml", true)
///     .with_env("MYAPP", "__")
///     .with_file("config/local.yaml", false)
///     .build()?;
/// let port: u16 = config.get("server.port")?;
/// # Ok::<(), dragon_cfg::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigurationBuilder {
    layers: Vec<Layer>,
    null_value_policy: NullValuePolicy,
}

impl ConfigurationBuilder {
    /// Adds a file to be loaded.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.layers.push(Layer::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Adds in-memory configuration text.
    pub fn with_str(mut self, text: impl Into<String>, format: Format) -> Self {
        self.layers.push(Layer::Text {
            text: text.into(),
            format,
        });
        self
    }

    /// Overlays environment variables named `{prefix}{separator}...`.
    ///
    /// Environment variables are mapped to parameter names by:
    /// 1. Removing the prefix and separator
    /// 2. Splitting remaining segments on the separator
    /// 3. Converting path segments to lowercase
    ///
    /// Values are coerced from strings to the most specific type: boolean,
    /// integer, floating point, or string (fallback). A variable overriding
    /// an existing string parameter stays a string.
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.layers.push(Layer::Env {
            prefix: prefix.into(),
            separator: separator.into(),
        });
        self
    }

    /// How `null` is handled in JSON and YAML layers.
    pub fn null_value_policy(mut self, policy: NullValuePolicy) -> Self {
        self.null_value_policy = policy;
        self
    }

    /// Loads and merges all layers, then resolves references.
    pub fn build(self) -> Result<Configuration> {
        let mut merged = Configuration::new();

        for layer in self.layers {
            match layer {
                Layer::File { path, required } => {
                    if let Some(config) = load_layer_file(&path, required, self.null_value_policy)? {
                        merged.merge(config);
                    }
                }
                Layer::Text { text, format } => {
                    merged.merge(Configuration::load_str_with(&text, format, self.null_value_policy)?);
                }
                Layer::Env { prefix, separator } => {
                    if separator.is_empty() {
                        return Err(ConfigError::value("environment separator must not be empty"));
                    }
                    let overlay = env_overlay(&merged, std::env::vars(), &prefix, &separator);
                    merged.merge(overlay);
                }
            }
        }

        // Resolve ${...} references after all layers are merged
        merged.resolve_references()?;
        Ok(merged)
    }
}

/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_layer_file(path: &Path, required: bool, policy: NullValuePolicy) -> Result<Option<Configuration>> {
    if !required && !path.exists() {
        debug!(path = %path.display(), "skipping missing optional configuration file");
        return Ok(None);
    }
    Configuration::load_file_with(path, policy).map(Some)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::error::ErrorKind;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_layers_merge_in_order() {
        let defaults = temp_file(
            ".toml",
            r#"
            name = "default"
            [server]
            host = "localhost"
            port = 8080
            tags = ["a", "b"]
            "#,
        );
        let local = temp_file(".json", r#"{"server": {"port": 9090, "tags": ["c"]}}"#);

        let config = Configuration::builder()
            .with_file(defaults.path(), true)
            .with_file(local.path(), true)
            .build()
            .unwrap();

        assert_eq!(config.get_string("name").unwrap(), "default");
        assert_eq!(config.get_string("server.host").unwrap(), "localhost");
        assert_eq!(config.get_i64("server.port").unwrap(), 9090);
        assert_eq!(config.get_string_list("server.tags").unwrap(), vec!["c"]);
    }

    #[test]
    fn test_missing_files() {
        let config = Configuration::builder()
            .with_str("a = 1", Format::Toml)
            .with_file("/nonexistent/optional.toml", false)
            .build()
            .unwrap();
        assert_eq!(config.get_i64("a").unwrap(), 1);

        let err = Configuration::builder()
            .with_file("/nonexistent/required.toml", true)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_references_resolve_across_layers() {
        let config = Configuration::builder()
            .with_str(r#"url = "http://${host}/""#, Format::Toml)
            .with_str(r#"{"host": "example.com"}"#, Format::Json)
            .build()
            .unwrap();
        assert_eq!(config.get_string("url").unwrap(), "http://example.com/");
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_null_policy_applies_to_layers() {
        let config = Configuration::builder()
            .with_str(r#"{"a": null}"#, Format::Json)
            .null_value_policy(NullValuePolicy::EmptyString)
            .build()
            .unwrap();
        assert_eq!(config.get_string("a").unwrap(), "");
    }

    #[test]
    fn test_empty_env_separator_is_rejected() {
        let err = Configuration::builder().with_env("APP", "").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
    }
}
