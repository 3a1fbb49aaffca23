//! The configuration tree and its path-addressed API.
//!
//! Every node is addressed by a fully-qualified name such as
//! `server.hosts[1].port`. Reads distinguish a missing key
//! ([`ConfigError::Key`]) from a node of the wrong type
//! ([`ConfigError::Type`]); writes create intermediate groups but never
//! intermediate lists.

mod access;
mod builder;
mod env;
mod path;
mod resolve;
mod value;

pub use access::{FromValue, IntoValue};
pub use builder::ConfigurationBuilder;
pub use path::{is_valid_key, key_for_list_element};
pub use value::{ConfigType, Group, Value};

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::files;
use crate::format::{self, Format, NullValuePolicy};
use crate::matcher::MultiKeyMatcher;
use crate::temporal::{Date, DateTime, Time};
use access::assign;
pub(crate) use path::join_key;
use path::Step;

/// A hierarchical configuration, owning a root group.
///
/// Cloning deep-copies the tree. Equality is structural: two configurations
/// are equal if they hold the same names with the same types and values,
/// regardless of key order.
///
/// ```
/// use dragon_cfg::{ConfigType, Configuration};
///
/// let mut config = Configuration::new();
/// config.set_bool("a.b.c", true)?;
/// assert!(config.contains("a.b"));
/// assert_eq!(config.type_of("a.b")?, ConfigType::Group);
/// assert!(config.get_bool("a.b.c")?);
/// # Ok::<(), dragon_cfg::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    root: Group,
}

/// Container reached while walking towards a node that is about to be written.
enum Parent<'a> {
    Group(&'a mut Group),
    List(&'a mut Vec<Value>),
}

impl Configuration {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a layered load, see [`ConfigurationBuilder`].
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    pub fn from_group(root: Group) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn into_group(self) -> Group {
        self.root
    }

    /// Moves the tree out, leaving this configuration empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    // ---------------------------------------------------------------------
    // Loading and serialization

    pub fn load_str(text: &str, format: Format) -> Result<Self> {
        Self::load_str_with(text, format, NullValuePolicy::default())
    }

    pub fn load_str_with(text: &str, format: Format, policy: NullValuePolicy) -> Result<Self> {
        format::load(text, format, policy)
    }

    pub fn load_toml_str(text: &str) -> Result<Self> {
        Self::load_str(text, Format::Toml)
    }

    pub fn load_json_str(text: &str) -> Result<Self> {
        Self::load_str(text, Format::Json)
    }

    pub fn load_yaml_str(text: &str) -> Result<Self> {
        Self::load_str(text, Format::Yaml)
    }

    pub fn load_libconfig_str(text: &str) -> Result<Self> {
        Self::load_str(text, Format::Libconfig)
    }

    /// Loads a file, inferring the format from its extension.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_file_with(path, NullValuePolicy::default())
    }

    pub fn load_file_with(path: impl AsRef<Path>, policy: NullValuePolicy) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let text = files::read_text_file(path)?;
        debug!(path = %path.display(), %format, "loading configuration file");
        Self::load_str_with(&text, format, policy)
    }

    /// Serializes the tree as TOML.
    pub fn to_toml(&self) -> Result<String> {
        format::toml::to_string(&self.root)
    }

    /// Serializes the tree as pretty-printed JSON; temporal values become strings.
    pub fn to_json(&self) -> Result<String> {
        format::to_json(self)
    }

    /// Deserializes the tree into a typed structure.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let table = format::toml::to_table(&self.root)?;
        ::toml::Value::Table(table)
            .try_into()
            .map_err(|e| ConfigError::type_mismatch(format!("cannot deserialize configuration: {e}")))
    }

    // ---------------------------------------------------------------------
    // Queries

    /// Returns the type of the node at `fqn`.
    pub fn type_of(&self, fqn: &str) -> Result<ConfigType> {
        self.value(fqn).map(Value::config_type)
    }

    /// Whether a node exists at `fqn`. Malformed names are reported as absent.
    pub fn contains(&self, fqn: &str) -> bool {
        path::parse(fqn)
            .map(|steps| lookup(&self.root, &steps).is_some())
            .unwrap_or(false)
    }

    /// Returns the node at `fqn`.
    pub fn value(&self, fqn: &str) -> Result<&Value> {
        let steps = path::parse(fqn)?;
        lookup(&self.root, &steps).ok_or_else(|| missing(fqn))
    }

    /// Number of elements of the list at `fqn`.
    pub fn list_len(&self, fqn: &str) -> Result<usize> {
        match self.value(fqn)? {
            Value::List(items) => Ok(items.len()),
            other => Err(ConfigError::type_mismatch(format!(
                "'{fqn}' is a {}, not a list",
                other.config_type()
            ))),
        }
    }

    /// Reads the node at `fqn` as `T`.
    pub fn get<T: FromValue>(&self, fqn: &str) -> Result<T> {
        T::from_value(self.value(fqn)?, fqn)
    }

    /// Like [`get`](Self::get), but `None` if the key does not exist.
    ///
    /// A node of the wrong type is still an error.
    pub fn get_optional<T: FromValue>(&self, fqn: &str) -> Result<Option<T>> {
        let steps = path::parse(fqn)?;
        lookup(&self.root, &steps)
            .map(|value| T::from_value(value, fqn))
            .transpose()
    }

    /// Like [`get`](Self::get), but `default` if the key does not exist.
    pub fn get_or<T: FromValue>(&self, fqn: &str, default: T) -> Result<T> {
        Ok(self.get_optional(fqn)?.unwrap_or(default))
    }

    pub fn get_bool(&self, fqn: &str) -> Result<bool> {
        self.get(fqn)
    }

    pub fn get_i32(&self, fqn: &str) -> Result<i32> {
        self.get(fqn)
    }

    pub fn get_i64(&self, fqn: &str) -> Result<i64> {
        self.get(fqn)
    }

    pub fn get_f64(&self, fqn: &str) -> Result<f64> {
        self.get(fqn)
    }

    pub fn get_string(&self, fqn: &str) -> Result<String> {
        self.get(fqn)
    }

    pub fn get_date(&self, fqn: &str) -> Result<Date> {
        self.get(fqn)
    }

    pub fn get_time(&self, fqn: &str) -> Result<Time> {
        self.get(fqn)
    }

    pub fn get_date_time(&self, fqn: &str) -> Result<DateTime> {
        self.get(fqn)
    }

    pub fn get_bool_list(&self, fqn: &str) -> Result<Vec<bool>> {
        self.get(fqn)
    }

    pub fn get_i32_list(&self, fqn: &str) -> Result<Vec<i32>> {
        self.get(fqn)
    }

    pub fn get_i64_list(&self, fqn: &str) -> Result<Vec<i64>> {
        self.get(fqn)
    }

    pub fn get_f64_list(&self, fqn: &str) -> Result<Vec<f64>> {
        self.get(fqn)
    }

    pub fn get_string_list(&self, fqn: &str) -> Result<Vec<String>> {
        self.get(fqn)
    }

    /// Returns a deep copy of the group at `fqn`; an empty name copies the whole tree.
    pub fn get_group(&self, fqn: &str) -> Result<Configuration> {
        if fqn.is_empty() {
            return Ok(self.clone());
        }
        match self.value(fqn)? {
            Value::Group(group) => Ok(Self::from_group(group.clone())),
            other => Err(ConfigError::type_mismatch(format!(
                "'{fqn}' is a {}, not a group",
                other.config_type()
            ))),
        }
    }

    /// Names of all nodes in depth-first pre-order.
    ///
    /// With `include_array_entries`, list elements (and anything nested in
    /// them) are listed as `name[index]`. Without `recursive`, only the
    /// direct children of the root are listed.
    pub fn list_parameter_names(&self, include_array_entries: bool, recursive: bool) -> Vec<String> {
        let mut names = Vec::new();
        collect_group_names(&self.root, "", include_array_entries, recursive, &mut names);
        names
    }

    // ---------------------------------------------------------------------
    // Mutation

    /// Stores `value` at `fqn`.
    ///
    /// Missing intermediate groups are created. An existing node keeps its
    /// type: numbers are converted to it if that is lossless, any other
    /// change of type is a [`ConfigError::Type`].
    pub fn set<T: IntoValue>(&mut self, fqn: &str, value: T) -> Result<()> {
        self.set_value(fqn, value.into_value())
    }

    pub fn set_bool(&mut self, fqn: &str, value: bool) -> Result<()> {
        self.set(fqn, value)
    }

    pub fn set_i32(&mut self, fqn: &str, value: i32) -> Result<()> {
        self.set(fqn, value)
    }

    pub fn set_i64(&mut self, fqn: &str, value: i64) -> Result<()> {
        self.set(fqn, value)
    }

    pub fn set_f64(&mut self, fqn: &str, value: f64) -> Result<()> {
        self.set(fqn, value)
    }

    pub fn set_string(&mut self, fqn: &str, value: impl Into<String>) -> Result<()> {
        self.set(fqn, value.into())
    }

    pub fn set_date(&mut self, fqn: &str, value: Date) -> Result<()> {
        self.set(fqn, value)
    }

    pub fn set_time(&mut self, fqn: &str, value: Time) -> Result<()> {
        self.set(fqn, value)
    }

    pub fn set_date_time(&mut self, fqn: &str, value: DateTime) -> Result<()> {
        self.set(fqn, value)
    }

    /// Stores `group` as the sub-tree at `fqn`, replacing an existing group.
    pub fn set_group(&mut self, fqn: &str, group: Configuration) -> Result<()> {
        if fqn.is_empty() {
            return Err(ConfigError::key("cannot replace the root group"));
        }
        self.set_value(fqn, Value::Group(group.root))
    }

    fn set_value(&mut self, fqn: &str, value: Value) -> Result<()> {
        let steps = path::parse(fqn)?;
        self.check_no_implicit_list(fqn, &steps)?;

        let (last, parents) = steps
            .split_last()
            .ok_or_else(|| ConfigError::key("empty name"))?;
        match (parent_mut(&mut self.root, &steps, parents.len(), true)?, last) {
            (Parent::Group(group), Step::Key(key)) => match group.get_mut(key) {
                Some(slot) => assign(slot, value, fqn),
                None => {
                    group.insert(*key, value);
                    Ok(())
                }
            },
            (Parent::List(items), Step::Index(index)) => match items.get_mut(*index) {
                Some(slot) => assign(slot, value, fqn),
                None => Err(missing(fqn)),
            },
            (parent, _) => Err(wrong_container(&parent, &steps, parents.len())),
        }
    }

    // Writes below a missing key may only create groups; an index at or
    // after the first missing step would need an implicit list.
    fn check_no_implicit_list(&self, fqn: &str, steps: &[Step<'_>]) -> Result<()> {
        let first_missing = (1..=steps.len()).find(|&n| lookup(&self.root, &steps[..n]).is_none());
        if let Some(n) = first_missing {
            if steps[n - 1..].iter().any(|s| matches!(s, Step::Index(_))) {
                return Err(ConfigError::key(format!(
                    "cannot create '{fqn}': '{}' does not exist",
                    render(&steps[..n])
                )));
            }
        }
        Ok(())
    }

    /// Creates an empty list at `fqn`; the key must not exist yet.
    pub fn create_list(&mut self, fqn: &str) -> Result<()> {
        if self.contains(fqn) {
            return Err(ConfigError::key(format!("'{fqn}' already exists")));
        }
        self.set_value(fqn, Value::List(Vec::new()))
    }

    /// Appends `value` to the list at `fqn`.
    pub fn append<T: IntoValue>(&mut self, fqn: &str, value: T) -> Result<()> {
        self.list_mut(fqn)?.push(value.into_value());
        Ok(())
    }

    /// Appends an empty list to the list at `fqn`.
    pub fn append_list(&mut self, fqn: &str) -> Result<()> {
        self.append(fqn, Value::List(Vec::new()))
    }

    /// Appends `group` to the list at `fqn`.
    pub fn append_group(&mut self, fqn: &str, group: Configuration) -> Result<()> {
        self.append(fqn, Value::Group(group.root))
    }

    fn list_mut(&mut self, fqn: &str) -> Result<&mut Vec<Value>> {
        let steps = path::parse(fqn)?;
        match lookup_mut(&mut self.root, &steps) {
            Some(Value::List(items)) => Ok(items),
            Some(other) => Err(ConfigError::type_mismatch(format!(
                "'{fqn}' is a {}, not a list",
                other.config_type()
            ))),
            None => Err(missing(fqn)),
        }
    }

    /// Removes the node at `fqn` from its group.
    ///
    /// List elements cannot be deleted, as that would renumber their siblings.
    pub fn delete(&mut self, fqn: &str) -> Result<()> {
        let steps = path::parse(fqn)?;
        let (last, parents) = steps
            .split_last()
            .ok_or_else(|| ConfigError::key("empty name"))?;
        let Step::Key(key) = last else {
            return Err(ConfigError::type_mismatch(format!(
                "cannot delete list element '{fqn}'"
            )));
        };
        match parent_mut(&mut self.root, &steps, parents.len(), false)? {
            Parent::Group(group) => group.remove(key).map(|_| ()).ok_or_else(|| missing(fqn)),
            parent => Err(wrong_container(&parent, &steps, parents.len())),
        }
    }

    /// Deep-merges `other` into this configuration.
    ///
    /// Groups are merged recursively; any other node of `other`, lists
    /// included, replaces the node at the same name.
    pub fn merge(&mut self, other: Configuration) {
        merge_groups(&mut self.root, other.root);
    }

    /// Rewrites relative paths stored in strings whose names match `patterns`.
    ///
    /// Each matching, non-empty, relative string becomes `base/value`.
    /// Returns whether any string changed.
    pub fn adjust_relative_paths<I, S>(&mut self, base: impl AsRef<Path>, patterns: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matcher = MultiKeyMatcher::new(patterns)?;
        let base = base.as_ref();
        let mut changed = false;
        self.root.visit_strings_mut("", &mut |fqn, value| {
            if matcher.matches(fqn) && !value.is_empty() && !files::is_absolute(value.as_str()) {
                *value = files::join_path(base, value.as_str());
                changed = true;
            }
        });
        debug!(base = %base.display(), changed, "adjusted relative paths");
        Ok(changed)
    }

    /// Applies every `(search, replacement)` pair, in order, to every string.
    ///
    /// Returns whether any string changed.
    pub fn replace_string_placeholders<K, V>(&mut self, replacements: &[(K, V)]) -> Result<bool>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if replacements.iter().any(|(search, _)| search.as_ref().is_empty()) {
            return Err(ConfigError::value("placeholder search strings must not be empty"));
        }
        let mut changed = false;
        self.root.visit_strings_mut("", &mut |_, value| {
            for (search, replacement) in replacements {
                if value.contains(search.as_ref()) {
                    *value = value.replace(search.as_ref(), replacement.as_ref());
                    changed = true;
                }
            }
        });
        Ok(changed)
    }

    /// Replaces the path string at `fqn` by the configuration it points to.
    ///
    /// The format is inferred from the file extension. On failure the string
    /// is left as it was.
    pub fn load_nested_configuration(&mut self, fqn: &str) -> Result<()> {
        let location = match self.value(fqn)? {
            Value::String(s) => s.clone(),
            other => {
                return Err(ConfigError::type_mismatch(format!(
                    "'{fqn}' is a {}, not a path string",
                    other.config_type()
                )))
            }
        };
        let nested = Self::load_file(&location)?;
        debug!(%fqn, path = %location, "loaded nested configuration");

        let steps = path::parse(fqn)?;
        let slot = lookup_mut(&mut self.root, &steps).ok_or_else(|| missing(fqn))?;
        *slot = Value::Group(nested.root);
        Ok(())
    }

    /// Substitutes `${name}` references in strings by the text of the named
    /// scalar. `$$` stands for a literal `$`.
    ///
    /// Returns whether any string changed.
    pub fn resolve_references(&mut self) -> Result<bool> {
        resolve::resolve_references(&mut self.root)
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

fn missing(fqn: &str) -> ConfigError {
    ConfigError::key(format!("'{fqn}' does not exist"))
}

fn render(steps: &[Step<'_>]) -> String {
    let mut name = String::new();
    for step in steps {
        match step {
            Step::Key(key) => name = join_key(&name, key),
            Step::Index(index) => name = key_for_list_element(&name, *index),
        }
    }
    name
}

fn wrong_container(parent: &Parent<'_>, steps: &[Step<'_>], depth: usize) -> ConfigError {
    let (kind, expected) = match parent {
        Parent::Group(_) => ("group", "list"),
        Parent::List(_) => ("list", "group"),
    };
    let name = if depth == 0 {
        "the root".to_string()
    } else {
        format!("'{}'", render(&steps[..depth]))
    };
    ConfigError::type_mismatch(format!("{name} is a {kind}, not a {expected}"))
}

fn lookup<'a>(root: &'a Group, steps: &[Step<'_>]) -> Option<&'a Value> {
    let (first, rest) = steps.split_first()?;
    let Step::Key(key) = first else {
        return None;
    };
    let mut current = root.get(key)?;
    for step in rest {
        current = match (step, current) {
            (Step::Key(key), Value::Group(group)) => group.get(key)?,
            (Step::Index(index), Value::List(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

fn lookup_mut<'a>(root: &'a mut Group, steps: &[Step<'_>]) -> Option<&'a mut Value> {
    let (first, rest) = steps.split_first()?;
    let Step::Key(key) = first else {
        return None;
    };
    let mut current = root.get_mut(key)?;
    for step in rest {
        current = match (step, current) {
            (Step::Key(key), Value::Group(group)) => group.get_mut(key)?,
            (Step::Index(index), Value::List(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Walks the first `depth` steps, optionally creating missing groups.
fn parent_mut<'a>(
    root: &'a mut Group,
    steps: &[Step<'_>],
    depth: usize,
    create: bool,
) -> Result<Parent<'a>> {
    let mut current = Parent::Group(root);
    for (n, step) in steps[..depth].iter().enumerate() {
        let next = match (current, step) {
            (Parent::Group(group), Step::Key(key)) => {
                if create && !group.contains_key(key) {
                    group.insert(*key, Value::Group(Group::new()));
                }
                group.get_mut(key)
            }
            (Parent::List(items), Step::Index(index)) => items.get_mut(*index),
            (parent, _) => return Err(wrong_container(&parent, steps, n)),
        };
        current = match next {
            Some(Value::Group(group)) => Parent::Group(group),
            Some(Value::List(items)) => Parent::List(items),
            Some(other) => {
                return Err(ConfigError::type_mismatch(format!(
                    "'{}' is a {}, not a group or list",
                    render(&steps[..=n]),
                    other.config_type()
                )))
            }
            None => return Err(missing(&render(&steps[..=n]))),
        };
    }
    Ok(current)
}

fn collect_group_names(
    group: &Group,
    prefix: &str,
    include_array_entries: bool,
    recursive: bool,
    names: &mut Vec<String>,
) {
    for (key, value) in group.iter() {
        let name = join_key(prefix, key);
        names.push(name.clone());
        if recursive {
            collect_nested_names(value, &name, include_array_entries, names);
        }
    }
}

fn collect_nested_names(value: &Value, name: &str, include_array_entries: bool, names: &mut Vec<String>) {
    match value {
        Value::Group(group) => collect_group_names(group, name, include_array_entries, true, names),
        Value::List(items) if include_array_entries => {
            for (index, item) in items.iter().enumerate() {
                let element = key_for_list_element(name, index);
                names.push(element.clone());
                collect_nested_names(item, &element, include_array_entries, names);
            }
        }
        _ => {}
    }
}

fn merge_groups(base: &mut Group, overlay: Group) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Group(base_group)), Value::Group(overlay_group)) => {
                merge_groups(base_group, overlay_group);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
