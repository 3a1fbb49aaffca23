//! A typed configuration tree loaded from TOML, JSON, YAML and libconfig.
//!
//! ```
//! use dragon_cfg::{Configuration, ErrorKind};
//!
//! let config = Configuration::load_toml_str("[server]\nport = 8080\nhosts = [\"a\", \"b\"]")?;
//! assert_eq!(config.get::<u16>("server.port")?, 8080);
//! assert_eq!(config.get_string("server.hosts[1]")?, "b");
//! assert_eq!(config.get_bool("server.port").unwrap_err().kind(), ErrorKind::Type);
//! # Ok::<(), dragon_cfg::ConfigError>(())
//! ```

pub mod cast;
pub mod config;
mod error;
pub mod files;
pub mod format;
pub mod matcher;
pub mod temporal;

pub use config::{
    key_for_list_element, ConfigType, Configuration, ConfigurationBuilder, FromValue, Group,
    IntoValue, Value,
};
pub use error::{ConfigError, ErrorKind, Result};
pub use format::{Format, NullValuePolicy};
pub use matcher::{KeyMatcher, MultiKeyMatcher};
pub use temporal::{Date, DateTime, Time, TimeOffset};
