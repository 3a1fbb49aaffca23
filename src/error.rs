use std::path::PathBuf;

use thiserror::Error;

use crate::cast::CastError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level error type for the dragon-cfg library.
///
/// Missing keys, wrong types, malformed text and out-of-domain values are
/// separate variants and are never converted into one another.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("key error: {0}")]
    Key(String),

    #[error("type error: {message}")]
    Type {
        message: String,
        #[source]
        cast: Option<CastError>,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("value error: {0}")]
    Value(String),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} support was not built into this library")]
    FeatureNotBuilt(&'static str),
}

/// Coarse classification of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Key,
    Type,
    Parse,
    Value,
    Io,
    FeatureNotBuilt,
}

impl ConfigError {
    pub(crate) fn key(message: impl Into<String>) -> Self {
        Self::Key(message.into())
    }

    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
            cast: None,
        }
    }

    pub(crate) fn cast(message: impl Into<String>, cast: CastError) -> Self {
        Self::Type {
            message: format!("{}: {}", message.into(), cast),
            cast: Some(cast),
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub(crate) fn value(message: impl Into<String>) -> Self {
        Self::Value(message.into())
    }

    /// Prefixes the message with `context`, keeping the variant.
    pub(crate) fn in_context(self, context: &str) -> Self {
        match self {
            Self::Key(m) => Self::Key(format!("{context}: {m}")),
            Self::Type { message, cast } => Self::Type {
                message: format!("{context}: {message}"),
                cast,
            },
            Self::Parse(m) => Self::Parse(format!("{context}: {m}")),
            Self::Value(m) => Self::Value(format!("{context}: {m}")),
            other => other,
        }
    }

    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Key(_) => ErrorKind::Key,
            Self::Type { .. } => ErrorKind::Type,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Value(_) => ErrorKind::Value,
            Self::Io { .. } => ErrorKind::Io,
            Self::FeatureNotBuilt(_) => ErrorKind::FeatureNotBuilt,
        }
    }

    /// Returns the cast failure behind a type error, if there is one.
    pub fn cast_error(&self) -> Option<&CastError> {
        match self {
            Self::Type { cast, .. } => cast.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::checked_cast;

    #[test]
    fn test_kind_classification() {
        assert_eq!(ConfigError::key("a").kind(), ErrorKind::Key);
        assert_eq!(ConfigError::type_mismatch("a").kind(), ErrorKind::Type);
        assert_eq!(ConfigError::parse("a").kind(), ErrorKind::Parse);
        assert_eq!(ConfigError::value("a").kind(), ErrorKind::Value);
        assert_eq!(
            ConfigError::FeatureNotBuilt("YAML").kind(),
            ErrorKind::FeatureNotBuilt
        );
    }

    #[test]
    fn test_cast_errors_surface_as_type_errors() {
        let cast = checked_cast::<i32, i64>(1 << 40).unwrap_err();
        let err = ConfigError::cast("cannot read 'x'", cast);
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.cast_error().is_some());
        assert!(err.to_string().contains("i64"));
        assert!(err.to_string().contains("i32"));
    }
}
