//! Small filesystem helpers used by loading and path adjustment.

use std::path::Path;

use crate::error::{ConfigError, Result};

/// Reads a whole UTF-8 file.
pub fn read_text_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a file and splits it into lines, without line terminators.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    Ok(read_text_file(path)?.lines().map(str::to_string).collect())
}

/// Joins `base` and `relative` using the platform separator.
pub fn join_path(base: impl AsRef<Path>, relative: &str) -> String {
    base.as_ref().join(relative).to_string_lossy().into_owned()
}

pub fn is_absolute(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_absolute()
}
