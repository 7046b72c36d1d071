//! Where the database file lives.

use crate::error::{Result, StoreError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// File name used when none is given
pub const DEFAULT_DB_NAME: &str = "store.db";

static DB_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+\.db$").expect("database name pattern is valid")
});

/// Location of a store's database file: an existing directory plus a file
/// name of the form `name.db`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub name: String,
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(dir: P, name: impl Into<String>) -> Self {
        StoreConfig {
            dir: dir.as_ref().to_path_buf(),
            name: name.into(),
        }
    }

    /// Checks the directory and file name and returns the full file path
    pub fn validate(&self) -> Result<PathBuf> {
        if !self.dir.is_dir() {
            return Err(StoreError::Configuration(format!(
                "directory `{}` does not exist or is not a directory",
                self.dir.display()
            )));
        }
        if !is_valid_db_name(&self.name) {
            return Err(StoreError::Configuration(format!(
                "database name `{}` must look like `name.db`",
                self.name
            )));
        }
        Ok(self.dir.join(&self.name))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::new(".", DEFAULT_DB_NAME)
    }
}

pub fn is_valid_db_name(name: &str) -> bool {
    DB_NAME_PATTERN.is_match(name)
}
