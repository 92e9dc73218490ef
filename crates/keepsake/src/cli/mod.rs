//! Command implementations.

pub mod config;
pub mod curate;
pub mod theme;

use keepsake_core::{Config, ConfigError};
use std::path::Path;

/// Load the config from an explicit path, or from the default location.
///
/// An explicit path must exist; the default location may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
