//! Merge rules: built-in defaults form the lowest layer.

use crate::config::BranchstackConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Config builder seeded with every default value.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&BranchstackConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
