//! Entry points that assemble the configuration layers.

use crate::config::{merge, sources, BranchstackConfig};
use config::{ConfigError, File};
use std::path::Path;
use tracing::debug;

/// Loads [`BranchstackConfig`] from defaults, files and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global file, then `<workspace_root>/branchstack.toml`,
    /// then `BRANCHSTACK__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<BranchstackConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::environment::add_to_builder(builder);
        let config: BranchstackConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Loaded configuration");
        Ok(config)
    }

    /// Defaults overlaid with one explicit file; no global file or environment.
    pub fn load_from_file(path: &Path) -> Result<BranchstackConfig, ConfigError> {
        merge::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .build()?
            .try_deserialize()
    }
}
