//! Kernel configuration loader.

use std::path::Path;

use turnflow_core::KernelConfig;

use crate::loaders::{LoadResult, read_toml};

/// Loader for kernel limits from TOML files.
///
/// Every field is optional; missing ones keep the kernel defaults.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<KernelConfig> {
        let config: KernelConfig = read_toml(path, "kernel config")?;
        if config.max_auto_steps == 0 {
            anyhow::bail!("max_auto_steps must be positive in {}", path.display());
        }
        Ok(config)
    }
}
