//! Session settings read from TOML.
//!
//! ```toml
//! definition = "games/fire_in_the_lake.ron"
//! seed = 1968
//! players = 4
//!
//! [kernel]
//! max_auto_steps = 512
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use turnflow_content::{GameLoader, LoadedGame};
use turnflow_core::KernelConfig;

use crate::error::{Result, SessionError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Game definition file. Relative paths resolve against the config file.
    pub definition: PathBuf,
    pub seed: u64,
    pub players: u8,
    #[serde(default)]
    pub kernel: KernelConfig,
    /// Where finished replay logs are stored, if anywhere.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
        let mut config: SessionConfig = toml::from_str(&text)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;

        let base = path.parent().unwrap_or(Path::new(""));
        if config.definition.is_relative() {
            config.definition = base.join(&config.definition);
        }
        if let Some(dir) = config.log_dir.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        Ok(config)
    }

    /// Loads and validates the configured definition.
    pub fn load_definition(&self) -> Result<LoadedGame> {
        GameLoader::load_validated(&self.definition).map_err(|e| SessionError::Config(format!("{e:#}")))
    }
}
