//! Content factory for loading a whole data directory.

use std::path::{Path, PathBuf};

use turnflow_core::KernelConfig;

use crate::loaders::{ConfigLoader, GameLoader, LoadResult, LoadedGame, TablesLoader};

/// Content factory that loads game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── games/
/// │   └── fire_in_the_lake.ron
/// └── tables/
///     └── fire_in_the_lake.toml
/// ```
///
/// The tables file is optional. Its tables are appended to the definition's
/// own before validation, so a duplicate id is reported like any other.
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Kernel limits from `config.toml`, or the defaults when it is absent.
    pub fn load_config(&self) -> LoadResult<KernelConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            return Ok(KernelConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Loads and validates `games/{name}.ron`, merging `tables/{name}.toml`.
    pub fn load_game(&self, name: &str) -> LoadResult<LoadedGame> {
        let path = self.data_dir.join("games").join(format!("{name}.ron"));
        let mut def = GameLoader::load(&path)?;

        let tables = self.data_dir.join("tables").join(format!("{name}.toml"));
        if tables.exists() {
            def.tables.extend(TablesLoader::load(&tables)?);
        }
        GameLoader::validate(def).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
