//! Game definition loader.

use std::fmt::Write as _;
use std::path::Path;

use turnflow_core::{Diagnostic, GameDef, ValidatedDef, validate};

use crate::loaders::{LoadResult, read_ron};

/// A definition that passed validation, with whatever warnings it raised.
#[derive(Debug)]
pub struct LoadedGame {
    pub def: ValidatedDef,
    pub warnings: Vec<Diagnostic>,
}

/// Loader for game definitions from RON files.
pub struct GameLoader;

impl GameLoader {
    /// Parses a definition without validating it.
    pub fn load(path: &Path) -> LoadResult<GameDef> {
        read_ron(path, "game definition")
    }

    /// Parses and validates. Error diagnostics are rendered into the returned
    /// error; warnings are logged and handed back.
    pub fn load_validated(path: &Path) -> LoadResult<LoadedGame> {
        let def = Self::load(path)?;
        Self::validate(def).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
    }

    pub fn validate(def: GameDef) -> LoadResult<LoadedGame> {
        let id = def.id.clone();
        let (validated, diagnostics) = validate(def);
        let Some(def) = validated else {
            let errors: Vec<Diagnostic> = diagnostics.into_iter().filter(|d| d.is_error()).collect();
            anyhow::bail!(
                "game `{}` rejected with {} error(s):\n{}",
                id,
                errors.len(),
                render_diagnostics(&errors)
            );
        };
        for warning in &diagnostics {
            tracing::warn!(game = %id, %warning, "definition warning");
        }
        Ok(LoadedGame {
            def,
            warnings: diagnostics,
        })
    }
}

/// One diagnostic per line, with the valid alternatives when there are any.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for d in diagnostics {
        let _ = write!(out, "  {d}");
        if !d.alternatives.is_empty() {
            let _ = write!(out, " [in scope: {}]", d.alternatives.join(", "));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use turnflow_core::def::{ActionDef, Effect, MoveClass, PlayerSel, VarDef, VarRef};

    use super::*;

    fn relay() -> GameDef {
        let mut def = GameDef::new("relay", ["red", "blue"]);
        def.player_vars = vec![VarDef::int("score", 0, 10, 0)];
        def.actions = vec![ActionDef::new("score", MoveClass::Other).stage(
            "effects",
            vec![Effect::add_var(VarRef::player(PlayerSel::Active, "score"), 1)],
        )];
        def
    }

    fn write(def: &GameDef) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.ron");
        let text = ron::ser::to_string_pretty(def, ron::ser::PrettyConfig::default()).unwrap();
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn authored_definition_loads_and_validates() {
        let (_dir, path) = write(&relay());
        let loaded = GameLoader::load_validated(&path).unwrap();
        assert_eq!(loaded.def.def().id, "relay");
        assert!(loaded.def.seat_id("blue").is_some());
        assert!(loaded.warnings.iter().all(|d| !d.is_error()));
    }

    #[test]
    fn rejection_lists_every_error() {
        let mut def = relay();
        def.actions[0].stages[0].effects = vec![
            Effect::add_var(VarRef::player(PlayerSel::Active, "scroe"), 1),
            Effect::add_var(VarRef::global("bank"), 1),
        ];
        let (_dir, path) = write(&def);

        let message = GameLoader::load_validated(&path).unwrap_err().to_string();
        assert!(message.contains("relay.ron"), "{message}");
        assert!(message.contains("2 error(s)"), "{message}");
        assert!(message.contains("did you mean `score`?"), "{message}");
        assert!(message.contains("`bank`"), "{message}");
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(id: \"oops\"").unwrap();

        let err = GameLoader::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse game definition RON"));
    }
}
