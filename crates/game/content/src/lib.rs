//! Data files for the turn-flow kernel.
//!
//! Game definitions are authored in RON, kernel limits and lookup tables in
//! TOML. Loaders parse them into `turnflow-core` types and run the validator,
//! so callers only ever see a [`turnflow_core::ValidatedDef`] or a rendered
//! list of diagnostics.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ConfigLoader, ContentFactory, GameLoader, LoadResult, LoadedGame, TablesLoader,
    render_diagnostics,
};
