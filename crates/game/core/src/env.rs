//! Read-only inputs shared by every kernel component.

use crate::config::KernelConfig;
use crate::def::ValidatedDef;

/// Validated definition plus kernel limits.
#[derive(Clone, Copy, Debug)]
pub struct Env<'a> {
    pub def: &'a ValidatedDef,
    pub config: &'a KernelConfig,
}

impl<'a> Env<'a> {
    pub const fn new(def: &'a ValidatedDef, config: &'a KernelConfig) -> Self {
        Self { def, config }
    }
}
