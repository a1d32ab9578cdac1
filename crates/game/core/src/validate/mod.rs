//! Structural validation of game definitions.
//!
//! [`validate`] is the only way to obtain a [`ValidatedDef`]. It reports every
//! problem it finds as a path-addressed [`Diagnostic`]; any error-severity
//! diagnostic withholds the validated definition.
mod structure;
mod suggest;
mod walk;

use std::collections::BTreeSet;
use std::fmt;

use crate::def::{GameDef, ValidatedDef};

pub use suggest::closest;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum DiagnosticCode {
    DuplicateId,
    UnknownReference,
    /// `AddVar`/`TransferVar` on a boolean variable.
    BooleanArithmetic,
    /// Division whose divisor folds to zero.
    DivisionByZero,
    /// Choice over a domain that is empty whatever the state.
    EmptyDomain,
    /// Binder read where it is not guaranteed to be bound.
    UnboundBinder,
    CompoundParam,
    PlayerRange,
    TurnOrder,
    /// `NextInOrder` anchor cannot occur in its static source.
    ShapeMismatch,
    /// Lattice declaration or marker value inconsistent with its lattice.
    Lattice,
    /// Action declared in a way no slot can ever offer.
    Unreachable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    /// Dotted location inside the definition, e.g. `actions[train].stages[0]`.
    pub path: String,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
    /// Names that would have been valid at this location.
    pub alternatives: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            severity: Severity::Error,
            message: message.into(),
            suggestion: None,
            alternatives: Vec::new(),
        }
    }

    pub fn warning(code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, path, message)
        }
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        self.alternatives = alternatives;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] {}: {}", self.severity, self.code, self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean `{suggestion}`?)")?;
        }
        Ok(())
    }
}

/// Checks a definition and brands it when no error is found.
pub fn validate(def: GameDef) -> (Option<ValidatedDef>, Vec<Diagnostic>) {
    let mut diagnostics = structure::check(&def);
    diagnostics.extend(walk::check(&def));

    let mut seen = BTreeSet::new();
    diagnostics.retain(|d| seen.insert((d.path.clone(), d.code, d.message.clone())));

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        tracing::debug!(game = %def.id, errors, "definition rejected");
        return (None, diagnostics);
    }
    tracing::debug!(game = %def.id, warnings = diagnostics.len(), "definition validated");
    (Some(ValidatedDef::intern(def)), diagnostics)
}
