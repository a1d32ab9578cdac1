use crate::state::Value;

/// Binding scope of the effect interpreter.
///
/// A flat stack of `(name, value)` pairs searched from the top. Lexical
/// constructs record a mark and truncate back to it on exit. Triggers raise a
/// barrier so their bodies cannot observe the bindings of the effect that
/// fired them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scope {
    entries: Vec<(String, Value)>,
    barrier: usize,
}

impl Scope {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            barrier: 0,
        }
    }

    pub fn from_bindings(bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: bindings.into_iter().collect(),
            barrier: 0,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries[self.barrier..]
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    pub fn truncate(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    pub fn barrier(&self) -> usize {
        self.barrier
    }

    /// Hides every current binding. Returns the previous barrier.
    pub fn raise_barrier(&mut self) -> usize {
        std::mem::replace(&mut self.barrier, self.entries.len())
    }

    pub fn restore_barrier(&mut self, barrier: usize) {
        self.barrier = barrier;
    }

    /// Visible names, innermost last, without shadowed duplicates.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.entries[self.barrier..] {
            names.retain(|n| n != name);
            names.push(name);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_bindings_shadow_and_truncate() {
        let mut scope = Scope::new();
        scope.bind("x", Value::Int(1));
        let mark = scope.mark();
        scope.bind("x", Value::Int(2));
        assert_eq!(scope.get("x"), Some(&Value::Int(2)));
        scope.truncate(mark);
        assert_eq!(scope.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn barrier_hides_outer_bindings() {
        let mut scope = Scope::new();
        scope.bind("space", Value::str("hue"));
        let saved = scope.raise_barrier();
        assert_eq!(scope.get("space"), None);
        scope.bind("n", Value::Int(3));
        assert_eq!(scope.names(), vec!["n"]);
        scope.truncate(1);
        scope.restore_barrier(saved);
        assert_eq!(scope.get("space"), Some(&Value::str("hue")));
    }
}
