/// Registry of user-defined function names for one diagram.
///
/// Function objects register their generated name when created and swap
/// entries on rename. The registry is what rename gestures consult to keep
/// names unique across the whole sketch, including functions whose objects
/// live in nested bodies.
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFunctions {
    names: BTreeSet<String>,
}

impl UserFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the name was already registered.
    pub fn add_function(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let inserted = self.names.insert(name.clone());
        if !inserted {
            tracing::debug!(name = name.as_str(), "function name already registered");
        }
        inserted
    }

    /// Returns false when the name was not registered.
    pub fn delete_function(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
