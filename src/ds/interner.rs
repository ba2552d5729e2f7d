//! Key interner mapping string identities to dense, insertion-ordered handles.
//!
//! The dependency graph uses handles as vector indices and relies on handle
//! order matching first-seen order to break topological ties deterministically.

use rustc_hash::FxHashMap;

/// Monotonic interner that assigns a `usize` handle to each unique key.
#[derive(Debug, Default, Clone)]
pub struct KeyInterner {
    index: FxHashMap<String, usize>,
    keys: Vec<String>,
}

impl KeyInterner {
    /// Creates an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `key`, inserting it if missing.
    pub fn intern(&mut self, key: &str) -> usize {
        if let Some(&handle) = self.index.get(key) {
            return handle;
        }
        let handle = self.keys.len();
        self.keys.push(key.to_owned());
        self.index.insert(key.to_owned(), handle);
        handle
    }

    /// Returns the handle for `key` if it exists.
    pub fn get_handle(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Resolves a handle to its original key.
    pub fn resolve(&self, handle: usize) -> Option<&str> {
        self.keys.get(handle).map(String::as_str)
    }

    /// Returns the number of interned keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no keys are interned.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates keys in handle (first-seen) order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}
