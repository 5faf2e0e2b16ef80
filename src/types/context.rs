//! Deduplicating snippet collection for one retrieval
//!
//! Set semantics over snippet text with insertion order preserved, so the
//! compiled context block is deterministic for a given retrieval sequence.

use std::collections::HashSet;

/// Collection of retrieved passage snippets with no duplicates
#[derive(Debug, Clone, Default)]
pub struct Context {
    snippets: Vec<String>,
    seen: HashSet<String>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snippet, returns false if identical text was already present
    pub fn insert(&mut self, snippet: impl Into<String>) -> bool {
        let snippet = snippet.into();
        if self.seen.contains(&snippet) {
            return false;
        }
        self.seen.insert(snippet.clone());
        self.snippets.push(snippet);
        true
    }

    /// Union another context into this one
    pub fn union(&mut self, other: Context) {
        for snippet in other.snippets {
            self.insert(snippet);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.snippets.iter().map(String::as_str)
    }

    /// Snippets joined with newlines, the form consumed by the compiler
    pub fn joined(&self) -> String {
        self.snippets.join("\n")
    }

    /// Snippets as an owned list, the form archived into run metadata
    pub fn to_vec(&self) -> Vec<String> {
        self.snippets.clone()
    }
}

impl FromIterator<String> for Context {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for snippet in iter {
            ctx.insert(snippet);
        }
        ctx
    }
}
