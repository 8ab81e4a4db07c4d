//! In-memory reference store for one interaction session
//!
//! The store is caller-owned and rebuilt from scratch per invocation; it is
//! not versioned or transactional. It holds exactly one generation of
//! references, indexed by cite key, with insertion order preserved.

use std::collections::HashMap;

use notecite_domain::Reference;

/// Error raised when a cite key is absent from the store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reference not found: {id}")]
pub struct NotFoundError {
    pub id: String,
}

/// Keyed holder of parsed references.
///
/// Duplicate ids never produce two live entries: inserting an id that is
/// already present replaces the previous holder in place, keeping its
/// original position (last write wins, matching BibTeX semantics).
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    references: Vec<Reference>,
    index: HashMap<String, usize>,
}

impl ReferenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire current generation with `references`.
    ///
    /// No merge with any prior set takes place.
    pub fn set_references(&mut self, references: Vec<Reference>) {
        self.references.clear();
        self.index.clear();

        for reference in references {
            match self.index.get(&reference.id) {
                Some(&pos) => self.references[pos] = reference,
                None => {
                    self.index
                        .insert(reference.id.clone(), self.references.len());
                    self.references.push(reference);
                }
            }
        }
    }

    /// Look up a reference by its cite key
    pub fn get_by_id(&self, id: &str) -> Result<&Reference, NotFoundError> {
        self.index
            .get(id)
            .map(|&pos| &self.references[pos])
            .ok_or_else(|| NotFoundError { id: id.to_string() })
    }

    /// All references in insertion order
    pub fn as_slice(&self) -> &[Reference] {
        &self.references
    }

    /// Iterate references in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}
