//! One citation-insertion interaction, end to end
//!
//! A session owns exactly one generation of parsed references and the
//! user's selection for the duration of one interaction:
//! parse → populate → query/select → consume. Abandoning the interaction is
//! just dropping the session; there is no partial state to unwind.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use notecite_domain::Reference;

use crate::format::{format_styled, join_inline};
use crate::parser::{parse, ParseError};
use crate::search::{search, MatchMode, SearchHit, SearchKey};
use crate::selection::{apply_selection, SelectionAction, SelectionState};
use crate::store::{NotFoundError, ReferenceStore};

/// Errors surfaced at the session boundary.
///
/// Parse failures abort the whole interaction. A lookup failure at the
/// final-insertion step means the selection and the store went out of
/// sync, which is a programming-invariant violation and fatal to the
/// operation; it is never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("selection out of sync with store: {0}")]
    SelectionDesync(#[from] NotFoundError),
}

/// What the external selection surface receives: the candidate references
/// in summary form plus the matching discipline to apply
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub references: Vec<ReferenceSummary>,
    pub match_mode: MatchMode,
}

/// Summary of one reference for display in the selection surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
}

impl ReferenceSummary {
    fn of(reference: &Reference) -> Self {
        Self {
            id: reference.id.clone(),
            title: reference.title.clone(),
            author: reference.first_author_display().unwrap_or_default(),
            year: reference.issued.map(|d| d.year),
        }
    }
}

/// A single parse→select→consume cycle.
///
/// The store is rebuilt from scratch for each session; nothing persists
/// across interactions.
#[derive(Debug)]
pub struct CitationSession {
    store: ReferenceStore,
    selection: SelectionState,
    mode: MatchMode,
}

impl CitationSession {
    /// Parse `raw_text` and populate a fresh store.
    ///
    /// The first malformed entry aborts the session before it starts.
    pub fn begin(raw_text: &str, mode: MatchMode) -> Result<Self, ParseError> {
        let references = parse(raw_text)?;
        debug!(count = references.len(), "parsed reference file");

        let mut store = ReferenceStore::new();
        store.set_references(references);

        Ok(Self {
            store,
            selection: SelectionState::default(),
            mode,
        })
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Run the match engine over the store, excluding already-chosen ids
    pub fn query(&self, query: &str, keys: &[SearchKey], max_results: usize) -> Vec<SearchHit<'_>> {
        search(
            query,
            self.store.as_slice(),
            keys,
            self.mode,
            &self.selection.excluded_set(),
            max_results,
        )
    }

    /// Apply one selection action from the host's event loop
    pub fn apply(&mut self, action: SelectionAction) {
        self.selection = apply_selection(std::mem::take(&mut self.selection), action);
    }

    /// Payload for the external selection surface
    pub fn selection_request(&self) -> SelectionRequest {
        SelectionRequest {
            references: self.store.iter().map(ReferenceSummary::of).collect(),
            match_mode: self.mode,
        }
    }

    /// Produce the text to hand back to the caller for insertion: inline
    /// tokens in selection order, separated by single spaces.
    ///
    /// An empty selection yields an empty string, meaning "no-op". An
    /// unresolvable id here is a `SelectionDesync` error.
    pub fn insert_text(&self) -> Result<String, SessionError> {
        let mut selected = Vec::with_capacity(self.selection.ids().len());
        for id in self.selection.ids() {
            selected.push(self.store.get_by_id(id)?);
        }
        let text = join_inline(selected);
        debug!(ids = ?self.selection.ids(), "built insertion text");
        Ok(text)
    }

    /// Render styled bibliography entries for the ids cited in a document.
    ///
    /// Ids are deduplicated keeping first occurrence; ids that fail lookup
    /// are silently skipped, so a partial bibliography is possible and
    /// never a fatal error.
    pub fn bibliography(&self, ids: &[String]) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        ids.iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.store.get_by_id(id).ok())
            .map(format_styled)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ENTRIES: &str = r#"
@article{a1,
    author = {Smith, John},
    title = {First Paper},
    year = {2020},
}
@article{a2,
    author = {Doe, Jane},
    title = {Second Paper},
    year = {2021},
}
"#;

    fn add(session: &mut CitationSession, id: &str) {
        session.apply(SelectionAction::Add(id.to_string()));
    }

    #[test]
    fn test_end_to_end_selection_order() {
        let mut session = CitationSession::begin(TWO_ENTRIES, MatchMode::Strict).unwrap();
        add(&mut session, "a2");
        add(&mut session, "a1");

        assert_eq!(session.insert_text().unwrap(), "[@a2] [@a1]");
    }

    #[test]
    fn test_empty_selection_is_a_no_op() {
        let session = CitationSession::begin(TWO_ENTRIES, MatchMode::Strict).unwrap();
        assert_eq!(session.insert_text().unwrap(), "");
    }

    #[test]
    fn test_query_excludes_selected() {
        let mut session = CitationSession::begin(TWO_ENTRIES, MatchMode::Strict).unwrap();
        let before = session.query("paper", &SearchKey::ALL, 10);
        assert_eq!(before.len(), 2);

        add(&mut session, "a1");
        let after = session.query("paper", &SearchKey::ALL, 10);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].reference.id, "a2");
    }

    #[test]
    fn test_selection_desync_is_fatal() {
        let mut session = CitationSession::begin(TWO_ENTRIES, MatchMode::Strict).unwrap();
        add(&mut session, "ghost");

        let err = session.insert_text().unwrap_err();
        assert!(matches!(err, SessionError::SelectionDesync(_)));
    }

    #[test]
    fn test_bibliography_skips_missing_and_dedups() {
        let session = CitationSession::begin(TWO_ENTRIES, MatchMode::Strict).unwrap();
        let entries = session.bibliography(&[
            "a2".to_string(),
            "missing".to_string(),
            "a1".to_string(),
            "a2".to_string(),
        ]);

        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("Doe, J. (2021)."));
        assert!(entries[1].starts_with("Smith, J. (2020)."));
    }

    #[test]
    fn test_duplicate_ids_in_source_last_wins() {
        let input = r#"
@article{dup, title = {Old Title}, year = {2019}}
@article{dup, title = {New Title}, year = {2020}}
"#;
        let session = CitationSession::begin(input, MatchMode::Strict).unwrap();
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.store().get_by_id("dup").unwrap().title, "New Title");
    }

    #[test]
    fn test_selection_request_round_trips_as_json() {
        let session = CitationSession::begin(TWO_ENTRIES, MatchMode::Loose).unwrap();
        let request = session.selection_request();
        assert_eq!(request.references.len(), 2);
        assert_eq!(request.references[0].author, "John Smith");

        let json = serde_json::to_string(&request).unwrap();
        let parsed: SelectionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.references[1].id, "a2");
        assert_eq!(parsed.match_mode, MatchMode::Loose);
    }

    #[test]
    fn test_parse_failure_aborts_session() {
        assert!(CitationSession::begin("@article{broken,", MatchMode::Strict).is_err());
    }
}
