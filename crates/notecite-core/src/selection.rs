//! Selection state for the citation-picking interaction
//!
//! The host glue drives this from its own event loop: each UI event maps to
//! a `SelectionAction`, and `apply_selection` is the synchronous state
//! transition. The core never owns an event loop.

use std::collections::HashSet;

/// Ordered set of selected cite keys.
///
/// Order is the order the user picked references in and is preserved all
/// the way to the inserted text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Vec<String>,
}

/// A user action against the current selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionAction {
    Add(String),
    Remove(String),
    Clear,
}

/// Apply one action, producing the next state.
///
/// Adding an id that is already selected is a no-op; removing an absent id
/// is a no-op.
pub fn apply_selection(mut state: SelectionState, action: SelectionAction) -> SelectionState {
    match action {
        SelectionAction::Add(id) => {
            if !state.selected.iter().any(|s| s == &id) {
                state.selected.push(id);
            }
        }
        SelectionAction::Remove(id) => {
            state.selected.retain(|s| s != &id);
        }
        SelectionAction::Clear => {
            state.selected.clear();
        }
    }
    state
}

impl SelectionState {
    /// Selected ids in selection order
    pub fn ids(&self) -> &[String] {
        &self.selected
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The selection as an exclusion set for the match engine
    pub fn excluded_set(&self) -> HashSet<String> {
        self.selected.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_preserves_order() {
        let mut state = SelectionState::default();
        state = apply_selection(state, SelectionAction::Add("a2".to_string()));
        state = apply_selection(state, SelectionAction::Add("a1".to_string()));
        assert_eq!(state.ids(), ["a2", "a1"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut state = SelectionState::default();
        state = apply_selection(state, SelectionAction::Add("a1".to_string()));
        state = apply_selection(state, SelectionAction::Add("a1".to_string()));
        assert_eq!(state.ids(), ["a1"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut state = SelectionState::default();
        state = apply_selection(state, SelectionAction::Add("a1".to_string()));
        state = apply_selection(state, SelectionAction::Add("a2".to_string()));
        state = apply_selection(state, SelectionAction::Remove("a1".to_string()));
        assert_eq!(state.ids(), ["a2"]);

        state = apply_selection(state, SelectionAction::Remove("ghost".to_string()));
        assert_eq!(state.ids(), ["a2"]);

        state = apply_selection(state, SelectionAction::Clear);
        assert!(state.is_empty());
    }

    #[test]
    fn test_excluded_set() {
        let mut state = SelectionState::default();
        state = apply_selection(state, SelectionAction::Add("a1".to_string()));
        assert!(state.excluded_set().contains("a1"));
        assert!(!state.excluded_set().contains("a2"));
    }
}
