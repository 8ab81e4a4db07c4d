//! The canonical parsed bibliographic entry

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{IssueDate, PersonName};

/// One bibliographic record, keyed by its source-file cite key.
///
/// The `id` is the sole identity used for lookup, selection, and
/// deduplication, and is immutable once the reference is constructed.
/// Typed attributes cover what the formatter and match engine need; every
/// other field survives verbatim in the open `fields` map so additional
/// styles can reach journal, publisher, volume, and friends.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    pub id: String,
    pub entry_type: String,
    pub title: String,
    pub authors: Vec<PersonName>,
    pub issued: Option<IssueDate>,
    pub fields: HashMap<String, String>,
}

impl Reference {
    /// Create a reference with the given cite key and the "misc" entry type
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entry_type: "misc".to_string(),
            title: String::new(),
            authors: Vec::new(),
            issued: None,
            fields: HashMap::new(),
        }
    }

    /// Builder method to set the entry type
    pub fn with_entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = entry_type.into();
        self
    }

    /// Builder method to set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder method to set the author list
    pub fn with_authors(mut self, authors: Vec<PersonName>) -> Self {
        self.authors = authors;
        self
    }

    /// Builder method to set the issue date
    pub fn with_issued(mut self, issued: IssueDate) -> Self {
        self.issued = Some(issued);
        self
    }

    /// Get a raw field value by name (case-insensitive)
    pub fn field(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.fields.get(&lower).map(|v| v.as_str())
    }

    /// Display form of the first author ("Given Family"), if any
    pub fn first_author_display(&self) -> Option<String> {
        self.authors.first().map(|a| a.display_name())
    }

    /// Publication year as digits, empty when absent
    pub fn year_text(&self) -> String {
        self.issued
            .map(|d| d.year.to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let reference = Reference::new("smith2020");
        assert_eq!(reference.entry_type, "misc");
        assert_eq!(reference.title, "");
        assert!(reference.authors.is_empty());
        assert!(reference.issued.is_none());
    }

    #[test]
    fn test_field_lookup_case_insensitive() {
        let mut reference = Reference::new("smith2020");
        reference
            .fields
            .insert("journal".to_string(), "Nature".to_string());
        assert_eq!(reference.field("Journal"), Some("Nature"));
        assert_eq!(reference.field("publisher"), None);
    }

    #[test]
    fn test_first_author_display() {
        let reference = Reference::new("smith2020")
            .with_authors(vec![PersonName::new("Smith", "John")]);
        assert_eq!(
            reference.first_author_display(),
            Some("John Smith".to_string())
        );
        assert_eq!(Reference::new("x").first_author_display(), None);
    }

    #[test]
    fn test_json_round_trip() {
        let reference = Reference::new("smith2020")
            .with_entry_type("article")
            .with_title("A Great Paper")
            .with_authors(vec![PersonName::new("Smith", "John")])
            .with_issued(IssueDate::year(2020));

        let json = serde_json::to_string(&reference).unwrap();
        let parsed: Reference = serde_json::from_str(&json).unwrap();
        assert_eq!(reference, parsed);
    }

    #[test]
    fn test_year_text() {
        let reference = Reference::new("smith2020").with_issued(IssueDate::year(2020));
        assert_eq!(reference.year_text(), "2020");
        assert_eq!(Reference::new("x").year_text(), "");
    }
}
