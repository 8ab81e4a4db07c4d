//! Author name representation and parsing

use serde::{Deserialize, Serialize};

/// A single author of a reference.
///
/// `family` always holds something when the source token was non-empty;
/// a token that does not split into exactly two parts at a comma is kept
/// whole in `family` with an empty `given`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonName {
    pub given: String,
    pub family: String,
}

impl PersonName {
    /// Create a name from family and given parts
    pub fn new(family: impl Into<String>, given: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
        }
    }

    /// Format as "Given Family" for display
    pub fn display_name(&self) -> String {
        if self.given.is_empty() {
            self.family.clone()
        } else {
            format!("{} {}", self.given, self.family)
        }
    }

    /// First initial of the given name followed by a period, e.g. "J."
    ///
    /// Empty when there is no given name.
    pub fn given_initial(&self) -> String {
        match self.given.chars().next() {
            Some(c) => {
                let mut s: String = c.to_uppercase().collect();
                s.push('.');
                s
            }
            None => String::new(),
        }
    }
}

/// Split a BibTeX author field into individual raw author tokens.
///
/// Handles " and " separators (BibTeX style) and ";" separators.
pub fn split_authors(author_field: &str) -> Vec<String> {
    author_field
        .split(" and ")
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a single raw author token into a PersonName.
///
/// "Family, Given" splits at the first comma; "Given Family" splits at
/// whitespace when the token has exactly two words. Anything that does not
/// split into exactly two parts (a bare surname, a corporate name, a token
/// with several commas) is kept whole as the family part.
pub fn parse_person_name(input: &str) -> PersonName {
    let trimmed = input.trim();

    if let Some(comma_pos) = trimmed.find(',') {
        let family = trimmed[..comma_pos].trim();
        let given = trimmed[comma_pos + 1..].trim();
        if !given.contains(',') && !family.is_empty() {
            return PersonName::new(family, given);
        }
        return PersonName::new(trimmed, "");
    }

    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    match parts.as_slice() {
        [given, family] => PersonName::new(*family, *given),
        _ => PersonName::new(trimmed, ""),
    }
}

/// Parse a full author field into an ordered list of PersonNames.
///
/// Insertion order is document order; the list may be empty.
pub fn parse_author_field(author_field: &str) -> Vec<PersonName> {
    split_authors(author_field)
        .iter()
        .map(|token| parse_person_name(token))
        .collect()
}
