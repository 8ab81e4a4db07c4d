//! Domain types shared across the notecite crates
//!
//! This crate provides the canonical data model for citation insertion:
//! - Reference: one parsed bibliographic entry, keyed by its cite key
//! - PersonName: a single author with given/family parts
//! - IssueDate: a structured publication date with explicit absence
//!
//! All types are immutable after construction from the parser's point of
//! view: downstream consumers (formatter, match engine) only read them.

pub mod date;
pub mod person;
pub mod reference;

pub use date::IssueDate;
pub use person::{parse_author_field, parse_person_name, split_authors, PersonName};
pub use reference::Reference;
