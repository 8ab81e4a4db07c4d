//! notecite-core: citation insertion core
//!
//! This crate provides pure Rust implementations of:
//! - BibTeX entry parsing (the subset needed for citation insertion)
//! - An in-memory, per-interaction reference store
//! - Inline and author-year styled citation formatting
//! - Strict (substring) and loose (fuzzy subsequence) query matching
//! - The selection state machine and session orchestration
//!
//! The host application owns file reads, the selection UI, and text
//! insertion, and is the only error boundary: nothing in here catches its
//! own errors. See the module docs for the contracts at each seam.

pub mod format;
pub mod parser;
pub mod search;
pub mod selection;
pub mod session;
pub mod store;

pub use format::{format_inline, format_styled, join_inline};
pub use parser::{parse, ParseError};
pub use search::{search, MatchMode, SearchHit, SearchKey, DEFAULT_MAX_RESULTS};
pub use selection::{apply_selection, SelectionAction, SelectionState};
pub use session::{CitationSession, ReferenceSummary, SelectionRequest, SessionError};
pub use store::{NotFoundError, ReferenceStore};

// Re-export the domain model so consumers need only this crate
pub use notecite_domain::{IssueDate, PersonName, Reference};
