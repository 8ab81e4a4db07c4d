//! Citation formatting
//!
//! Two pure renderings of a Reference:
//! - an inline citation token for embedding in running text
//! - a full author-year styled bibliography entry
//!
//! Both are total over any well-formed Reference: missing optional fields
//! degrade gracefully instead of failing. Output is plain text; any
//! escaping for the target document format is the caller's job.

use notecite_domain::{PersonName, Reference};

/// Placeholder for a missing publication year, per author-year convention
const NO_DATE: &str = "n.d.";

/// Produce a short inline citation token, e.g. `[@smith2020]`.
///
/// The token is id-based and one-way: it is never re-parsed.
pub fn format_inline(reference: &Reference) -> String {
    format!("[@{}]", reference.id)
}

/// Join inline tokens for a selection, separated by a single space.
///
/// Selection order is significant and preserved end to end.
pub fn join_inline<'a>(references: impl IntoIterator<Item = &'a Reference>) -> String {
    references
        .into_iter()
        .map(format_inline)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Produce a full author-year styled bibliography entry.
///
/// Author list: one author "Family, G."; two "Family1, G1., & Family2, G2.";
/// three or more, first author followed by "et al.". Year falls back to
/// "n.d."; the title passes through verbatim. Journal, volume, number,
/// pages, and publisher are drawn from the open field map when present.
pub fn format_styled(reference: &Reference) -> String {
    let year = reference
        .issued
        .map(|d| d.year.to_string())
        .unwrap_or_else(|| NO_DATE.to_string());

    let mut out = String::new();

    let authors = format_author_list(&reference.authors);
    if authors.is_empty() {
        // No authors: the title takes the head position
        if !reference.title.is_empty() {
            push_sentence(&mut out, &reference.title);
            out.push(' ');
        }
        out.push_str(&format!("({}).", year));
    } else {
        out.push_str(&authors);
        out.push_str(&format!(" ({}).", year));
        if !reference.title.is_empty() {
            out.push(' ');
            push_sentence(&mut out, &reference.title);
        }
    }

    push_source_tail(&mut out, reference);
    out
}

/// Render the truncated author list for the styled entry
fn format_author_list(authors: &[PersonName]) -> String {
    match authors {
        [] => String::new(),
        [only] => format_author(only),
        [first, second] => format!("{}, & {}", format_author(first), format_author(second)),
        [first, ..] => format!("{}, et al.", format_author(first)),
    }
}

/// "Family, G." — or the bare family name when there is no given name
fn format_author(author: &PersonName) -> String {
    let initial = author.given_initial();
    if initial.is_empty() {
        author.family.clone()
    } else {
        format!("{}, {}", author.family, initial)
    }
}

/// Append text, closing it with a period unless it already ends in one
fn push_sentence(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.ends_with(['.', '!', '?']) {
        out.push('.');
    }
}

/// Append journal/volume/pages or publisher details from the field map
fn push_source_tail(out: &mut String, reference: &Reference) {
    if let Some(journal) = reference.field("journal") {
        let mut tail = journal.to_string();
        if let Some(volume) = reference.field("volume") {
            tail.push_str(", ");
            tail.push_str(volume);
            if let Some(number) = reference.field("number") {
                tail.push_str(&format!("({})", number));
            }
        }
        if let Some(pages) = reference.field("pages") {
            tail.push_str(", ");
            tail.push_str(pages);
        }
        out.push(' ');
        push_sentence(out, &tail);
    } else if let Some(publisher) = reference.field("publisher") {
        out.push(' ');
        push_sentence(out, publisher);
    }
}
