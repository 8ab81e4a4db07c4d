//! Query matching over references
//!
//! Recomputed from scratch on every query change: given a query, a slice of
//! candidates, the keys to search across, a matching mode, and a set of
//! excluded ids, produce a ranked, truncated list of hits with the matched
//! spans so the caller can render emphasis without re-running the match.

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use notecite_domain::Reference;

/// Default result-list cap, matching the selection UI page size
pub const DEFAULT_MAX_RESULTS: usize = 15;

/// Attribute of a reference that a query is matched against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKey {
    Title,
    Author,
    Year,
}

impl SearchKey {
    /// The three keys the selection surface searches by default
    pub const ALL: [SearchKey; 3] = [SearchKey::Title, SearchKey::Author, SearchKey::Year];

    /// Rendered text of this key for a reference
    pub fn render(&self, reference: &Reference) -> String {
        match self {
            SearchKey::Title => reference.title.clone(),
            SearchKey::Author => reference.first_author_display().unwrap_or_default(),
            SearchKey::Year => reference.year_text(),
        }
    }
}

/// Matching discipline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case- and diacritic-insensitive contiguous substring containment
    Strict,
    /// Ordered-subsequence fuzzy match, ranked
    Loose,
}

/// One ranked match.
///
/// `spans` are byte ranges into `rendered`, the text of the matched key,
/// merged into contiguous runs.
#[derive(Clone, Debug)]
pub struct SearchHit<'a> {
    pub reference: &'a Reference,
    pub key: SearchKey,
    pub rendered: String,
    pub score: i64,
    pub spans: Vec<Range<usize>>,
}

/// Match a query against candidates.
///
/// A candidate matches when ANY key matches; the best-scoring key is
/// reported. Excluded ids are filtered out before ranking and truncation.
/// Ranking is a stable sort on descending score, so ties keep the
/// candidates' input order. An empty or whitespace query matches nothing.
pub fn search<'a>(
    query: &str,
    candidates: &'a [Reference],
    keys: &[SearchKey],
    mode: MatchMode,
    excluded: &HashSet<String>,
    max_results: usize,
) -> Vec<SearchHit<'a>> {
    let query_folded = fold_str(query.trim());
    if query_folded.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit<'a>> = Vec::new();
    for reference in candidates {
        if excluded.contains(&reference.id) {
            continue;
        }

        let mut best: Option<SearchHit<'a>> = None;
        for &key in keys {
            let rendered = key.render(reference);
            let matched = match mode {
                MatchMode::Strict => match_strict(&query_folded, &rendered),
                MatchMode::Loose => match_loose(&query_folded, &rendered),
            };
            if let Some((score, spans)) = matched {
                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(SearchHit {
                        reference,
                        key,
                        rendered,
                        score,
                        spans,
                    });
                }
            }
        }
        if let Some(hit) = best {
            hits.push(hit);
        }
    }

    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(max_results);
    hits
}

/// Lowercased, diacritic-folded form of a single character.
///
/// Decomposes, drops combining marks, then lowercases, so "Müller" and
/// "muller" compare equal. May yield no character (a bare combining mark)
/// or several (expanding case mappings).
fn fold_char(c: char) -> impl Iterator<Item = char> {
    std::iter::once(c)
        .nfd()
        .filter(|d| !is_combining_mark(*d))
        .flat_map(char::to_lowercase)
}

fn fold_str(text: &str) -> String {
    text.chars().flat_map(fold_char).collect()
}

/// Substring containment under folding; earlier positions score higher.
///
/// The match is located character by character in the original text, never
/// in a folded copy, so the reported span stays aligned to `rendered` even
/// when folding changes byte lengths.
fn match_strict(query_folded: &str, text: &str) -> Option<(i64, Vec<Range<usize>>)> {
    for (start, _) in text.char_indices() {
        if let Some(len) = folded_prefix_len(query_folded, &text[start..]) {
            return Some((-(start as i64), vec![start..start + len]));
        }
    }
    None
}

/// Byte length of the shortest prefix of `text` whose folded form equals
/// `query_folded`, if there is one
fn folded_prefix_len(query_folded: &str, text: &str) -> Option<usize> {
    let mut wanted = query_folded.chars();
    let mut expect = wanted.next()?;
    for (pos, c) in text.char_indices() {
        for folded in fold_char(c) {
            if folded != expect {
                return None;
            }
            match wanted.next() {
                Some(next) => expect = next,
                None => return Some(pos + c.len_utf8()),
            }
        }
    }
    None
}

/// Ordered-subsequence match.
///
/// Every query character must appear in the text in order, not necessarily
/// contiguously, compared under folding. Each matching text character
/// scores one point, each contiguous continuation two bonus points, and
/// the first match position is subtracted so earlier matches rank higher.
fn match_loose(query_folded: &str, text: &str) -> Option<(i64, Vec<Range<usize>>)> {
    let mut spans: Vec<Range<usize>> = Vec::new();
    let mut score: i64 = 0;
    let mut first_pos: Option<usize> = None;
    let mut query_chars = query_folded.chars().peekable();

    for (byte_pos, c) in text.char_indices() {
        if query_chars.peek().is_none() {
            break;
        }
        let mut consumed = false;
        for folded in fold_char(c) {
            if query_chars.peek() == Some(&folded) {
                query_chars.next();
                consumed = true;
            } else {
                break;
            }
        }
        if !consumed {
            continue;
        }
        let end = byte_pos + c.len_utf8();
        score += 1;
        if first_pos.is_none() {
            first_pos = Some(byte_pos);
        }
        match spans.last_mut() {
            Some(last) if last.end == byte_pos => {
                last.end = end;
                score += 2;
            }
            _ => spans.push(byte_pos..end),
        }
    }

    if query_chars.peek().is_some() {
        return None;
    }

    score -= first_pos.unwrap_or(0) as i64;
    Some((score, spans))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notecite_domain::{IssueDate, PersonName};
    use rstest::rstest;

    fn candidate(id: &str, title: &str, family: &str, year: i32) -> Reference {
        Reference::new(id)
            .with_title(title)
            .with_authors(vec![PersonName::new(family, "John")])
            .with_issued(IssueDate::year(year))
    }

    fn no_exclusions() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_strict_substring_case_insensitive() {
        let candidates = vec![
            candidate("a", "Paper One", "Smith", 2020),
            candidate("b", "Paper Two", "Smth", 2021),
        ];
        let hits = search(
            "smith",
            &candidates,
            &SearchKey::ALL,
            MatchMode::Strict,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reference.id, "a");
        assert_eq!(hits[0].key, SearchKey::Author);
    }

    #[test]
    fn test_strict_spans_cover_the_match() {
        let candidates = vec![candidate("a", "Deep Learning", "Smith", 2020)];
        let hits = search(
            "learn",
            &candidates,
            &[SearchKey::Title],
            MatchMode::Strict,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits[0].spans, vec![5..10]);
        assert_eq!(&hits[0].rendered[5..10], "Learn");
    }

    #[test]
    fn test_strict_span_aligned_past_multibyte_casing() {
        // 'ẞ' lowercases to the shorter "ß"; the span must still land on
        // character boundaries of the rendered text
        let candidates = vec![candidate("a", "ẞX marks the spot", "Smith", 2020)];
        let hits = search(
            "x marks",
            &candidates,
            &[SearchKey::Title],
            MatchMode::Strict,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits.len(), 1);
        let span = hits[0].spans[0].clone();
        assert_eq!(&hits[0].rendered[span], "X marks");
    }

    #[rstest]
    #[case(MatchMode::Strict)]
    #[case(MatchMode::Loose)]
    fn test_diacritics_fold_both_ways(#[case] mode: MatchMode) {
        let candidates = vec![
            candidate("accented", "Paper One", "Müller", 2020),
            candidate("plain", "Paper Two", "Muller", 2021),
        ];
        for query in ["muller", "Müller"] {
            let hits = search(
                query,
                &candidates,
                &[SearchKey::Author],
                mode,
                &no_exclusions(),
                DEFAULT_MAX_RESULTS,
            );
            assert_eq!(hits.len(), 2, "query {query:?}");
        }
    }

    #[test]
    fn test_folded_span_covers_accented_family() {
        let candidates = vec![candidate("a", "Paper", "Müller", 2020)];
        let hits = search(
            "muller",
            &candidates,
            &[SearchKey::Author],
            MatchMode::Strict,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        let span = hits[0].spans[0].clone();
        assert_eq!(&hits[0].rendered[span], "Müller");
    }

    #[test]
    fn test_loose_subsequence_matches() {
        let candidates = vec![candidate("a", "Paper", "Smith", 2020)];
        let hits = search(
            "smh",
            &candidates,
            &[SearchKey::Author],
            MatchMode::Loose,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits.len(), 1);
        // "John Smith": s m from Smith, h from the end
        assert!(hits[0].spans.len() >= 2);
    }

    #[test]
    fn test_loose_contiguous_run_ranks_higher() {
        let candidates = vec![
            candidate("gap", "Paper", "Smith", 2020),
            candidate("run", "Paper", "Smha", 2020),
        ];
        let hits = search(
            "smh",
            &candidates,
            &[SearchKey::Author],
            MatchMode::Loose,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].reference.id, "run");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_loose_ties_keep_input_order() {
        let candidates = vec![
            candidate("first", "Same Title", "Adams", 2020),
            candidate("second", "Same Title", "Baker", 2020),
        ];
        let hits = search(
            "same",
            &candidates,
            &[SearchKey::Title],
            MatchMode::Loose,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits[0].reference.id, "first");
        assert_eq!(hits[1].reference.id, "second");
    }

    #[rstest]
    #[case(MatchMode::Strict)]
    #[case(MatchMode::Loose)]
    fn test_excluded_never_returned(#[case] mode: MatchMode) {
        // Even the best textual match stays out once excluded
        let candidates = vec![candidate("best", "Exact Match", "Smith", 2020)];
        let mut excluded = HashSet::new();
        excluded.insert("best".to_string());
        let hits = search(
            "exact match",
            &candidates,
            &SearchKey::ALL,
            mode,
            &excluded,
            DEFAULT_MAX_RESULTS,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_year_key_matches_digits() {
        let candidates = vec![
            candidate("a", "One", "Smith", 2020),
            candidate("b", "Two", "Doe", 1999),
        ];
        let hits = search(
            "2020",
            &candidates,
            &SearchKey::ALL,
            MatchMode::Strict,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reference.id, "a");
        assert_eq!(hits[0].key, SearchKey::Year);
    }

    #[test]
    fn test_truncation_after_ranking() {
        let candidates: Vec<Reference> = (0..30)
            .map(|i| candidate(&format!("id{i}"), "Common Title", "Smith", 2020))
            .collect();
        let hits = search(
            "common",
            &candidates,
            &[SearchKey::Title],
            MatchMode::Strict,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits.len(), DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let candidates = vec![candidate("a", "Paper", "Smith", 2020)];
        let hits = search(
            "   ",
            &candidates,
            &SearchKey::ALL,
            MatchMode::Loose,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_candidate_with_no_author_or_year() {
        let candidates = vec![Reference::new("bare").with_title("Only a Title")];
        let hits = search(
            "title",
            &candidates,
            &SearchKey::ALL,
            MatchMode::Strict,
            &no_exclusions(),
            DEFAULT_MAX_RESULTS,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, SearchKey::Title);
    }
}
