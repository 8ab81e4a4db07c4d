//! BibTeX entry parser
//!
//! Single-pass parser for the subset of BibTeX needed for citation
//! insertion:
//! - `@type{key, field = value, ...}` entries
//! - Braced and quoted field values with nested braces
//! - Backslash escapes inside values
//! - `@string` definitions with `#` concatenation
//! - `@comment` and `@preamble` blocks (skipped)
//! - `%` line comments between entries
//!
//! The parser does not recover: the first malformed entry aborts the whole
//! parse with a `ParseError` carrying the byte offset and line of the entry
//! that failed.

use std::collections::HashMap;

use lazy_static::lazy_static;
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::map,
    IResult,
};
use regex::Regex;

use notecite_domain::{parse_author_field, IssueDate, Reference};

lazy_static! {
    /// Leading `year[-month[-day]]` numeric groups of a date-bearing field
    static ref DATE_RE: Regex =
        Regex::new(r"^\s*(\d{4})(?:-(\d{1,2})(?:-(\d{1,2}))?)?").unwrap();
}

/// Error raised when the source text is not well-formed at the entry level.
///
/// `offset` is the byte offset of the start of the entry that failed;
/// `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at line {line}, offset {offset}: {message}")]
pub struct ParseError {
    pub offset: usize,
    pub line: u32,
    pub message: String,
}

/// Parse raw BibTeX text into an ordered sequence of references.
///
/// Entry order is document order. Duplicate cite keys are not resolved
/// here; the store applies last-write-wins when populated. Text outside
/// any `@` entry is ignored, matching BibTeX's implicit-comment rule.
pub fn parse(input: &str) -> Result<Vec<Reference>, ParseError> {
    let mut references = Vec::new();
    let mut strings: HashMap<String, String> = HashMap::new();
    let mut remaining = input;

    loop {
        let (rest, _) = skip_whitespace_and_comments(remaining);
        remaining = rest;

        if remaining.is_empty() {
            break;
        }

        if !remaining.starts_with('@') {
            match remaining.find('@') {
                Some(pos) => {
                    remaining = &remaining[pos..];
                    continue;
                }
                None => break,
            }
        }

        let entry_offset = input.len() - remaining.len();
        match parse_at_entry(remaining, &strings) {
            Ok((rest, parsed)) => {
                match parsed {
                    AtEntry::Entry(reference) => references.push(reference),
                    AtEntry::String(key, value) => {
                        strings.insert(key, value);
                    }
                    AtEntry::Skipped => {}
                }
                remaining = rest;
            }
            Err(err) => {
                return Err(ParseError {
                    offset: entry_offset,
                    line: line_at(input, entry_offset),
                    message: describe_failure(err),
                });
            }
        }
    }

    Ok(references)
}

/// Result of parsing one `@` block
enum AtEntry {
    Entry(Reference),
    String(String, String),
    Skipped,
}

/// 1-based line number of a byte offset
fn line_at(input: &str, offset: usize) -> u32 {
    input[..offset].matches('\n').count() as u32 + 1
}

/// Turn a nom failure into a human-readable reason
fn describe_failure(err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => match e.code {
            nom::error::ErrorKind::TakeWhile1 => {
                "entry is missing a cite key or identifier".to_string()
            }
            nom::error::ErrorKind::Char => {
                "unbalanced braces or quotes, or missing separator".to_string()
            }
            _ => "malformed entry".to_string(),
        },
        nom::Err::Incomplete(_) => "unexpected end of input inside an entry".to_string(),
    }
}

/// Skip whitespace and `%` line comments, returning (rest, skipped)
fn skip_whitespace_and_comments(input: &str) -> (&str, &str) {
    let mut pos = 0;
    let bytes = input.as_bytes();

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
        } else if bytes[pos] == b'%' {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
        } else {
            break;
        }
    }

    (&input[pos..], &input[..pos])
}

/// Parse one `@` block (entry, string, preamble, or comment)
fn parse_at_entry<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, AtEntry> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, tag) = take_while1(|c: char| c.is_ascii_alphanumeric())(rest)?;

    match tag.to_lowercase().as_str() {
        "string" => {
            let (rest, (key, value)) = parse_string_definition(rest, strings)?;
            Ok((rest, AtEntry::String(key, value)))
        }
        "preamble" => {
            let (rest, _) = parse_preamble(rest, strings)?;
            Ok((rest, AtEntry::Skipped))
        }
        "comment" => {
            let (rest, _) = parse_comment_body(rest)?;
            Ok((rest, AtEntry::Skipped))
        }
        _ => {
            let (rest, reference) = parse_entry_body(rest, tag, strings)?;
            Ok((rest, AtEntry::Entry(reference)))
        }
    }
}

/// Parse a `@string{key = value}` definition
fn parse_string_definition<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, key) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, value) = parse_field_value(rest, strings)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('}')(rest)?;

    Ok((rest, (key.to_string(), value)))
}

/// Parse a `@preamble{...}`; the content is discarded
fn parse_preamble<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, ()> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = parse_field_value(rest, strings)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('}')(rest)?;

    Ok((rest, ()))
}

/// Parse a `@comment` body (braced block or rest of line)
fn parse_comment_body(input: &str) -> IResult<&str, ()> {
    let (rest, _) = multispace0(input)?;
    if rest.starts_with('{') {
        let (rest, _) = parse_braced_content(rest)?;
        Ok((rest, ()))
    } else {
        let pos = rest.find('\n').unwrap_or(rest.len());
        Ok((&rest[pos..], ()))
    }
}

/// Parse an entry body: `{key, field = value, ...}`
fn parse_entry_body<'a>(
    input: &'a str,
    entry_type: &str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, Reference> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, _) = multispace0(rest)?;

    let (rest, cite_key) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || "_-:./+".contains(c))(rest)?;
    let (rest, _) = multispace0(rest)?;
    let rest = rest.strip_prefix(',').unwrap_or(rest);

    let (rest, fields) = parse_fields(rest, strings)?;

    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('}')(rest)?;

    Ok((rest, build_reference(cite_key, entry_type, fields)))
}

/// Parse the `name = value` pairs of an entry
fn parse_fields<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, Vec<(String, String)>> {
    let mut fields = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;

        if rest.starts_with('}') {
            return Ok((rest, fields));
        }

        match parse_single_field(rest, strings) {
            Ok((rest, (key, value))) => {
                fields.push((key, value));
                remaining = rest;

                let (rest, _) = multispace0(remaining)?;
                remaining = rest.strip_prefix(',').unwrap_or(rest);
            }
            // Leftover text that is not a field and not the closing
            // brace makes the entry malformed
            Err(err) => return Err(err),
        }
    }
}

/// Parse one `key = value` field
fn parse_single_field<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, key) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, value) = parse_field_value(rest, strings)?;

    Ok((rest, (key.to_string(), value)))
}

/// Parse a field value: braced, quoted, number, or string reference,
/// with `#` concatenation between parts
fn parse_field_value<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, String> {
    let mut result = String::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;

        // Dispatch on the opening delimiter so delimiter errors carry
        // the right reason instead of alt's last-branch error
        let (rest, part) = if rest.starts_with('{') {
            parse_braced_value(rest)?
        } else if rest.starts_with('"') {
            parse_quoted_value(rest)?
        } else {
            alt((
                map(take_while1(|c: char| c.is_ascii_digit()), |s: &str| {
                    s.to_string()
                }),
                map(
                    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
                    |s: &str| strings.get(s).cloned().unwrap_or_else(|| s.to_string()),
                ),
            ))(rest)?
        };

        result.push_str(&part);
        remaining = rest;

        let (rest, _) = multispace0(remaining)?;
        if let Some(stripped) = rest.strip_prefix('#') {
            remaining = stripped;
        } else {
            return Ok((rest, result));
        }
    }
}

/// Parse a braced value, stripping the single outer pair
fn parse_braced_value(input: &str) -> IResult<&str, String> {
    let (rest, content) = parse_braced_content(input)?;
    let inner = &content[1..content.len() - 1];
    Ok((rest, inner.trim().to_string()))
}

/// Scan a balanced braced region including nested braces.
///
/// A backslash escapes the following character, so `\{` and `\}` do not
/// count toward nesting depth. Fails when depth never returns to zero
/// before end of input.
fn parse_braced_content(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('{') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }

    let mut depth = 0;
    let mut pos = 0;
    let bytes = input.as_bytes();

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[pos + 1..], &input[..pos + 1]));
                }
            }
            b'\\' => {
                pos += 1;
            }
            _ => {}
        }
        pos += 1;
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse a quoted value; braces nest inside quotes and a backslash
/// escapes the following character
fn parse_quoted_value(input: &str) -> IResult<&str, String> {
    if !input.starts_with('"') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }

    let mut result = String::new();
    let mut brace_depth = 0;
    let mut chars = input.char_indices().skip(1);

    while let Some((pos, c)) = chars.next() {
        match c {
            '"' if brace_depth == 0 => {
                return Ok((&input[pos + 1..], result.trim().to_string()));
            }
            '{' => {
                brace_depth += 1;
                result.push('{');
            }
            '}' => {
                brace_depth -= 1;
                result.push('}');
            }
            '\\' => {
                // Only delimiter escapes are consumed; LaTeX commands
                // keep their backslash
                if let Some((_, escaped)) = chars.next() {
                    if !matches!(escaped, '"' | '{' | '}' | '\\') {
                        result.push('\\');
                    }
                    result.push(escaped);
                }
            }
            c => result.push(c),
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Build a Reference from the parsed pieces.
///
/// Duplicate field names: last occurrence wins. Known fields populate the
/// typed attributes; everything else is kept verbatim under its lowercased
/// name.
fn build_reference(cite_key: &str, entry_type: &str, fields: Vec<(String, String)>) -> Reference {
    let mut reference = Reference::new(cite_key).with_entry_type(entry_type.to_lowercase());
    let mut date_field: Option<String> = None;
    let mut year_field: Option<String> = None;
    let mut month_field: Option<String> = None;

    for (key, value) in fields {
        let lower = key.to_lowercase();
        match lower.as_str() {
            "title" => reference.title = value,
            "author" => reference.authors = parse_author_field(&value),
            "date" => date_field = Some(value),
            "year" => year_field = Some(value),
            "month" => month_field = Some(value),
            _ => {
                reference.fields.insert(lower, value);
            }
        }
    }

    reference.issued = parse_issued(
        date_field.as_deref(),
        year_field.as_deref(),
        month_field.as_deref(),
    );
    reference
}

/// Extract a structured date from the date-bearing fields.
///
/// The `date` field is tried first; when it does not yield a year, `year`
/// is tried next. An entry with no parseable year yields `None`, never a
/// zeroed date. A numeric `month` field fills in the month when the
/// primary field did not.
fn parse_issued(
    date: Option<&str>,
    year: Option<&str>,
    month: Option<&str>,
) -> Option<IssueDate> {
    let mut issued = date
        .and_then(scan_date_field)
        .or_else(|| year.and_then(scan_date_field))?;

    if issued.month.is_none() {
        if let Some(m) = month.and_then(|m| m.trim().parse::<u32>().ok()) {
            issued = issued.with_month(m);
        }
    }

    Some(issued)
}

fn scan_date_field(source: &str) -> Option<IssueDate> {
    let caps = DATE_RE.captures(source)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;

    let mut issued = IssueDate::year(year);
    if let Some(m) = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) {
        issued = issued.with_month(m);
    }
    if let Some(d) = caps.get(3).and_then(|d| d.as_str().parse::<u32>().ok()) {
        issued = issued.with_day(d);
    }
    Some(issued)
}
