//! Personal name grammar
//!
//! `[prefix[.]] first-name [middle-name|middle-initial[.]] [last-name][, ]suffix[.]`

use super::compile;
use crate::error::FormatError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Honorifics accepted before the first name (exact case)
pub const PREFIXES: &[&str] = &[
    "Mr", "Mrs", "Ms", "Miss", "Dr", "Sir", "Madam", "Master", "Fr", "Rev", "Atty",
];

/// Generational and professional suffixes (matched case-insensitively)
pub const SUFFIXES: &[&str] = &[
    "Jr", "Sr", "II", "III", "IV", "V", "Esq", "CPA", "Dc", "Dds", "Vm", "Jd", "Md", "Phd",
];

/// Leading fragments allowed before an apostrophe (`O'Brian`, `Te'Quan`)
const APOSTROPHE_FRAGMENTS: &str = "O|D|L|Da|De|Di|Du|Ja|La|Le|Sh|Ta|Te";

/// Parsed personal name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonNameAttributes {
    pub prefix: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub middle_initial: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    /// The whole name as given, surrounding whitespace removed
    pub full_text: String,
}

fn name_token_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let part = format!("(?:(?:{APOSTROPHE_FRAGMENTS})'[A-Z][a-z]+|[A-Za-z]+)");
        compile(&format!("^{part}(?:-{part})*$"))
    })
}

fn initial_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| compile(r"^[A-Z]\.?$"))
}

/// Parse a personal name
pub fn parse(text: &str) -> Result<PersonNameAttributes, FormatError> {
    let invalid = || FormatError::InvalidPersonName(text.to_string());
    let full_text = text.trim();

    // A comma may only introduce the suffix
    let (head, mut suffix) = match full_text.split_once(',') {
        Some((head, tail)) => (head, Some(suffix_token(tail.trim()).ok_or_else(invalid)?)),
        None => (full_text, None),
    };

    let mut tokens: Vec<&str> = head.split_whitespace().collect();

    let prefix = match tokens.first() {
        Some(first) if tokens.len() > 1 => prefix_token(first),
        _ => None,
    };
    if prefix.is_some() {
        tokens.remove(0);
    }

    if suffix.is_none() && tokens.len() > 1 {
        if let Some(found) = tokens.last().and_then(|last| suffix_token(last)) {
            suffix = Some(found);
            tokens.pop();
        }
    }

    let (first_name, middle, last_name) = match tokens.as_slice() {
        [first] => (*first, None, None),
        [first, second] if is_initial(second) => (*first, Some(*second), None),
        [first, last] => (*first, None, Some(*last)),
        [first, middle, last] => (*first, Some(*middle), Some(*last)),
        _ => return Err(invalid()),
    };

    if !is_name(first_name) || last_name.is_some_and(|last| !is_name(last)) {
        return Err(invalid());
    }

    let (middle_name, middle_initial) = match middle {
        Some(token) if is_initial(token) => (None, Some(token.trim_end_matches('.').to_string())),
        Some(token) if is_name(token) => (
            Some(token.to_string()),
            token.chars().next().map(|c| c.to_string()),
        ),
        Some(_) => return Err(invalid()),
        None => (None, None),
    };

    Ok(PersonNameAttributes {
        prefix,
        first_name: first_name.to_string(),
        middle_name,
        middle_initial,
        last_name: last_name.map(str::to_string),
        suffix,
        full_text: full_text.to_string(),
    })
}

fn is_name(token: &str) -> bool {
    name_token_regex().is_match(token)
}

fn is_initial(token: &str) -> bool {
    initial_regex().is_match(token)
}

fn prefix_token(token: &str) -> Option<String> {
    let bare = token.strip_suffix('.').unwrap_or(token);
    PREFIXES
        .iter()
        .find(|prefix| **prefix == bare)
        .map(|prefix| prefix.to_string())
}

/// Suffix as written, with any trailing period removed
fn suffix_token(token: &str) -> Option<String> {
    let bare = token.strip_suffix('.').unwrap_or(token);
    SUFFIXES
        .iter()
        .any(|suffix| suffix.eq_ignore_ascii_case(bare))
        .then(|| bare.to_string())
}
