//! Phone number grammar
//!
//! Four delimiter families, each in three arities:
//!
//! | family        | full                  | local         |
//! |---------------|-----------------------|---------------|
//! | hyphen        | `+1-555-123-4567`     | `123-4567`    |
//! | period        | `+1.555.123.4567`     | `123.4567`    |
//! | space         | `+1 555 123 4567`     | `123 4567`    |
//! | parenthetical | `+1 (555) 123-4567`   | `(555) 123-4567` |

use super::compile;
use crate::error::FormatError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Parsed phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumberAttributes {
    pub country_code: Option<String>,
    pub area_code: Option<String>,
    pub prefix: String,
    pub line_number: String,
    /// `[+CC-][AAA-]PPP-LLLL`, identical across delimiter families
    pub normalized_text: String,
}

/// Raw digit groups before field validation
#[derive(Debug, PartialEq, Eq)]
struct Groups<'a> {
    country_code: Option<&'a str>,
    area_code: Option<&'a str>,
    prefix: &'a str,
    line_number: &'a str,
}

const DELIMITERS: [char; 3] = ['-', '.', ' '];

fn parenthetical_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        compile(
            r"^(?:(?P<cc>\+?[^\s()]+)\s*)?\((?P<area>[^()]*)\)\s*(?P<prefix>[^\s.()\-]*)[\s.\-](?P<line>[^\s.()\-]*)$",
        )
    })
}

/// Parse a phone number
pub fn parse(text: &str) -> Result<PhoneNumberAttributes, FormatError> {
    let trimmed = text.trim();
    let groups = if trimmed.contains(&['(', ')'][..]) {
        split_parenthetical(trimmed)
    } else {
        split_delimited(trimmed)
    }
    .ok_or_else(|| FormatError::InvalidPhoneNumber(text.to_string()))?;

    let country_code = groups
        .country_code
        .map(|cc| digits("country_code", cc.strip_prefix('+').unwrap_or(cc), 1..=2, "1-2"))
        .transpose()?;
    let area_code = groups
        .area_code
        .map(|area| digits("area_code", area, 3..=3, "3"))
        .transpose()?;

    if groups.prefix.is_empty() {
        return Err(FormatError::MissingPhoneField("prefix"));
    }
    if groups.line_number.is_empty() {
        return Err(FormatError::MissingPhoneField("line_number"));
    }
    let prefix = digits("prefix", groups.prefix, 3..=3, "3")?;
    let line_number = digits("line_number", groups.line_number, 4..=4, "4")?;

    let mut normalized_text = String::new();
    if let Some(cc) = &country_code {
        normalized_text.push('+');
        normalized_text.push_str(cc);
        normalized_text.push('-');
    }
    if let Some(area) = &area_code {
        normalized_text.push_str(area);
        normalized_text.push('-');
    }
    normalized_text.push_str(&prefix);
    normalized_text.push('-');
    normalized_text.push_str(&line_number);

    Ok(PhoneNumberAttributes {
        country_code,
        area_code,
        prefix,
        line_number,
        normalized_text,
    })
}

fn split_parenthetical(text: &str) -> Option<Groups<'_>> {
    let caps = parenthetical_regex().captures(text)?;
    let area = caps.name("area")?.as_str().trim();
    if area.is_empty() {
        return None;
    }

    Some(Groups {
        country_code: caps.name("cc").map(|m| m.as_str()),
        area_code: Some(area),
        prefix: caps.name("prefix")?.as_str(),
        line_number: caps.name("line")?.as_str(),
    })
}

/// Split on the first delimiter character seen; other delimiters stay inside
/// the groups and fail field validation
fn split_delimited(text: &str) -> Option<Groups<'_>> {
    let delimiter = text.chars().find(|c| DELIMITERS.contains(c))?;
    let parts: Vec<&str> = text.split(delimiter).collect();

    let groups = match parts[..] {
        [prefix, line] => Groups {
            country_code: None,
            area_code: None,
            prefix,
            line_number: line,
        },
        [area, prefix, line] => Groups {
            country_code: None,
            area_code: Some(area),
            prefix,
            line_number: line,
        },
        [cc, area, prefix, line] => Groups {
            country_code: Some(cc),
            area_code: Some(area),
            prefix,
            line_number: line,
        },
        _ => return None,
    };

    // Absent groups are None; an empty optional group is a shape error
    if groups.country_code.is_some_and(|cc| cc.trim_start_matches('+').is_empty())
        || groups.area_code.is_some_and(str::is_empty)
    {
        return None;
    }

    Some(groups)
}

fn digits(
    field: &'static str,
    value: &str,
    len: std::ops::RangeInclusive<usize>,
    expected: &'static str,
) -> Result<String, FormatError> {
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(FormatError::PhoneFieldNotNumeric {
            field,
            value: value.to_string(),
        });
    }
    if !len.contains(&value.len()) {
        return Err(FormatError::PhoneFieldLength {
            field,
            expected,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_families_are_equivalent() {
        let families = [
            "+1-555-123-4567",
            "+1.555.123.4567",
            "+1 555 123 4567",
            "+1 (555) 123-4567",
            "1-555-123-4567",
        ];

        let expected = parse(families[0]).unwrap();
        assert_eq!(expected.normalized_text, "+1-555-123-4567");
        for text in &families[1..] {
            assert_eq!(parse(text).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn test_arities() {
        let local = parse("123-4567").unwrap();
        assert_eq!(local.country_code, None);
        assert_eq!(local.area_code, None);
        assert_eq!(local.normalized_text, "123-4567");

        let domestic = parse("(555) 123.4567").unwrap();
        assert_eq!(domestic.area_code.as_deref(), Some("555"));
        assert_eq!(domestic.normalized_text, "555-123-4567");

        let international = parse("44 555 123 4567").unwrap();
        assert_eq!(international.country_code.as_deref(), Some("44"));
    }

    #[test]
    fn test_non_numeric_field_is_distinct_from_missing() {
        assert_eq!(
            parse("555-12a-4567"),
            Err(FormatError::PhoneFieldNotNumeric {
                field: "prefix",
                value: "12a".to_string()
            })
        );
        assert_eq!(
            parse("555-123-"),
            Err(FormatError::MissingPhoneField("line_number"))
        );
    }

    #[test]
    fn test_field_lengths() {
        assert_eq!(
            parse("5555-123-4567"),
            Err(FormatError::PhoneFieldLength {
                field: "area_code",
                expected: "3",
                value: "5555".to_string()
            })
        );
        assert_eq!(
            parse("+123-555-123-4567"),
            Err(FormatError::PhoneFieldLength {
                field: "country_code",
                expected: "1-2",
                value: "123".to_string()
            })
        );
    }

    #[test]
    fn test_shape_mismatch() {
        for bad in ["5551234567", "1-2-3-4-5", "() 123-4567", ""] {
            assert_eq!(
                parse(bad),
                Err(FormatError::InvalidPhoneNumber(bad.to_string())),
                "{bad:?}"
            );
        }
    }
}
