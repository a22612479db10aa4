//! Advisory identifier grammar
//!
//! Recognized shapes, sniffed by prefix and separator:
//!
//! - `CVE-2022-1234` (four digit year, identifier of four or more digits)
//! - `MS17-010` (two digit year, expanded to 2017)
//! - `RHSA-2022:6187` (colon before the identifier)
//! - `GHSA-3hhc-qp5v-9p2j` (no year)

use super::compile;
use crate::error::FormatError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Advisory namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdvisoryPrefix {
    Cve,
    Ms,
    Rhsa,
    Ghsa,
}

impl AdvisoryPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisoryPrefix::Cve => "CVE",
            AdvisoryPrefix::Ms => "MS",
            AdvisoryPrefix::Rhsa => "RHSA",
            AdvisoryPrefix::Ghsa => "GHSA",
        }
    }

    /// Whether identifiers in this namespace carry a year
    pub fn has_year(&self) -> bool {
        !matches!(self, AdvisoryPrefix::Ghsa)
    }
}

impl fmt::Display for AdvisoryPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed advisory identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryAttributes {
    pub prefix: AdvisoryPrefix,
    pub year: Option<u16>,
    pub identifier: String,
    pub full_id: String,
}

impl AdvisoryAttributes {
    /// Rebuild the identifier text from its parts
    pub fn canonical_id(&self) -> String {
        match (self.prefix, self.year) {
            (AdvisoryPrefix::Cve, Some(year)) => format!("CVE-{year}-{}", self.identifier),
            (AdvisoryPrefix::Ms, Some(year)) => {
                format!("MS{:02}-{}", year % 100, self.identifier)
            }
            (AdvisoryPrefix::Rhsa, Some(year)) => format!("RHSA-{year}:{}", self.identifier),
            (AdvisoryPrefix::Ghsa, None) => format!("GHSA-{}", self.identifier),
            _ => self.full_id.clone(),
        }
    }
}

struct Shape {
    prefix: AdvisoryPrefix,
    regex: Regex,
}

fn shapes() -> &'static [Shape] {
    static INSTANCE: OnceLock<Vec<Shape>> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        vec![
            Shape {
                prefix: AdvisoryPrefix::Cve,
                regex: compile(r"^CVE-(?P<year>\d{4})-(?P<id>\d{4,})$"),
            },
            Shape {
                prefix: AdvisoryPrefix::Ms,
                regex: compile(r"^MS(?P<year>\d{2})-(?P<id>\d{3})$"),
            },
            Shape {
                prefix: AdvisoryPrefix::Rhsa,
                regex: compile(r"^RHSA-(?P<year>\d{4}):(?P<id>\d{4,})$"),
            },
            Shape {
                prefix: AdvisoryPrefix::Ghsa,
                regex: compile(r"^GHSA-(?P<id>[0-9a-z]{4}-[0-9a-z]{4}-[0-9a-z]{4})$"),
            },
        ]
    })
}

/// Parse an advisory identifier
pub fn parse(text: &str) -> Result<AdvisoryAttributes, FormatError> {
    let trimmed = text.trim();
    let unrecognized = || FormatError::UnrecognizedAdvisory(text.to_string());

    let (shape, caps) = shapes()
        .iter()
        .find_map(|shape| shape.regex.captures(trimmed).map(|caps| (shape, caps)))
        .ok_or_else(unrecognized)?;

    let year = match caps.name("year") {
        Some(m) => {
            let digits: u16 = m.as_str().parse().map_err(|_| unrecognized())?;
            Some(if shape.prefix == AdvisoryPrefix::Ms {
                2000 + digits
            } else {
                digits
            })
        }
        None => None,
    };

    Ok(AdvisoryAttributes {
        prefix: shape.prefix,
        year,
        identifier: caps
            .name("id")
            .map(|m| m.as_str().to_string())
            .ok_or_else(unrecognized)?,
        full_id: trimmed.to_string(),
    })
}
