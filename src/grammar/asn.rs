//! ASN range line grammar
//!
//! One tab-separated line per announced range, as published by iptoasn:
//!
//! ```text
//! 4.0.0.0	4.7.168.255	3356	US	LEVEL3
//! ```

use crate::error::FormatError;
use crate::range::{self, IpVersion};
use serde::{Deserialize, Serialize};

/// Country column value for ranges with no registered country
const NO_COUNTRY: &str = "None";

/// Description column value for unannounced ranges
const NOT_ROUTED: &str = "Not routed";

/// Parsed ASN range record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnAttributes {
    pub version: IpVersion,
    /// Canonical text of the first address in the range
    pub range_start: String,
    /// Canonical text of the last address in the range
    pub range_end: String,
    pub number: u32,
    pub country_code: Option<String>,
    pub name: Option<String>,
}

impl AsnAttributes {
    /// Build attributes from already-separated fields
    ///
    /// Address text is re-rendered canonically so `::FFFF:1` and `::ffff:1`
    /// share a key. Range ordering is checked when the record is validated.
    pub fn new(
        range_start: &str,
        range_end: &str,
        number: u32,
        country_code: Option<&str>,
        name: Option<&str>,
    ) -> Result<Self, FormatError> {
        let start = range::encode(range_start.trim())?;
        let end = range::encode(range_end.trim())?;

        Ok(Self {
            version: start.version(),
            range_start: start.to_addr().to_string(),
            range_end: end.to_addr().to_string(),
            number,
            country_code: country_code
                .map(str::trim)
                .filter(|cc| !cc.is_empty() && *cc != NO_COUNTRY)
                .map(str::to_string),
            name: name
                .map(str::trim)
                .filter(|name| !name.is_empty() && *name != NOT_ROUTED)
                .map(str::to_string),
        })
    }
}

/// Parse one tab-separated line
///
/// The description column may be missing.
pub fn parse_line(text: &str) -> Result<AsnAttributes, FormatError> {
    let invalid = || FormatError::InvalidAsnLine(text.to_string());
    let columns: Vec<&str> = text.trim_end_matches(&['\r', '\n'][..]).split('\t').collect();

    let (start, end, number, country, name) = match columns[..] {
        [start, end, number, country] => (start, end, number, country, None),
        [start, end, number, country, name] => (start, end, number, country, Some(name)),
        _ => return Err(invalid()),
    };

    let number = number
        .trim()
        .trim_start_matches("AS")
        .parse::<u32>()
        .map_err(|_| invalid())?;

    AsnAttributes::new(start, end, number, Some(country), name)
}
