//! X.509 distinguished name grammar
//!
//! Accepts a structured RDN list or either serialized form:
//!
//! - OpenSSL one-line: `/C=US/O=Example Inc/CN=www.example.com`
//! - RFC 4514: `CN=www.example.com,O=Example\, Inc,C=US`
//!
//! All three produce the same [`DistinguishedNameAttributes`] for the same name.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};

/// Attributes of a certificate subject or issuer name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedNameAttributes {
    pub common_name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    /// Exactly two characters when present
    pub country: Option<String>,
}

/// Parse a structured list of `(attribute, value)` pairs
///
/// Unknown attribute types are skipped. When an attribute repeats, the first
/// value wins.
pub fn parse_rdns<K, V>(rdns: &[(K, V)]) -> Result<DistinguishedNameAttributes, FormatError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut attrs = DistinguishedNameAttributes::default();

    for (key, value) in rdns {
        let key = key.as_ref().trim();
        let value = value.as_ref().trim();

        let slot = match key.to_ascii_uppercase().as_str() {
            "CN" | "COMMONNAME" => &mut attrs.common_name,
            "EMAILADDRESS" | "E" => &mut attrs.email,
            "O" | "ORGANIZATIONNAME" => &mut attrs.organization,
            "OU" | "ORGANIZATIONALUNITNAME" => &mut attrs.organizational_unit,
            "L" | "LOCALITYNAME" => &mut attrs.locality,
            "ST" | "S" | "STATEORPROVINCENAME" => &mut attrs.state,
            "C" | "COUNTRYNAME" => &mut attrs.country,
            _ => {
                tracing::debug!("Ignoring distinguished name attribute {}", key);
                continue;
            }
        };

        if value.is_empty() {
            continue;
        }
        if slot.is_none() {
            *slot = Some(value.to_string());
        } else {
            tracing::debug!("Ignoring repeated distinguished name attribute {}", key);
        }
    }

    if let Some(country) = &attrs.country {
        if country.chars().count() != 2 {
            return Err(FormatError::InvalidCountryCode(country.clone()));
        }
    }

    Ok(attrs)
}

/// Parse the serialized string form of a distinguished name
pub fn parse_str(text: &str) -> Result<DistinguishedNameAttributes, FormatError> {
    let trimmed = text.trim();
    let components: Vec<String> = match trimmed.strip_prefix('/') {
        Some(oneline) => oneline.split('/').map(str::to_string).collect(),
        None => split_rfc4514(trimmed),
    };

    let mut rdns = Vec::with_capacity(components.len());
    for component in components.iter().filter(|c| !c.trim().is_empty()) {
        let (key, value) =
            component
                .split_once('=')
                .ok_or_else(|| FormatError::InvalidDistinguishedName {
                    name: text.to_string(),
                    component: component.clone(),
                })?;
        if key.trim().is_empty() {
            return Err(FormatError::InvalidDistinguishedName {
                name: text.to_string(),
                component: component.clone(),
            });
        }
        rdns.push((key.to_string(), value.to_string()));
    }

    parse_rdns(&rdns)
}

/// Split on unescaped `,` / `+` / `;` and resolve backslash escapes
///
/// `\,` and friends become the literal character; `\2C` style hex pairs
/// become the byte they name.
fn split_rfc4514(text: &str) -> Vec<String> {
    let mut components = Vec::new();
    let mut bytes: Vec<u8> = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let hi = chars.next_if(|c| c.is_ascii_hexdigit());
                let lo = hi.and_then(|_| chars.next_if(|c| c.is_ascii_hexdigit()));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        let pair: String = [hi, lo].iter().collect();
                        if let Ok(byte) = u8::from_str_radix(&pair, 16) {
                            bytes.push(byte);
                        }
                    }
                    (Some(hi), None) => push_char(&mut bytes, hi),
                    _ => {
                        if let Some(escaped) = chars.next() {
                            push_char(&mut bytes, escaped);
                        }
                    }
                }
            }
            ',' | '+' | ';' => {
                components.push(String::from_utf8_lossy(&bytes).into_owned());
                bytes.clear();
            }
            other => push_char(&mut bytes, other),
        }
    }
    components.push(String::from_utf8_lossy(&bytes).into_owned());

    components
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
