//! Subject-alternative-name list grammar
//!
//! Parses the text rendering used by OpenSSL and most TLS scanners:
//! `DNS:example.com, DNS:www.example.com, IP Address:192.0.2.1, email:a@b`

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// One entry of a subject-alternative-name extension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SubjectAltName {
    Dns(String),
    Ip(IpAddr),
    Email(String),
    Uri(String),
}

impl SubjectAltName {
    /// The entry's value without its tag
    pub fn value(&self) -> String {
        match self {
            SubjectAltName::Dns(name) => name.clone(),
            SubjectAltName::Ip(addr) => addr.to_string(),
            SubjectAltName::Email(email) => email.clone(),
            SubjectAltName::Uri(uri) => uri.clone(),
        }
    }
}

impl fmt::Display for SubjectAltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectAltName::Dns(name) => write!(f, "DNS:{name}"),
            SubjectAltName::Ip(addr) => write!(f, "IP Address:{addr}"),
            SubjectAltName::Email(email) => write!(f, "email:{email}"),
            SubjectAltName::Uri(uri) => write!(f, "URI:{uri}"),
        }
    }
}

/// Parse a comma-separated subject-alternative-name list
///
/// An empty string yields an empty list.
pub fn parse(text: &str) -> Result<Vec<SubjectAltName>, FormatError> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Result<SubjectAltName, FormatError> {
    let invalid = || FormatError::InvalidSubjectAltName(entry.to_string());
    let (tag, value) = entry.split_once(':').ok_or_else(invalid)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid());
    }

    match tag.trim().to_ascii_lowercase().as_str() {
        "dns" => Ok(SubjectAltName::Dns(value.to_ascii_lowercase())),
        "ip" | "ip address" => value
            .parse()
            .map(SubjectAltName::Ip)
            .map_err(|_| invalid()),
        "email" => Ok(SubjectAltName::Email(value.to_string())),
        "uri" => Ok(SubjectAltName::Uri(value.to_string())),
        _ => Err(invalid()),
    }
}
