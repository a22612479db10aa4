//! Email address, user name and host name grammar
//!
//! Not an RFC 5322 validator: the address is split on its single `@` and the
//! two halves are canonicalized as independent user and host names.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};

/// Parsed email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAttributes {
    pub user: String,
    /// Host name, lower-cased
    pub host: String,
}

impl EmailAttributes {
    /// Canonical `user@host` text
    pub fn address(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Parse an email address
pub fn parse(text: &str) -> Result<EmailAttributes, FormatError> {
    if text.chars().any(char::is_whitespace) {
        return Err(FormatError::ContainsWhitespace(text.to_string()));
    }

    let (user, host) = text
        .split_once('@')
        .ok_or_else(|| FormatError::MissingAtSign(text.to_string()))?;
    if host.contains('@') {
        return Err(FormatError::MultipleAtSigns(text.to_string()));
    }
    if user.is_empty() {
        return Err(FormatError::MissingUserName(text.to_string()));
    }
    if host.is_empty() {
        return Err(FormatError::MissingHostName(text.to_string()));
    }

    Ok(EmailAttributes {
        user: user.to_string(),
        host: parse_host_name(host)?,
    })
}

/// Validate a bare user name (the local part of an address, or a login)
pub fn parse_user_name(text: &str) -> Result<String, FormatError> {
    if text.is_empty() {
        return Err(FormatError::MissingUserName(text.to_string()));
    }
    if text.chars().any(char::is_whitespace) {
        return Err(FormatError::ContainsWhitespace(text.to_string()));
    }
    Ok(text.to_string())
}

/// Validate and lower-case a host name
///
/// Accepts DNS names (letters, digits, `-`, `_`, `.`) and bracketed address
/// literals such as `[192.0.2.1]`.
pub fn parse_host_name(text: &str) -> Result<String, FormatError> {
    if text.is_empty() {
        return Err(FormatError::MissingHostName(text.to_string()));
    }
    if text.chars().any(char::is_whitespace) {
        return Err(FormatError::ContainsWhitespace(text.to_string()));
    }

    let valid = if let Some(literal) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        !literal.is_empty() && literal.chars().all(|c| c.is_ascii_hexdigit() || ".:".contains(c))
    } else {
        !text.starts_with('.')
            && !text.contains("..")
            && text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c))
    };

    if !valid {
        return Err(FormatError::InvalidHostName(text.to_string()));
    }
    Ok(text.to_ascii_lowercase())
}
