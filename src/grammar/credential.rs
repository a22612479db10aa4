//! `user:password` credential grammar

use super::email::parse_user_name;
use crate::error::FormatError;
use serde::{Deserialize, Serialize};

/// Parsed credential pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttributes {
    pub user: String,
    pub password: String,
}

impl CredentialAttributes {
    /// Canonical `user:password` text
    pub fn text(&self) -> String {
        format!("{}:{}", self.user, self.password)
    }
}

/// Parse a credential, splitting on the first `:`
///
/// Passwords may themselves contain colons.
pub fn parse(text: &str) -> Result<CredentialAttributes, FormatError> {
    let (user, password) = text
        .split_once(':')
        .ok_or_else(|| FormatError::InvalidCredential(text.to_string()))?;

    if user.is_empty() {
        return Err(FormatError::MissingUserName(text.to_string()));
    }
    if password.is_empty() {
        return Err(FormatError::MissingPassword(text.to_string()));
    }

    Ok(CredentialAttributes {
        user: parse_user_name(user)?,
        password: password.to_string(),
    })
}

/// Validate a bare password
pub fn parse_password(text: &str) -> Result<String, FormatError> {
    if text.is_empty() {
        return Err(FormatError::MissingPassword(text.to_string()));
    }
    Ok(text.to_string())
}
