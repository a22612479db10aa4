use crate::entities::EntityKind;
use std::path::PathBuf;
use thiserror::Error;

/// Grammar-level failures raised by the parsers in [`crate::grammar`]
///
/// These are terminal: the input is malformed and retrying cannot help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Input matched none of the personal name grammar alternatives
    #[error("Invalid personal name: {0:?}")]
    InvalidPersonName(String),

    /// Input matched none of the phone number delimiter families
    #[error("Invalid phone number: {0:?}")]
    InvalidPhoneNumber(String),

    /// A populated phone field contains something other than digits
    #[error("Phone number {field} must be numeric, got {value:?}")]
    PhoneFieldNotNumeric { field: &'static str, value: String },

    /// A populated phone field has the wrong number of digits
    #[error("Phone number {field} must be {expected} digits, got {value:?}")]
    PhoneFieldLength {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    /// A required phone field (prefix or line number) is empty
    #[error("Phone number is missing its {0}")]
    MissingPhoneField(&'static str),

    /// Whitespace anywhere in an email address
    #[error("Email address contains whitespace: {0:?}")]
    ContainsWhitespace(String),

    #[error("Email address has no '@' separator: {0:?}")]
    MissingAtSign(String),

    #[error("Email address has more than one '@': {0:?}")]
    MultipleAtSigns(String),

    /// Empty user part of an email address or credential
    #[error("Missing user name in {0:?}")]
    MissingUserName(String),

    /// Empty host part of an email address
    #[error("Missing host name in {0:?}")]
    MissingHostName(String),

    /// Host name contains characters no DNS name or address literal can hold
    #[error("Invalid host name: {0:?}")]
    InvalidHostName(String),

    /// Credential is not in `user:password` form
    #[error("Invalid credential, expected user:password: {0:?}")]
    InvalidCredential(String),

    #[error("Missing password in {0:?}")]
    MissingPassword(String),

    /// Advisory identifier in none of the CVE/MS/RHSA/GHSA shapes
    #[error("Unrecognized advisory identifier: {0:?}")]
    UnrecognizedAdvisory(String),

    /// Distinguished name component without an `attr=value` shape
    #[error("Invalid distinguished name component {component:?} in {name:?}")]
    InvalidDistinguishedName { name: String, component: String },

    /// Certificate country must be exactly two characters
    #[error("Invalid country code {0:?}: must be exactly two characters")]
    InvalidCountryCode(String),

    /// Subject-alternative-name entry with an unknown tag or empty value
    #[error("Invalid subject alternative name entry: {0:?}")]
    InvalidSubjectAltName(String),

    /// Not an IPv4 or IPv6 literal
    #[error("Invalid IP address: {0:?}")]
    InvalidIpAddress(String),

    /// ASN list line without the expected tab-separated columns
    #[error("Invalid ASN record line: {0:?}")]
    InvalidAsnLine(String),

    /// Structured input (JSON) could not be decoded
    #[error("Invalid {entity} input: {message}")]
    InvalidInput {
        entity: &'static str,
        message: String,
    },
}

/// Main error type for canonid
#[derive(Error, Debug)]
pub enum CanonError {
    /// Raw input failed to parse
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// A field the record cannot exist without is absent after parsing
    #[error("Missing required field {field} on {entity}")]
    MissingRequiredField {
        entity: &'static str,
        field: &'static str,
    },

    /// A parsed field failed semantic validation
    #[error("Invalid {field} on {entity}: {message}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        message: String,
    },

    /// Store rejected an insert because a unique key already exists
    #[error("Uniqueness violation on {kind} key {key}")]
    UniquenessViolation { kind: EntityKind, key: String },

    /// A create slipped past the lookup check and collided with an existing record
    #[error("Duplicate key conflict on {kind} key {key}")]
    DuplicateKeyConflict { kind: EntityKind, key: String },

    /// Attempted ordering or containment between IPv4 and IPv6 encodings
    #[error("Cannot compare IPv{left} address bytes with IPv{right} address bytes")]
    CrossVersionComparison { left: u8, right: u8 },

    /// Record id is not present in the store
    #[error("Record not found: {kind} with id {id}")]
    RecordNotFound { kind: EntityKind, id: i64 },

    /// No registry entry for an entity kind tag
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CanonError {
    /// Whether the caller may retry the operation as a lookup
    pub fn is_retryable(&self) -> bool {
        matches!(self, CanonError::DuplicateKeyConflict { .. })
    }

    pub(crate) fn json(source: serde_json::Error, context: impl Into<String>) -> Self {
        CanonError::Json {
            source,
            context: context.into(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for canonid operations
pub type Result<T> = std::result::Result<T, CanonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        let conflict = CanonError::DuplicateKeyConflict {
            kind: EntityKind::Advisory,
            key: "[\"CVE-2022-1234\"]".to_string(),
        };
        assert!(conflict.is_retryable());

        let format = CanonError::from(FormatError::InvalidPersonName("x1".to_string()));
        assert!(!format.is_retryable());

        let violation = CanonError::UniquenessViolation {
            kind: EntityKind::Advisory,
            key: "k".to_string(),
        };
        assert!(!violation.is_retryable());
    }

    #[test]
    fn test_format_error_names_input() {
        let err = FormatError::InvalidPersonName("not_a_name".to_string());
        assert_eq!(err.to_string(), "Invalid personal name: \"not_a_name\"");
    }
}
