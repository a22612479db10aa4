use crate::config::{Config, StorageBackend, SCHEMA_VERSION};
use crate::error::{CanonError, Result, ValidationError};

/// Upper bound on pooled SQLite connections
const MAX_POOL_SIZE: u32 = 64;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_logging(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CanonError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        let storage = &config.storage;

        // The path is unused by the in-memory backend
        if storage.backend == StorageBackend::Sqlite && storage.database_path.as_os_str().is_empty()
        {
            errors.push(ValidationError::new(
                "storage.database_path",
                "Database path cannot be empty",
            ));
        }

        if storage.pool_size == 0 || storage.pool_size > MAX_POOL_SIZE {
            errors.push(ValidationError::new(
                "storage.pool_size",
                format!(
                    "Pool size must be between 1 and {}, got {}",
                    MAX_POOL_SIZE, storage.pool_size
                ),
            ));
        }

        if storage.busy_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "storage.busy_timeout_ms",
                "Busy timeout must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, errors: &mut Vec<ValidationError>) {
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&config.logging.filter) {
            errors.push(ValidationError::new(
                "logging.filter",
                format!("Invalid filter '{}': {}", config.logging.filter, e),
            ));
        }
    }
}
