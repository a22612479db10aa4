//! canonid - canonical records for reconnaissance identifiers
//!
//! Turns loosely formatted identifiers collected during security
//! reconnaissance (personal names, phone numbers, email addresses,
//! credentials, advisory ids, certificate names, ASN ranges) into validated,
//! deduplicated records with stable natural keys.
//!
//! ```no_run
//! use canonid::entities::Advisory;
//! use canonid::resolve::Resolver;
//! use canonid::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let resolver = Resolver::with_defaults(Arc::new(MemoryStore::new()));
//! let advisory = resolver.find_or_import::<Advisory>("CVE-2022-1234")?;
//! assert_eq!(advisory.record.year, Some(2022));
//! # Ok::<(), canonid::CanonError>(())
//! ```

pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod grammar;
pub mod range;
pub mod resolve;
pub mod storage;

pub use error::{CanonError, FormatError, Result};
