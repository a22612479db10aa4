//! CLI command definitions and parsing
use crate::entities::EntityKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "canonid",
    version,
    about = "Canonicalize and deduplicate reconnaissance identifiers",
    long_about = "canonid parses loosely formatted identifiers (names, phone numbers, email \
                  addresses, credentials, advisories, certificates, ASN ranges) into canonical \
                  records keyed by their natural identity, and stores each one exactly once."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/canonid/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse an identifier and print its attributes without storing it
    Parse {
        /// Entity kind (e.g. person_name, email_address, advisory)
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,

        /// Raw identifier text (JSON for certificates)
        text: String,
    },

    /// Look up the canonical record for an identifier
    Lookup {
        /// Entity kind
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,

        /// Raw identifier text
        text: String,
    },

    /// Find or create the canonical record for an identifier
    Resolve {
        /// Entity kind
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,

        /// Raw identifier text
        text: String,
    },

    /// Import and query ASN ranges
    Asn {
        #[command(subcommand)]
        action: AsnAction,
    },

    /// Show record counts per kind
    Stats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum AsnAction {
    /// Import a tab-separated ASN range list (iptoasn format)
    Import {
        /// Path to the TSV file
        file: PathBuf,
    },

    /// List ASN records whose range contains an address
    Contains {
        /// IPv4 or IPv6 address
        ip: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    s.parse().map_err(|_| {
        let known: Vec<&str> = EntityKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown entity kind '{}', expected one of: {}", s, known.join(", "))
    })
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
