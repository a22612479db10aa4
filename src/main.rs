use canonid::cli::{AsnAction, Cli, Commands, ConfigAction};
use canonid::config::{Config, ConfigValidator};
use canonid::entities::{AsnRecord, EntityKind};
use canonid::error::{CanonError, Result};
use canonid::resolve::{EntityRegistry, Resolver, ResolverOptions};
use canonid::storage::{open_store, store_stats};
use serde::Serialize;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Logging settings come from the config, so load it first
    let config = load_config(cli.config.clone())?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Parse { kind, text } => {
            cmd_parse(kind, &text)?;
        }
        Commands::Lookup { kind, text } => {
            cmd_lookup(&config, kind, &text)?;
        }
        Commands::Resolve { kind, text } => {
            cmd_resolve(&config, kind, &text)?;
        }
        Commands::Asn { action } => {
            cmd_asn(&config, action)?;
        }
        Commands::Stats => {
            cmd_stats(&config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, &config, action)?;
        }
    }

    Ok(())
}

fn init_logging(config: &Config, verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose {
        "canonid=debug"
    } else {
        config.logging.filter.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CanonError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn open_resolver(config: &Config) -> Result<Resolver> {
    let store = open_store(&config.storage, &config.database_path()?)?;
    Ok(Resolver::new(
        store,
        EntityRegistry::standard(),
        ResolverOptions::from(&config.resolution),
    ))
}

fn cmd_parse(kind: EntityKind, text: &str) -> Result<()> {
    let registry = EntityRegistry::standard();
    let attributes = registry.get(kind)?.parse(text)?;
    print_json(&attributes)
}

fn cmd_lookup(config: &Config, kind: EntityKind, text: &str) -> Result<()> {
    let resolver = open_resolver(config)?;
    match resolver.lookup_text(kind, text)? {
        Some(record) => print_json(&record),
        None => {
            tracing::info!("No {} record for {:?}", kind, text);
            print_json(&serde_json::Value::Null)
        }
    }
}

fn cmd_resolve(config: &Config, kind: EntityKind, text: &str) -> Result<()> {
    let resolver = open_resolver(config)?;
    let record = resolver.resolve_text(kind, text)?;
    print_json(&record)
}

#[derive(Serialize)]
struct AsnImportSummary {
    lines: usize,
    created: usize,
    failed: usize,
}

fn cmd_asn(config: &Config, action: AsnAction) -> Result<()> {
    let resolver = open_resolver(config)?;

    match action {
        AsnAction::Import { file } => {
            let content = std::fs::read_to_string(&file).map_err(|e| CanonError::Io {
                source: e,
                context: format!("Failed to read ASN list: {:?}", file),
            })?;

            let before = resolver.store().count(EntityKind::Asn)?;
            let mut summary = AsnImportSummary {
                lines: 0,
                created: 0,
                failed: 0,
            };

            for (number, line) in content.lines().enumerate() {
                if line.trim().is_empty() || line.starts_with('#') {
                    continue;
                }
                summary.lines += 1;
                if let Err(e) = resolver.import_or_refresh::<AsnRecord>(line) {
                    tracing::warn!("Skipping line {}: {}", number + 1, e);
                    summary.failed += 1;
                }
            }

            summary.created = resolver.store().count(EntityKind::Asn)? - before;
            tracing::info!(
                "Imported {} ASN lines from {:?} ({} new, {} failed)",
                summary.lines,
                file,
                summary.created,
                summary.failed
            );
            print_json(&summary)
        }
        AsnAction::Contains { ip } => {
            let records = resolver.asn_containing(&ip)?;
            print_json(&records)
        }
    }
}

fn cmd_stats(config: &Config) -> Result<()> {
    let stats = store_stats(&config.storage, &config.database_path()?)?;
    tracing::debug!(
        "{} records across {} kinds",
        stats.total_records(),
        stats.record_counts.len()
    );
    print_json(&stats)
}

fn cmd_config(config_path: Option<PathBuf>, config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print_json(config)?;
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let loaded = Config::load(&path)?;
            ConfigValidator::validate(&loaded)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", loaded.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| CanonError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        // Subscriber is not installed yet
        eprintln!("Config file not found, using defaults. Run 'canonid config init' to create one.");
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    Config::load(&path)
}
