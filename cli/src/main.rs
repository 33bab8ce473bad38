// bondstore-cli: inspect and maintain a persisted Bluetooth bond store
//
// Cross-platform (macOS, Linux, Windows) command-line interface over bondstore-core.

mod config;

use anyhow::{Context, Result};
use bondstore_core::dump::dump_link_key_types;
use bondstore_core::{
    BondStorage, Collaborators, Consolidation, PropertyKind, RawAddress, SledConfig,
};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bondstore")]
#[command(about = "Bluetooth bond store inspector", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file to use instead of the per-user default
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bonded devices
    Bonded,
    /// Show identity pairs of LE devices bonded under private addresses
    LeDevices,
    /// Print the link key types held for every device
    Dump,
    /// Remove a bond and its keys
    Remove { address: String },
    /// Show adapter properties
    Adapter,
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::Config::config_file()?,
    };
    let config = config::Config::load_from(&config_path)?;

    match cli.command {
        Commands::Bonded => cmd_bonded(&config),
        Commands::LeDevices => cmd_le_devices(&config),
        Commands::Dump => cmd_dump(&config),
        Commands::Remove { address } => cmd_remove(&config, &address),
        Commands::Adapter => cmd_adapter(&config),
        Commands::Config { action } => cmd_config(config, &config_path, action),
    }
}

fn open_storage(config: &config::Config) -> Result<BondStorage> {
    let path = config.resolved_store_path()?;
    let path = path
        .to_str()
        .context("Store path is not valid UTF-8")?
        .to_string();
    tracing::debug!("Opening bond store at {}", path);

    let store = SledConfig::open(&path).context("Failed to open bond store")?;
    Ok(BondStorage::new(
        Arc::new(store),
        config.storage.clone(),
        Collaborators::default(),
    ))
}

fn cmd_bonded(config: &config::Config) -> Result<()> {
    let storage = open_storage(config)?;
    let bonded = storage.fetch_bonded_devices(false);

    if bonded.is_empty() {
        println!("{}", "No bonded devices".dimmed());
        return Ok(());
    }

    println!("{} ({})", "Bonded Devices".bold(), bonded.len());
    println!();
    for address in &bonded {
        let name = storage
            .get_stored_remote_name(address)
            .unwrap_or_else(|| "(unnamed)".to_string());
        let device_type = storage
            .get_remote_device_type(address)
            .map(|t| format!("{:?}", t))
            .unwrap_or_else(|_| "unknown".to_string());
        let restricted = if storage.is_restricted_device(address) {
            " restricted".bright_red().to_string()
        } else {
            String::new()
        };
        println!(
            "  {}  {:<24} {}{}",
            address.to_string().bright_cyan(),
            name,
            device_type.dimmed(),
            restricted
        );
    }

    Ok(())
}

fn cmd_le_devices(config: &config::Config) -> Result<()> {
    let storage = open_storage(config)?;
    let pairs = storage.load_le_devices();

    if pairs.is_empty() {
        println!("{}", "No private address bonds with a known identity".dimmed());
        return Ok(());
    }

    println!("{}", "LE Identity Pairs".bold());
    for pair in pairs {
        let (label, pair) = match pair {
            Consolidation::DualMode(pair) => ("dual-mode ", pair),
            Consolidation::Associated(pair) => ("associated", pair),
        };
        println!(
            "  {}  {} -> {}",
            label.green(),
            pair.held.to_string().bright_cyan(),
            pair.identity.to_string().bright_yellow()
        );
    }

    Ok(())
}

fn cmd_dump(config: &config::Config) -> Result<()> {
    let storage = open_storage(config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    dump_link_key_types(storage.config(), &mut out).context("Failed to write dump")?;
    Ok(())
}

fn cmd_remove(config: &config::Config, address: &str) -> Result<()> {
    let address: RawAddress = address.parse()?;
    let storage = open_storage(config)?;

    if !storage.is_bonded(&address) {
        anyhow::bail!("{} is not bonded", address);
    }
    storage
        .remove_bonded_device(&address)
        .with_context(|| format!("Failed to remove bond for {}", address))?;

    println!("{} Bond removed: {}", "✓".green(), address);
    Ok(())
}

fn cmd_adapter(config: &config::Config) -> Result<()> {
    let storage = open_storage(config)?;

    println!("{}", "Adapter".bold());
    for kind in [
        PropertyKind::BdAddr,
        PropertyKind::BdName,
        PropertyKind::AdapterDiscoverableTimeout,
    ] {
        match storage.get_adapter_property(kind) {
            Ok(property) => println!("  {:?}", property),
            Err(e) => println!("  {:?}: {}", kind, e.to_string().dimmed()),
        }
    }
    println!("  IO capabilities:     {:?}", storage.local_io_caps());
    println!("  IO capabilities LE:  {:?}", storage.local_io_caps_ble());
    println!("  Bonded devices:      {}", storage.num_bonded_devices());

    Ok(())
}

fn cmd_config(
    mut config: config::Config,
    path: &std::path::Path,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save_to(path)?;
            println!("{} {} = {}", "✓".green(), key.bright_cyan(), value.bright_yellow());
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => anyhow::bail!("Unknown or unset config key: {}", key),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<20} {}", key.bright_cyan(), value);
            }
            println!();
            println!("  Config file: {}", path.display());
        }
    }
    Ok(())
}
