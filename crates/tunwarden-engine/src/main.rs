// ============================================
// File: crates/tunwarden-engine/src/main.rs
// ============================================
//! # Tunwarden Entry Point
//!
//! ## Creation Reason
//! Command line front end: runs the interceptor on a real TUN device and
//! inspects or edits the configuration file.
//!
//! ## Usage
//! ```bash
//! # Write the default configuration
//! tunwarden init --config ./tunwarden.toml
//!
//! # Intercept traffic on the interface described by [tun]
//! sudo tunwarden run --config ./tunwarden.toml
//!
//! # Other commands
//! tunwarden validate                       # Check proxy profile rules
//! tunwarden get --key tun.mtu              # Print one value as JSON
//! tunwarden set --key tun.mtu --value 1400 # Edit and persist
//! tunwarden keys                           # Top-level sections
//! tunwarden profiles --dir ./profiles      # List loadable files
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `run` requires root or CAP_NET_ADMIN for TUN
//! - `run` re-reads the file every `--reload-secs` and applies `[tun]`
//!   changes without restarting the data plane
//! - `RUST_LOG` overrides `log.level`
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tunwarden_common::types::InterfaceParams;
use tunwarden_config::{ConfigStore, HotReload, StoreOptions, Value};
use tunwarden_engine::{Interceptor, StopReport};

// ============================================
// CLI Definition
// ============================================

/// Tunwarden traffic interception engine
#[derive(Parser, Debug)]
#[command(name = "tunwarden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the interface from [tun] and intercept until Ctrl+C
    Run {
        /// Path to configuration file (created with defaults if missing)
        #[arg(short, long, default_value = tunwarden_config::defaults::DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Seconds between configuration change checks
        #[arg(long, default_value_t = 5)]
        reload_secs: u64,
    },

    /// Write the default configuration file
    Init {
        /// Path to configuration file
        #[arg(short, long, default_value = tunwarden_config::defaults::DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = tunwarden_config::defaults::DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Print the value at a dotted key as JSON
    Get {
        /// Path to configuration file
        #[arg(short, long, default_value = tunwarden_config::defaults::DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Dotted key, e.g. dns.nameserver
        #[arg(short, long)]
        key: String,
    },

    /// Set a dotted key and save the file
    Set {
        /// Path to configuration file
        #[arg(short, long, default_value = tunwarden_config::defaults::DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Dotted key, e.g. tun.mtu
        #[arg(short, long)]
        key: String,

        /// JSON value; anything that is not JSON is stored as a string
        #[arg(short, long)]
        value: String,
    },

    /// List top-level keys
    Keys {
        /// Path to configuration file
        #[arg(short, long, default_value = tunwarden_config::defaults::DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// List .toml, .yaml and .json profiles in a directory
    Profiles {
        /// Directory to scan
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `run` installs logging itself once the configured level is known
    if !matches!(cli.command, Commands::Run { .. }) {
        init_logging("warn");
    }

    let result = match cli.command {
        Commands::Run { config, reload_secs } => cmd_run(config, reload_secs).await,
        Commands::Init { config } => cmd_init(config).await,
        Commands::Validate { config } => cmd_validate(config).await,
        Commands::Get { config, key } => cmd_get(config, key).await,
        Commands::Set { config, key, value } => cmd_set(config, key, value).await,
        Commands::Keys { config } => cmd_keys(config).await,
        Commands::Profiles { dir } => cmd_profiles(dir).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Runs the interceptor on a Linux TUN device.
#[cfg(target_os = "linux")]
async fn cmd_run(config_path: PathBuf, reload_secs: u64) -> anyhow::Result<()> {
    use tunwarden_engine::{DataPlane, EngineSettings, PassthroughProcessor};
    use tunwarden_transport::{LinuxTun, TunConfig, TunDevice};

    let store = ConfigStore::new(StoreOptions::default().default_path(&config_path));
    let report = store.load(None).await?;
    let profile = store.profile().await?;

    init_logging(&profile.log.level);
    if report.provisioned {
        info!(path = %report.file.path.display(), "Wrote default configuration");
    }

    let params = profile.tun.interface_params()?;
    let settings = EngineSettings::from_section(&profile.engine)?;

    info!("════════════════════════════════════════");
    info!("Interface:  {}", params.name);
    info!("MTU:        {}", params.mtu);
    if let Some(address) = params.address {
        info!("Address:    {}", address);
    }
    info!("Mode:       {}", profile.proxy.mode);
    info!("════════════════════════════════════════");

    let tun = Arc::new(LinuxTun::create(TunConfig::from_params(&params))?);
    tun.up().await?;

    let plane = DataPlane::from_device(Arc::clone(&tun), Arc::new(PassthroughProcessor));
    let interceptor = Interceptor::new(plane, settings);
    apply_params(&interceptor, &params)?;
    interceptor.create(&params.name).await?;
    interceptor.start().await?;

    let mut reload = tokio::time::interval(Duration::from_secs(reload_secs.max(1)));
    reload.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    reload.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
            _ = reload.tick() => reload_tun(&store, &interceptor).await,
        }
    }

    let report = interceptor.stop().await?;
    if let Err(e) = tun.down().await {
        warn!("Failed to bring interface down: {}", e);
    }
    print_report(&report);

    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn cmd_run(_config_path: PathBuf, _reload_secs: u64) -> anyhow::Result<()> {
    anyhow::bail!("TUN interception is only supported on Linux")
}

/// Writes the default configuration if the file does not exist.
async fn cmd_init(config_path: PathBuf) -> anyhow::Result<()> {
    let store = ConfigStore::default();
    let report = store.load(Some(&config_path)).await?;

    if report.provisioned {
        println!("✅ Wrote default configuration to {}", report.file.path.display());
    } else {
        println!("⚠️  {} already exists, left unchanged", report.file.path.display());
    }
    Ok(())
}

/// Validates the configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    let store = load_existing(&config_path).await?;
    let profile = store.profile().await?;
    let params = profile.tun.interface_params()?;

    println!("✅ Configuration is valid");
    println!();
    println!("Proxy:");
    println!("   Mode:       {}", profile.proxy.mode);
    println!("   Servers:    {}", profile.proxy.servers.len());
    println!("   Groups:     {}", profile.proxy.groups.len());
    println!();
    println!("DNS:");
    println!("   Enabled:    {}", profile.dns.enable);
    println!("   Servers:    {}", profile.dns.nameserver.join(", "));
    println!();
    println!("TUN:");
    println!("   Device:     {}", params.name);
    println!("   MTU:        {}", params.mtu);
    if let Some(address) = params.address {
        println!("   Address:    {address}");
    }
    println!();
    Ok(())
}

/// Prints one value.
async fn cmd_get(config_path: PathBuf, key: String) -> anyhow::Result<()> {
    let store = load_existing(&config_path).await?;
    match store.get(&key).await {
        Some(value) => println!("{}", value.to_json()?),
        None => anyhow::bail!("'{key}' is not set"),
    }
    Ok(())
}

/// Sets one value and saves.
async fn cmd_set(config_path: PathBuf, key: String, value: String) -> anyhow::Result<()> {
    let store = load_existing(&config_path).await?;
    let value = Value::from_json(&value).unwrap_or_else(|_| Value::from(value));

    let shown = value.to_json()?;

    let previous = store.set(&key, value).await?;
    let file = store.save_current().await?;

    match previous {
        Some(previous) => println!("✅ {key}: {} → {shown}", previous.to_json()?),
        None => println!("✅ {key}: {shown}"),
    }
    println!("   Saved {} ({} bytes)", file.path.display(), file.size);
    Ok(())
}

/// Prints top-level keys.
async fn cmd_keys(config_path: PathBuf) -> anyhow::Result<()> {
    let store = load_existing(&config_path).await?;
    for key in store.list_keys().await {
        println!("{key}");
    }
    Ok(())
}

/// Lists profile files.
async fn cmd_profiles(dir: PathBuf) -> anyhow::Result<()> {
    let profiles = ConfigStore::list_profiles(Some(&dir)).await?;
    if profiles.is_empty() {
        println!("No profiles in {}", dir.display());
        return Ok(());
    }

    for profile in profiles {
        println!(
            "{:<32} {:>8} bytes  modified {}",
            profile.name, profile.size, profile.modified
        );
    }
    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads a configuration file that must already exist.
async fn load_existing(path: &Path) -> anyhow::Result<ConfigStore> {
    if !path.exists() {
        anyhow::bail!(
            "config file not found: {} (run 'tunwarden init' first)",
            path.display()
        );
    }
    let store = ConfigStore::default();
    store.load(Some(path)).await?;
    Ok(store)
}

/// Pushes checked `[tun]` parameters into the interceptor.
fn apply_params(interceptor: &Interceptor, params: &InterfaceParams) -> anyhow::Result<()> {
    let address = params.address.map(|a| a.to_string()).unwrap_or_default();
    interceptor.set_interface(&params.name, &params.mtu.to_string(), &address)?;
    Ok(())
}

/// Applies `[tun]` changes after a hot reload. Failures keep the old values.
#[cfg(target_os = "linux")]
async fn reload_tun(store: &ConfigStore, interceptor: &Interceptor) {
    match store.hot_reload().await {
        Ok(HotReload::Unchanged) => {}
        Ok(HotReload::Reloaded(_)) => {
            let applied = store
                .profile()
                .await
                .map_err(anyhow::Error::from)
                .and_then(|profile| Ok(profile.tun.interface_params()?))
                .and_then(|params| apply_params(interceptor, &params).map(|()| params));

            match applied {
                Ok(params) => info!(
                    interface = %params.name,
                    mtu = params.mtu,
                    "Configuration reloaded, interface parameters applied"
                ),
                Err(e) => warn!("Reloaded configuration rejected: {:#}", e),
            }
        }
        Err(e) => warn!("Hot reload failed: {}", e),
    }
}

/// Prints the final counters.
fn print_report(report: &StopReport) {
    println!();
    println!("Interface {} stopped", report.interface);
    println!("════════════════════════════════════════");
    println!("   Uptime:       {:.1}s", report.elapsed.as_secs_f64());
    println!(
        "   Packets:      {} in / {} out",
        report.stats.packets_in, report.stats.packets_out
    );
    println!(
        "   Bytes:        {} in / {} out",
        report.stats.bytes_in, report.stats.bytes_out
    );
    println!("   Dropped:      {}", report.stats.packets_dropped);
    println!("════════════════════════════════════════");
}
