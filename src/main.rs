// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use manifold::download::HttpFetcher;
use manifold::installers::burn::{self, BurnBundle};
use manifold::installers::msix::{self, MsixPackage};
use manifold::installers::{InstallerFormat, MsiDatabase};
use manifold::{Config, ManifestSet, ManifestUpdater, UpdateInstructions};
use serde_json::json;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "manifold")]
#[command(author, version, about = "Package manifest updater with installer introspection", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the manifest set of a new package version
    Update {
        /// Directory holding the current manifest set
        #[arg(short, long)]
        manifests: PathBuf,
        /// Update instructions (YAML or JSON)
        #[arg(short, long)]
        instructions: PathBuf,
        /// New package version
        #[arg(long = "version", value_name = "VERSION")]
        package_version: String,
        /// Output directory (default: overwrite the input directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show metadata and identity of a WiX Burn bundle
    Burn {
        /// Path to the bundle executable
        path: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show identity, family name and signature hash of an MSIX/APPX package
    Msix {
        /// Path to the package
        path: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

fn cmd_update(
    config: Config,
    manifests: &Path,
    instructions: &Path,
    package_version: &str,
    output: Option<&Path>,
) -> Result<()> {
    let old_set = ManifestSet::read_dir(manifests)
        .with_context(|| format!("Failed to read manifests from {}", manifests.display()))?;

    let fetcher = HttpFetcher::new(&config.fetch)?;
    let msi = MsiDatabase::new();
    let updater = ManifestUpdater::new(&fetcher, &msi, config);

    let content = fs::read_to_string(instructions)
        .with_context(|| format!("Failed to read instructions from {}", instructions.display()))?;
    let instructions = UpdateInstructions::from_yaml(&content, updater.schema())?;

    let new_set = updater.reconcile(&old_set, &instructions, package_version)?;

    let output = output.unwrap_or(manifests);
    new_set
        .write_dir(output)
        .with_context(|| format!("Failed to write manifests to {}", output.display()))?;

    println!(
        "Wrote {} manifests for version {} to {}",
        new_set.manifests().count(),
        package_version,
        output.display()
    );
    Ok(())
}

fn cmd_burn(path: &Path, as_json: bool) -> Result<()> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let bundle = BurnBundle::from_reader(&mut file)?;
    let info = bundle.info();
    let payloads = burn::read_ux_payloads(&mut file, None)?;

    if as_json {
        let value = json!({
            "bundleCode": info.bundle_code,
            "version": info.version,
            "stubSize": info.stub_size,
            "originalChecksum": info.original_checksum,
            "originalSignature": info.original_signature().map(|(offset, size)| json!({ "offset": offset, "size": size })),
            "containerFormat": info.container_format,
            "containerSizes": info.container_sizes,
            "upgradeCode": bundle.upgrade_code(),
            "displayName": bundle.display_name(),
            "displayVersion": bundle.display_version(),
            "uxPayloads": payloads.iter().map(|p| &p.file_path).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Bundle code: {}", info.bundle_code);
    println!("  Section version: {}", info.version);
    println!("  Stub size: {}", info.stub_size);
    println!("  Containers: {} {:?}", info.container_count(), info.container_sizes);
    if let Some((offset, size)) = info.original_signature() {
        println!("  Original signature: {} bytes at {:#x}", size, offset);
    }
    println!("  Upgrade code: {}", bundle.upgrade_code().unwrap_or("(none)"));
    println!("  Display name: {}", bundle.display_name().unwrap_or("(none)"));
    println!("  Display version: {}", bundle.display_version().unwrap_or("(none)"));
    println!("  UX payloads:");
    for payload in &payloads {
        println!("    {} ({} bytes)", payload.file_path, payload.content.len());
    }
    Ok(())
}

fn cmd_msix(path: &Path, as_json: bool) -> Result<()> {
    let package = MsixPackage::parse(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let identity = package.msix_identity();
    let signature = msix::read_signature_hash(path).ok();

    if as_json {
        let value = json!({
            "name": identity.name,
            "publisher": identity.publisher,
            "version": identity.version,
            "familyName": package.family_name(),
            "signatureSha256": signature,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Name: {}", identity.name);
    println!("  Publisher: {}", identity.publisher);
    println!("  Version: {}", identity.version);
    println!("  Family name: {}", package.family_name());
    println!("  Signature SHA-256: {}", signature.as_deref().unwrap_or("(unsigned)"));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Update {
            manifests,
            instructions,
            package_version,
            output,
        } => {
            let config = load_config(cli.config.as_deref())?;
            info!("Updating manifests in {} to {}", manifests.display(), package_version);
            cmd_update(config, &manifests, &instructions, &package_version, output.as_deref())
        }
        Commands::Burn { path, json } => cmd_burn(&path, json),
        Commands::Msix { path, json } => cmd_msix(&path, json),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "manifold", &mut std::io::stdout());
            Ok(())
        }
    }
}
