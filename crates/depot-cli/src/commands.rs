use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use depot_server::dto::PagedBody;
use depot_server::{AppState, DepotConfig, DepotServer, StorageBackend};
use depot_types::{
    validate_package, validate_version, MetadataValue, Package, Page, PageRequest, Version,
};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Package(cmd) => {
            warn_if_ephemeral(&config);
            let state = AppState::from_config(&config)?;
            cmd_package(&state, &cli.format, cmd)
        }
        Command::Version(cmd) => {
            warn_if_ephemeral(&config);
            let state = AppState::from_config(&config)?;
            cmd_version(&state, &cli.format, cmd)
        }
    }
}

/// Configuration file (if any) with command-line overrides applied.
fn load_config(cli: &Cli) -> anyhow::Result<DepotConfig> {
    let mut config = match &cli.config {
        Some(path) => DepotConfig::load(path)?,
        None => DepotConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    Ok(config)
}

fn warn_if_ephemeral(config: &DepotConfig) {
    if config.storage.backend == StorageBackend::Memory {
        eprintln!(
            "{} memory backend configured; changes will not outlive this command",
            "warning:".yellow().bold()
        );
    }
}

fn cmd_serve(mut config: DepotConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(backend) = args.backend {
        config.storage.backend = backend.into();
    }
    println!(
        "{} Depot server on {} ({:?} storage)",
        "✓".green().bold(),
        config.server.bind_addr.to_string().bold(),
        config.storage.backend
    );
    let server = DepotServer::from_config(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

fn cmd_package(state: &AppState, format: &OutputFormat, cmd: PackageCommand) -> anyhow::Result<()> {
    match cmd {
        PackageCommand::Create { owner, reference, name, description } => {
            let package = Package {
                owner_id: owner,
                reference,
                name,
                description,
            };
            validate_package(&package)?;
            let created = state.packages.create_package(package)?;
            emit(format, &created, |p| {
                println!("{} Created package {}", "✓".green().bold(), p.reference.yellow());
            })
        }
        PackageCommand::List { owner, paging } => {
            let request = page_request(&paging, state.default_page_size);
            let page = state.packages.list_packages(&owner, request)?;
            emit_page(format, page, |p| {
                println!("{}  {}", p.reference.yellow().bold(), p.name);
            })
        }
        PackageCommand::Show { owner, reference } => {
            let package = state.packages.get_package(&owner, &reference)?;
            emit(format, &package, print_package)
        }
    }
}

fn print_package(p: &Package) {
    println!("Package {}", p.reference.yellow().bold());
    println!("  Name: {}", p.name);
    if let Some(d) = &p.description {
        println!("  Description: {d}");
    }
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

fn cmd_version(state: &AppState, format: &OutputFormat, cmd: VersionCommand) -> anyhow::Result<()> {
    match cmd {
        VersionCommand::Publish { owner, package, id, file, name, description, metadata } => {
            let filename = file_name(&file)?;
            let mut version = Version::new(owner, package, id, name, filename);
            version.description = description;
            for entry in &metadata {
                let (key, value) = parse_metadata(entry)?;
                version.metadata.insert(key, value);
            }
            validate_version(&version)?;

            let content = File::open(&file)
                .with_context(|| format!("cannot open {}", file.display()))?;
            let created = state.versions.create_version(version, BufReader::new(content))?;
            emit(format, &created, |v| {
                println!(
                    "{} Published {} {} ({} bytes, md5 {})",
                    "✓".green().bold(),
                    v.package_ref.yellow(),
                    v.version_id.yellow().bold(),
                    v.length,
                    v.checksum.dimmed()
                );
            })
        }
        VersionCommand::List { owner, package, paging } => {
            let request = page_request(&paging, state.default_page_size);
            let page = state.versions.list_versions(&owner, &package, request)?;
            emit_page(format, page, |v| {
                println!(
                    "{}  {}  {} bytes  {}",
                    v.version_id.yellow().bold(),
                    v.name,
                    v.length,
                    v.checksum.dimmed()
                );
            })
        }
        VersionCommand::Show { owner, package, id } => {
            let version = state.versions.describe_version(&owner, &package, &id)?;
            emit(format, &version, print_version)
        }
        VersionCommand::Fetch { owner, package, id, output } => {
            let mut stored = state.versions.get_version(&owner, &package, &id)?;
            let copied = match &output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    let mut out = BufWriter::new(file);
                    let n = io::copy(&mut stored.content, &mut out)?;
                    out.flush()?;
                    n
                }
                None => {
                    let stdout = io::stdout();
                    let mut out = stdout.lock();
                    let n = io::copy(&mut stored.content, &mut out)?;
                    out.flush()?;
                    n
                }
            };
            if copied != stored.version.length {
                bail!(
                    "content of {owner}/{package}/{id} is {copied} bytes, expected {}",
                    stored.version.length
                );
            }
            if let Some(path) = output {
                eprintln!(
                    "{} Wrote {} bytes to {}",
                    "✓".green().bold(),
                    copied,
                    path.display().to_string().bold()
                );
            }
            Ok(())
        }
    }
}

fn print_version(v: &Version) {
    println!("Version {} of {}", v.version_id.yellow().bold(), v.package_ref.yellow());
    println!("  Name: {}", v.name);
    if let Some(d) = &v.description {
        println!("  Description: {d}");
    }
    println!("  File: {} ({} bytes)", v.filename, v.length);
    println!("  MD5: {}", v.checksum.cyan());
    for (key, value) in &v.metadata {
        println!("  {key}: {}", serde_json::to_string(value).unwrap_or_default());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn page_request(args: &PageArgs, default_size: u64) -> PageRequest {
    PageRequest::page(args.page, args.size.unwrap_or(default_size))
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

/// Split `KEY=VALUE`. The value is taken as a JSON scalar when it parses as
/// one (`true`, `42`, `1.5`, `null`), and as a string otherwise.
fn parse_metadata(entry: &str) -> anyhow::Result<(String, MetadataValue)> {
    let Some((key, raw)) = entry.split_once('=') else {
        bail!("metadata entry `{entry}` is not KEY=VALUE");
    };
    if key.trim().is_empty() {
        bail!("metadata entry `{entry}` has an empty key");
    }
    let value = serde_json::from_str::<MetadataValue>(raw)
        .unwrap_or_else(|_| MetadataValue::String(raw.to_string()));
    Ok((key.trim().to_string(), value))
}

fn emit<T: Serialize>(format: &OutputFormat, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}

fn emit_page<T: Serialize>(
    format: &OutputFormat,
    page: Page<T>,
    row: impl Fn(&T),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&PagedBody::from(page))?);
        }
        OutputFormat::Text => {
            if page.is_empty() {
                println!("{}", "Nothing here.".dimmed());
            }
            for item in &page.items {
                row(item);
            }
            println!(
                "{}",
                format!(
                    "page {} of {} ({} total)",
                    page.request.number() + 1,
                    page.total_pages().max(1),
                    page.total
                )
                .dimmed()
            );
        }
    }
    Ok(())
}
