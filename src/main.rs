//! dotsetup - Main entry point
//!
//! Parses arguments once, builds the configuration and run mode, and hands
//! them to the library. Nothing below this file looks at process arguments.

mod cli;
mod console;

use anyhow::{Context, Result, bail};
use dotsetup::catalog::{Catalog, PackageRecord};
use dotsetup::config::OrchestratorConfig;
use dotsetup::error::SetupError;
use dotsetup::installer::Installer;
use dotsetup::preflight;
use dotsetup::preview::{calculate_stats, preview_installation};
use dotsetup::process_guard::{self, CancelToken};
use dotsetup::types::RunMode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, Selection};
use crate::console::ConsoleObserver;

/// Log to stderr; `RUST_LOG` overrides the default level
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    debug!("CLI arguments parsed");

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

/// Configuration file (if any) with command-line flags layered on top
fn load_config(cli: &Cli) -> Result<OrchestratorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            OrchestratorConfig::load_from_file(path)?
        }
        None => OrchestratorConfig::default(),
    };

    config.verbose |= cli.verbose;
    config.dry_run |= cli.dry_run;
    if let Some(parallel) = cli.parallel {
        config.parallel_installs = parallel;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_catalog(config: &OrchestratorConfig) -> Result<Catalog> {
    match &config.catalog_file {
        Some(path) => Catalog::from_file(path)
            .with_context(|| format!("Failed to load catalog from {:?}", path)),
        None => Ok(Catalog::builtin()),
    }
}

fn run(cli: Cli) -> Result<i32> {
    if let Some(Commands::Validate { file }) = &cli.command {
        return validate(file);
    }

    let mode = cli.run_mode();
    let config = load_config(&cli)?;
    let mut catalog = load_catalog(&config)?;
    let observer = ConsoleObserver {
        verbose: config.verbose,
    };

    match cli.command {
        None => install(&config, &mode, &mut catalog, &Selection::default(), &observer),
        Some(Commands::Install { selection }) => {
            install(&config, &mode, &mut catalog, &selection, &observer)
        }
        Some(Commands::Preview { selection }) => {
            let packages = select_packages(&mut catalog, &selection, &config, &mode)?;
            preview(&config, &packages)
        }
        Some(Commands::Remove { id }) => remove(&config, &mode, &catalog, &id),
        Some(Commands::Check { ids }) => check(&config, &catalog, &ids),
        Some(Commands::List) => {
            console::print_catalog(&catalog);
            Ok(0)
        }
        Some(Commands::Resume) => {
            let installer = batch_installer(&config)?;
            if !installer.progress().is_some_and(|p| p.can_resume()) {
                println!("Nothing to resume.");
                return Ok(0);
            }
            if config.dry_run {
                return preview(&config, &installer.resumable_packages(&catalog));
            }
            let report = installer.resume(&catalog, &observer)?;
            console::print_report(&report);
            Ok(report.exit_code())
        }
        Some(Commands::RetryFailed) => {
            let installer = batch_installer(&config)?;
            if config.dry_run {
                let packages = installer.failed_packages(&catalog);
                if packages.is_empty() {
                    println!("No failed packages recorded.");
                    return Ok(0);
                }
                return preview(&config, &packages);
            }
            let report = installer.retry_failed(&catalog, &observer)?;
            if report.outcomes().is_empty() {
                println!("No failed packages recorded.");
                return Ok(0);
            }
            console::print_report(&report);
            Ok(report.exit_code())
        }
        Some(Commands::Progress { clear }) => progress(&config, clear),
        Some(Commands::Preflight { update }) => {
            let installer = Installer::from_config(&config)?;
            let update = update && !config.skip_system_update && !config.dry_run;
            let report = preflight::run_preflight(installer.executor(), update, config.verbose);
            console::print_preflight(&report);
            Ok(if report.is_ok() { 0 } else { 1 })
        }
        Some(Commands::Validate { .. }) => Ok(0),
    }
}

fn validate(path: &std::path::Path) -> Result<i32> {
    info!("Validating configuration file: {:?}", path);
    let config = OrchestratorConfig::load_from_file(path)?;
    match config.validate() {
        Ok(()) => {
            println!("✓ Configuration file is valid: {:?}", path);
            Ok(0)
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed: {}", e);
            Ok(1)
        }
    }
}

/// Installer wired to the per-user files and to SIGINT/SIGTERM
fn batch_installer(config: &OrchestratorConfig) -> Result<Installer> {
    let token = CancelToken::new();
    if let Err(e) = process_guard::init_signal_handlers(token.clone()) {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    Ok(Installer::from_config(config)?.with_cancel_token(token))
}

/// Packages named by `selection`, falling back to the configured or
/// interactively chosen categories
fn select_packages(
    catalog: &mut Catalog,
    selection: &Selection,
    config: &OrchestratorConfig,
    mode: &RunMode,
) -> Result<Vec<PackageRecord>> {
    if selection.is_empty() {
        return configured_or_chosen(catalog, config, mode);
    }
    if !selection.packages.is_empty() {
        return selection
            .packages
            .iter()
            .map(|term| find(catalog, term))
            .collect();
    }

    if selection.all {
        catalog.select_all();
    } else if selection.essentials {
        catalog.select_essentials();
    } else {
        catalog.select_only(&selection.categories)?;
    }
    Ok(catalog.selected_packages())
}

/// Categories from the config file, or from the interactive prompt
fn configured_or_chosen(
    catalog: &mut Catalog,
    config: &OrchestratorConfig,
    mode: &RunMode,
) -> Result<Vec<PackageRecord>> {
    match mode {
        RunMode::Headless { config: path } => {
            if config.categories.is_empty() {
                bail!("{:?} selects no categories", path);
            }
            catalog.select_only(&config.categories)?;
        }
        RunMode::Interactive => {
            if !config.categories.is_empty() {
                catalog.select_only(&config.categories)?;
            }
            if !console::select_categories(catalog)? {
                return Ok(Vec::new());
            }
        }
    }
    Ok(catalog.selected_packages())
}

fn install(
    config: &OrchestratorConfig,
    mode: &RunMode,
    catalog: &mut Catalog,
    selection: &Selection,
    observer: &ConsoleObserver,
) -> Result<i32> {
    let packages = select_packages(catalog, selection, config, mode)?;
    if packages.is_empty() {
        println!("Nothing selected.");
        return Ok(0);
    }

    if config.dry_run {
        return preview(config, &packages);
    }

    if mode.is_interactive()
        && !console::confirm(&format!("Install {} package(s)?", packages.len()))?
    {
        return Ok(0);
    }

    let installer = batch_installer(config)?;
    let report = installer.install_batch(&packages, observer)?;
    console::print_report(&report);
    Ok(report.exit_code())
}

fn preview(config: &OrchestratorConfig, packages: &[PackageRecord]) -> Result<i32> {
    let installer = Installer::from_config(config)?;
    let entries = preview_installation(
        packages,
        installer.executor(),
        installer.registry(),
        installer.resolver(),
    );
    console::print_preview(&entries, calculate_stats(&entries));
    Ok(0)
}

fn find(catalog: &Catalog, term: &str) -> Result<PackageRecord> {
    catalog
        .find_by_id(term)
        .or_else(|| catalog.find_by_fuzzy_name(term).map(|(_, pkg)| pkg))
        .cloned()
        .ok_or_else(|| SetupError::UnknownPackage(term.to_string()).into())
}

fn remove(config: &OrchestratorConfig, mode: &RunMode, catalog: &Catalog, id: &str) -> Result<i32> {
    let pkg = find(catalog, id)?;
    let installer = Installer::from_config(config)?;

    let Some(command) = installer.registry().rollback_command(&pkg) else {
        bail!(
            "Cannot automatically remove {} (method: {})",
            pkg.display_name,
            pkg.method
        );
    };

    if config.dry_run {
        println!("Would run: {}", command);
        return Ok(0);
    }
    if mode.is_interactive() && !console::confirm(&format!("Remove {}?", pkg.display_name))? {
        return Ok(0);
    }

    let result = installer.remove(&pkg);
    if result.success {
        println!("✓ Removed {}", pkg.display_name);
        Ok(0)
    } else {
        eprintln!("✗ Failed to remove {}: {}", pkg.display_name, result.error_message());
        Ok(1)
    }
}

fn check(config: &OrchestratorConfig, catalog: &Catalog, ids: &[String]) -> Result<i32> {
    let packages: Vec<PackageRecord> = if ids.is_empty() {
        catalog.all_packages().cloned().collect()
    } else {
        ids.iter().map(|id| find(catalog, id)).collect::<Result<_>>()?
    };

    let installer = Installer::from_config(config)?;
    for pkg in &packages {
        let mark = if installer.is_installed(pkg) { "✓" } else { "·" };
        println!("{} {: <22} {}", mark, pkg.id, pkg.display_name);
    }
    Ok(0)
}

fn progress(config: &OrchestratorConfig, clear: bool) -> Result<i32> {
    let installer = Installer::from_config(config)?;
    let Some(store) = installer.progress() else {
        return Ok(0);
    };

    if clear {
        store.clear()?;
        println!("✓ Cleared {}", store.path().display());
        return Ok(0);
    }

    match store.load() {
        Some(state) => console::print_progress(&state, state.stats()),
        None => println!("No saved progress."),
    }
    Ok(0)
}
