//! Console front-end: progress lines, reports and prompts

use anyhow::Result;
use colored::*;
use dialoguer::{Confirm, MultiSelect};
use dotsetup::catalog::Catalog;
use dotsetup::error_classifier::InstallError;
use dotsetup::install_state::PackageStage;
use dotsetup::installer::{BatchReport, InstallObserver, InstallOutcome};
use dotsetup::preflight::PreflightReport;
use dotsetup::preview::{PreviewEntry, PreviewStats};
use dotsetup::progress::{ProgressState, ProgressStats};

/// Prints one line per interesting lifecycle event
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    pub verbose: bool,
}

impl InstallObserver for ConsoleObserver {
    fn on_progress(&self, package_id: &str, stage: PackageStage) {
        match stage {
            PackageStage::Installing => println!("{} {}", "→".cyan(), package_id),
            PackageStage::Retrying => println!("{} {} retrying", "↻".yellow(), package_id),
            PackageStage::RollingBack => println!("{} {} rolling back", "↶".yellow(), package_id),
            PackageStage::Done => println!("{} {}", "✓".green(), package_id),
            PackageStage::Failed => println!("{} {}", "✗".red(), package_id.red()),
            PackageStage::NotStarted
            | PackageStage::CheckingInstalled
            | PackageStage::CheckingDependencies => {
                if self.verbose {
                    println!("  {} {}", package_id.dimmed(), stage.to_string().dimmed());
                }
            }
        }
    }

    fn on_error(&self, error: &InstallError) {
        println!(
            "  {} {} [{}]",
            "error:".red(),
            error.error.lines().next().unwrap_or_default(),
            error.category
        );
    }
}

pub fn print_report(report: &BatchReport) {
    println!();
    println!("{}", "Installation Summary".bold());
    println!("{}", "-".repeat(40));
    println!("  {} {}", "Succeeded:".green(), report.successful.len());
    println!("  {} {}", "Failed:".red(), report.failed.len());
    println!("  {} {}", "Rolled back:".yellow(), report.rolled_back.len());
    if !report.cancelled.is_empty() {
        println!("  {} {}", "Not started:".yellow(), report.cancelled.len());
    }

    for outcome in &report.failed {
        print_failure(outcome);
    }

    if !report.failed.is_empty() || !report.cancelled.is_empty() {
        println!();
        println!(
            "Run {} to continue or {} to try the failures again.",
            "dotsetup resume".bold(),
            "dotsetup retry-failed".bold()
        );
    }
}

fn print_failure(outcome: &InstallOutcome) {
    println!(
        "  {} {} ({} attempt{}): {}",
        "✗".red(),
        outcome.package.display_name,
        outcome.attempts,
        if outcome.attempts == 1 { "" } else { "s" },
        outcome.error.as_deref().unwrap_or("Unknown error")
    );
}

pub fn print_catalog(catalog: &Catalog) {
    for category in catalog.categories() {
        let marker = if category.selected { "[x]" } else { "[ ]" };
        println!(
            "{} {} {} - {}",
            marker,
            category.id.bold(),
            format!("({})", category.name).dimmed(),
            category.description
        );
        for pkg in &category.packages {
            println!("      {: <22} {: <8} {}", pkg.id, pkg.method.to_string(), pkg.display_name);
        }
    }
}

pub fn print_preview(entries: &[PreviewEntry], stats: PreviewStats) {
    println!(
        "{: <22} {: <8} {: <12} {}",
        "Package".bold(),
        "Method".bold(),
        "Size".bold(),
        "Status".bold()
    );
    println!("{}", "-".repeat(70));
    for entry in entries {
        let status = if entry.already_installed {
            "installed".green().to_string()
        } else if entry.missing_dependencies.is_empty() {
            "will install".cyan().to_string()
        } else {
            format!("will install (needs {})", entry.missing_dependencies.join(", "))
                .yellow()
                .to_string()
        };
        println!(
            "{: <22} {: <8} {: <12} {}",
            entry.package,
            entry.method.to_string(),
            entry.estimated_size,
            status
        );
    }
    println!();
    println!(
        "{} total, {} to install, {} already installed",
        stats.total, stats.to_install, stats.already_installed
    );
}

pub fn print_progress(state: &ProgressState, stats: ProgressStats) {
    println!("{}", "Saved progress".bold());
    for (id, status) in &state.packages {
        println!("  {: <22} {}", id, status);
    }
    println!();
    println!(
        "{} total: {} completed, {} failed, {} pending, {} installing",
        stats.total, stats.completed, stats.failed, stats.pending, stats.installing
    );
}

pub fn print_preflight(report: &PreflightReport) {
    let check = |ok: bool| if ok { "✓".green() } else { "✗".red() };

    println!("{}", "Pre-flight Checks".bold());
    println!(
        "  {} System: {} {} (shell {}, user {})",
        check(report.compatible),
        report.system.os,
        report.system.arch,
        report.system.shell,
        report.system.user
    );
    if report.missing_tools.is_empty() {
        println!("  {} Base tools present", check(true));
    } else {
        println!(
            "  {} Missing tools: {} (install: sudo apt-get install -y {})",
            check(false),
            report.missing_tools.join(", "),
            report.missing_tools.join(" ")
        );
    }
    println!(
        "  {} Passwordless sudo{}",
        check(report.passwordless_sudo),
        if report.passwordless_sudo { "" } else { " (you may be prompted)" }
    );
    if let Some(updated) = report.system_updated {
        println!("  {} System update", check(updated));
    }
}

/// Let the user pick categories; returns false if nothing was selected
pub fn select_categories(catalog: &mut Catalog) -> Result<bool> {
    let labels: Vec<String> = catalog
        .categories()
        .iter()
        .map(|c| format!("{} - {}", c.name, c.description))
        .collect();
    let defaults: Vec<bool> = catalog.categories().iter().map(|c| c.selected).collect();

    let chosen = MultiSelect::new()
        .with_prompt("Select categories to install (space to toggle, enter to confirm)")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;

    let ids: Vec<String> = chosen
        .into_iter()
        .filter_map(|i| catalog.categories().get(i).map(|c| c.id.clone()))
        .collect();
    catalog.select_only(&ids)?;
    Ok(!ids.is_empty())
}

pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?)
}
