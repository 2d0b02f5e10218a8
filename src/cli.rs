use clap::{Args, Parser, Subcommand};
use dotsetup::types::RunMode;
use std::path::PathBuf;

/// dotsetup - Resumable workstation package installer
#[derive(Parser, Debug)]
#[command(name = "dotsetup")]
#[command(about = "Install developer tools from a categorized catalog, with retries, rollback and resume")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON); command-line flags override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Echo every command and its output to the log
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show what would be installed without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Number of packages installed at once (1-5)
    #[arg(short = 'j', long, global = true)]
    pub parallel: Option<usize>,

    /// Never prompt; install the categories named in the configuration file
    #[arg(long, global = true, requires = "config")]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install packages (default: choose categories interactively)
    Install {
        #[command(flatten)]
        selection: Selection,
    },
    /// Show what an install would do without running it
    Preview {
        #[command(flatten)]
        selection: Selection,
    },
    /// Uninstall one package using its method's remove command
    Remove {
        /// Package id
        id: String,
    },
    /// Report whether packages are installed
    Check {
        /// Package ids (default: every package in the catalog)
        ids: Vec<String>,
    },
    /// List categories and their packages
    List,
    /// Continue an interrupted run
    Resume,
    /// Re-run the packages that failed last time
    RetryFailed,
    /// Show saved progress
    Progress {
        /// Delete the progress file
        #[arg(long)]
        clear: bool,
    },
    /// Check the system before installing
    Preflight {
        /// Also run apt-get update/upgrade
        #[arg(long)]
        update: bool,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(value_name = "CONFIG")]
        file: PathBuf,
    },
}

/// Which packages a command applies to
#[derive(Args, Debug, Default, Clone)]
pub struct Selection {
    /// Package ids or names
    pub packages: Vec<String>,

    /// Every category
    #[arg(long, conflicts_with_all = ["essentials", "categories"])]
    pub all: bool,

    /// The essential categories only
    #[arg(long, conflicts_with = "categories")]
    pub essentials: bool,

    /// Category ids (repeatable)
    #[arg(long = "category", short = 'C')]
    pub categories: Vec<String>,
}

impl Selection {
    /// True when nothing was chosen on the command line
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && !self.all && !self.essentials && self.categories.is_empty()
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Interactive unless `--headless` was given with a config file
    pub fn run_mode(&self) -> RunMode {
        match (&self.config, self.headless) {
            (Some(config), true) => RunMode::Headless {
                config: config.clone(),
            },
            _ => RunMode::Interactive,
        }
    }
}
