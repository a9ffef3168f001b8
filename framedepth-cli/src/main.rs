//! framedepth CLI - call depth, test count, and duplication metrics for Python packages

#![deny(warnings)]

// Global invariants enforced:
// - Reports go to stdout, logs go to stderr
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use framedepth_core::config::{self, ResolvedConfig};
use framedepth_core::report::{render_dryness_text, render_tests_text};
use framedepth_core::{dryness, test_counter};
use framedepth_core::{analyze, quality_report, render_json, render_text, ScopeTracking};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "framedepth")]
#[command(about = "Static call depth analysis for Python packages")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute total call depth statistics for a package
    Analyze {
        /// Path to package directory or single Python file
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// How calls are attributed to enclosing functions (overrides config file)
        #[arg(long)]
        scope: Option<ScopeArg>,

        /// Parse files on a single thread (overrides config file)
        #[arg(long)]
        sequential: bool,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Count test functions in the package's test files
    Tests {
        /// Path to package directory
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Measure duplicated code blocks
    Dryness {
        /// Path to package directory
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run every analysis and emit one combined JSON document
    Report {
        /// Path to package directory
        path: PathBuf,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
enum ScopeArg {
    Stack,
    SingleSlot,
}

impl From<ScopeArg> for ScopeTracking {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Stack => ScopeTracking::Stack,
            ScopeArg::SingleSlot => ScopeTracking::SingleSlot,
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            path,
            format,
            scope,
            sequential,
            config: config_path,
        } => {
            let normalized_path = normalize_path(path)?;
            let resolved_config = load_config(&normalized_path, config_path.as_deref())?;

            // CLI flags override config file values
            let mut options = resolved_config.analysis_options();
            if let Some(scope) = scope {
                options.scope_tracking = scope.into();
            }
            if sequential {
                options.parallel = false;
            }

            let report = analyze(&normalized_path, &options)?;
            match format {
                OutputFormat::Text => print!("{}", render_text(&report)),
                OutputFormat::Json => println!("{}", render_json(&report)?),
            }
        }
        Commands::Tests {
            path,
            format,
            config: config_path,
        } => {
            let normalized_path = normalize_path(path)?;
            let resolved_config = load_config(&normalized_path, config_path.as_deref())?;
            let report = test_counter::count_tests_in_package(
                &normalized_path,
                &resolved_config.source_filter(),
            )?;
            match format {
                OutputFormat::Text => print!("{}", render_tests_text(&report)),
                OutputFormat::Json => println!("{}", render_json(&report)?),
            }
        }
        Commands::Dryness {
            path,
            format,
            config: config_path,
        } => {
            let normalized_path = normalize_path(path)?;
            let resolved_config = load_config(&normalized_path, config_path.as_deref())?;
            let report =
                dryness::check_dryness(&normalized_path, &resolved_config.source_filter())?;
            match format {
                OutputFormat::Text => print!("{}", render_dryness_text(&report)),
                OutputFormat::Json => println!("{}", render_json(&report)?),
            }
        }
        Commands::Report {
            path,
            config: config_path,
        } => {
            let normalized_path = normalize_path(path)?;
            let resolved_config = load_config(&normalized_path, config_path.as_deref())?;
            let report = quality_report(&normalized_path, &resolved_config)?;
            println!("{}", render_json(&report)?);
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                match config::load_and_resolve(&project_root, path.as_deref()) {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print!("{}", render_config(&resolved));
            }
        },
    }

    Ok(())
}

/// Make `path` absolute and check that it exists
fn normalize_path(path: PathBuf) -> anyhow::Result<PathBuf> {
    let normalized_path = if path.is_relative() {
        std::env::current_dir()?.join(&path)
    } else {
        path
    };

    if !normalized_path.exists() {
        anyhow::bail!("Path does not exist: {}", normalized_path.display());
    }
    Ok(normalized_path)
}

/// Directory searched for config files: the package itself, or a file's parent
fn config_root(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

fn load_config(path: &Path, config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let resolved = config::load_and_resolve(&config_root(path), config_path)
        .context("failed to load configuration")?;
    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    Ok(resolved)
}

fn render_config(resolved: &ResolvedConfig) -> String {
    let list = |patterns: &[String]| {
        if patterns.is_empty() {
            "none".to_string()
        } else {
            patterns.join(", ")
        }
    };

    let mut out = String::from("Configuration:\n");
    match resolved.config_path {
        Some(ref p) => out.push_str(&format!("  Source: {}\n", p.display())),
        None => out.push_str("  Source: defaults (no config file found)\n"),
    }
    out.push_str("\nAnalysis:\n");
    out.push_str(&format!(
        "  scope_tracking: {}\n",
        resolved.scope_tracking.as_str()
    ));
    out.push_str(&format!("  parallel: {}\n", resolved.parallel));
    out.push_str("\nFilters:\n");
    out.push_str(&format!("  venv_dir: {}\n", resolved.venv_dir));
    out.push_str(&format!("  include: {}\n", list(&resolved.include_patterns)));
    out.push_str(&format!("  exclude: {}\n", list(&resolved.exclude_patterns)));
    out
}
