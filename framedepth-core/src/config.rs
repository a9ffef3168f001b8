//! Configuration file support for framedepth
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.framedepthrc.json` in the package root
//! 3. `framedepth.config.json` in the package root
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::callgraph::ScopeTracking;
use crate::discover::{SourceFilter, DEFAULT_VENV_DIR};
use crate::AnalysisOptions;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const RC_FILE: &str = ".framedepthrc.json";
const CONFIG_FILE: &str = "framedepth.config.json";

/// framedepth configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FramedepthConfig {
    /// Glob patterns for files to include (default: every Python file)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns excluded on top of the built-in test/venv rule
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Dependency-install directory name (default: "venv")
    #[serde(default)]
    pub venv_dir: Option<String>,

    /// Call attribution mode (default: stack)
    #[serde(default)]
    pub scope_tracking: Option<ScopeTracking>,

    /// Parse files on the rayon pool (default: true)
    #[serde(default)]
    pub parallel: Option<bool>,
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub include: Option<GlobSet>,
    pub exclude: Option<GlobSet>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub venv_dir: String,
    pub scope_tracking: ScopeTracking,
    pub parallel: bool,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

impl FramedepthConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref venv_dir) = self.venv_dir {
            if venv_dir.is_empty() {
                anyhow::bail!("venv_dir must not be empty");
            }
            if venv_dir.contains('/') || venv_dir.contains('\\') {
                anyhow::bail!(
                    "venv_dir must be a single directory name (got {})",
                    venv_dir
                );
            }
        }

        // Validate glob patterns compile
        for pattern in &self.include {
            Glob::new(pattern).with_context(|| format!("invalid include pattern: {}", pattern))?;
        }
        for pattern in &self.exclude {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        Ok(ResolvedConfig {
            include: build_globset(&self.include)?,
            exclude: build_globset(&self.exclude)?,
            include_patterns: self.include.clone(),
            exclude_patterns: self.exclude.clone(),
            venv_dir: self
                .venv_dir
                .clone()
                .unwrap_or_else(|| DEFAULT_VENV_DIR.to_string()),
            scope_tracking: self.scope_tracking.unwrap_or_default(),
            parallel: self.parallel.unwrap_or(true),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        FramedepthConfig::default().resolve()
    }

    /// Path filter carrying the venv name and user globs
    pub fn source_filter(&self) -> SourceFilter {
        SourceFilter::new(self.venv_dir.clone())
            .with_globs(self.include.clone(), self.exclude.clone())
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            scope_tracking: self.scope_tracking,
            parallel: self.parallel,
            filter: self.source_filter(),
        }
    }
}

/// Discover and load a config file from the package root
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(FramedepthConfig, PathBuf)>> {
    for name in [RC_FILE, CONFIG_FILE] {
        let path = project_root.join(name);
        if path.is_file() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<FramedepthConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: FramedepthConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (FramedepthConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
