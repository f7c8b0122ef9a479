//! Run configuration loaded from `.playlint.yml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rules::DEFAULT_MAX_LINE_LENGTH;

/// Configuration file names searched for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &[".playlint.yml", ".playlint.yaml", "playlint.yml"];

/// Settings for a lint run. Every field is optional in the file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LintConfig {
    /// Only run rules carrying one of these tags (or ids)
    pub tags: Vec<String>,
    /// Never run rules carrying one of these tags (or ids)
    pub skip_list: Vec<String>,
    /// Glob patterns for files and directories left out of the run
    pub exclude_paths: Vec<String>,
    /// Lint files on a thread pool
    pub parallel: bool,
    pub max_line_length: usize,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            skip_list: Vec::new(),
            exclude_paths: Vec::new(),
            parallel: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl LintConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let blank = content.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            return Ok(Self::default());
        }
        let config: LintConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Merge command-line selections into the file's settings.
    pub fn extend_from_args(&mut self, tags: &[String], skip_list: &[String]) {
        self.tags.extend(tags.iter().cloned());
        self.skip_list.extend(skip_list.iter().cloned());
    }
}

/// Find a configuration file in `dir`, if there is one.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Validate a configuration for correctness.
pub fn validate(config: &LintConfig) -> anyhow::Result<()> {
    if config.max_line_length == 0 {
        anyhow::bail!("max_line_length must be greater than zero");
    }

    for pattern in &config.exclude_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid exclude_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}
