use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scanners::matcher;
use crate::ScanOptions;

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".proxyscan.toml";

/// Top-level configuration from `.proxyscan.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Which management server to talk to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub org: Option<String>,
    #[serde(default)]
    pub apigeex: bool,
    /// Management server override.
    pub url: Option<String>,
}

/// What to scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default)]
    pub deployed: bool,
    pub environment: Option<String>,
    #[serde(default)]
    pub latest_revision: bool,
    pub name_pattern: Option<String>,
    pub work_dir: Option<PathBuf>,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl ScanConfig {
    /// Layer command-line values over the file: values replace, switches
    /// are OR-ed.
    pub fn merge(mut self, overrides: ScanConfig) -> Self {
        self.deployed |= overrides.deployed;
        self.latest_revision |= overrides.latest_revision;
        if overrides.environment.is_some() {
            self.environment = overrides.environment;
        }
        if overrides.name_pattern.is_some() {
            self.name_pattern = overrides.name_pattern;
        }
        if overrides.work_dir.is_some() {
            self.work_dir = overrides.work_dir;
        }
        self
    }

    /// Validate and compile into the options the library runs with.
    pub fn into_options(self, verbose: bool) -> Result<ScanOptions> {
        let name_pattern = self
            .name_pattern
            .as_deref()
            .map(|p| matcher::compile("namepattern", p))
            .transpose()?;
        Ok(ScanOptions {
            deployed: self.deployed,
            environment: self.environment,
            name_pattern,
            latest_revision: self.latest_revision,
            work_dir: self.work_dir,
            verbose,
        })
    }
}
