use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{builtin, PluginDescriptor, ScannerPlugin};
use crate::error::{Result, ScanError};

static OPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap());

/// Validated, option-sorted set of scanner plugins.
pub struct Registry {
    plugins: Vec<Box<dyn ScannerPlugin>>,
}

impl Registry {
    /// Load every built-in plugin. A malformed plugin fails the whole load.
    pub fn load_all() -> Result<Self> {
        Self::from_plugins(builtin::all_plugins())
    }

    /// Validate an explicit plugin list and sort it by option.
    pub fn from_plugins(mut plugins: Vec<Box<dyn ScannerPlugin>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for plugin in &plugins {
            let descriptor = plugin.descriptor();
            validate(&descriptor)?;
            if !seen.insert(descriptor.option.clone()) {
                return Err(ScanError::Plugin {
                    option: descriptor.option,
                    message: "option registered twice".into(),
                });
            }
        }

        plugins.sort_by_key(|p| p.descriptor().option);
        tracing::debug!(count = plugins.len(), "scanner plugins loaded");
        Ok(Self { plugins })
    }

    pub fn plugins(&self) -> impl Iterator<Item = &dyn ScannerPlugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    pub fn get(&self, option: &str) -> Option<&dyn ScannerPlugin> {
        self.plugins()
            .find(|p| p.descriptor().option == option)
    }

    /// Descriptors in registry order.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.plugins().map(|p| p.descriptor()).collect()
    }
}

fn validate(descriptor: &PluginDescriptor) -> Result<()> {
    let invalid = |message: &str| ScanError::Plugin {
        option: descriptor.option.clone(),
        message: message.into(),
    };

    if descriptor.option.is_empty() {
        return Err(invalid("missing option name"));
    }
    if !OPTION_RE.is_match(&descriptor.option) {
        return Err(invalid("option must be lowercase letters, digits and dashes"));
    }
    if descriptor.description.trim().is_empty() {
        return Err(invalid("missing description"));
    }
    Ok(())
}
