//! Scanner plugin contract.
//!
//! A plugin describes itself ([`PluginDescriptor`]) and, given a
//! [`ScannerContext`], builds either a [`ProxyScanner`] or a
//! [`RevisionScanner`]. Plugins are compiled in and collected by the
//! [`Registry`].

pub mod builtin;
pub mod finding;
pub mod matcher;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::ManagementApi;
use crate::error::{Result, ScanError};
use crate::model::{ProxyDefinition, RevisionContext};

pub use finding::{Finding, Matched, TargetMatch};
pub use registry::Registry;

/// What a scanner examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerKind {
    /// The proxy definition (name, revision list).
    Proxy,
    /// One revision of a proxy.
    Revision,
}

impl std::fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proxy => write!(f, "proxy"),
            Self::Revision => write!(f, "revision"),
        }
    }
}

/// Where a revision scanner gets its facts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Sub-fetches against the management API.
    Api,
    /// XML files in the unpacked bundle.
    Bundle,
}

/// The command-line value bound to a plugin's option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginArg {
    /// Presence flag of a `noarg` plugin.
    Flag,
    Value(String),
}

impl PluginArg {
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Flag => None,
            Self::Value(v) => Some(v),
        }
    }

    /// The value, or a configuration error naming the option.
    pub fn required(&self, option: &str) -> Result<&str> {
        self.value()
            .ok_or_else(|| ScanError::Config(format!("--{option} requires an argument")))
    }
}

/// Self-description of a plugin, used for the CLI and `--list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Unique identifier; also the CLI flag name.
    pub option: String,
    pub description: String,
    pub kind: ScannerKind,
    /// The flag takes no value.
    pub noarg: bool,
}

/// Everything a plugin factory gets to build its scanner.
#[derive(Clone)]
pub struct ScannerContext {
    pub api: Arc<dyn ManagementApi>,
    pub arg: PluginArg,
    /// Emit per-item progress events.
    pub verbose: bool,
}

#[async_trait]
pub trait ProxyScanner: Send + Sync {
    async fn scan(&self, proxy: &ProxyDefinition) -> Result<Option<Finding>>;
}

#[async_trait]
pub trait RevisionScanner: Send + Sync {
    fn data_source(&self) -> DataSource {
        DataSource::Api
    }

    async fn scan(&self, revision: &RevisionContext) -> Result<Option<Finding>>;
}

/// A realized scan function.
pub enum Scanner {
    Proxy(Box<dyn ProxyScanner>),
    Revision(Box<dyn RevisionScanner>),
}

impl Scanner {
    pub fn kind(&self) -> ScannerKind {
        match self {
            Self::Proxy(_) => ScannerKind::Proxy,
            Self::Revision(_) => ScannerKind::Revision,
        }
    }
}

/// A scanner plugin: descriptor plus factory.
pub trait ScannerPlugin: Send + Sync {
    fn descriptor(&self) -> PluginDescriptor;

    fn build(&self, ctx: ScannerContext) -> Result<Scanner>;
}
