//! proxyscan: compliance scanner for Apigee API proxies.
//!
//! Walks the proxies of an organization (or only what is deployed), resolves
//! the revisions of each proxy and runs pluggable scanners over them. Proxy
//! scanners look at the proxy definition; revision scanners look at one
//! revision, either through the management API or through the exported
//! bundle unpacked into a scoped temporary directory.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use proxyscan::api::client::{Credentials, Flavor, ManagementClient};
//! use proxyscan::scanners::{PluginArg, Registry};
//! use proxyscan::{scan, ScanOptions};
//!
//! # async fn run() -> proxyscan::error::Result<()> {
//! let client = ManagementClient::new(Flavor::X, None, "my-org", Credentials::Token("...".into()))?;
//! let registry = Registry::load_all()?;
//! let plugin = registry.get("policytype").unwrap();
//! let findings = scan(
//!     Arc::new(client),
//!     vec![(plugin, PluginArg::Value("JavaCallout".into()))],
//!     &ScanOptions::default(),
//! )
//! .await?;
//! println!("{} finding(s)", findings.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod bundle;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod parser;
pub mod scanners;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;

use api::ManagementApi;
use engine::Orchestrator;
use error::{Result, ScanError};
use output::OutputFormat;
use scanners::{Finding, PluginArg, Scanner, ScannerContext, ScannerPlugin};

/// Options for a scan invocation, after merging the config file and the
/// command line.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Scan only what is deployed instead of the whole catalog.
    pub deployed: bool,
    /// Restrict the deployed query to one environment.
    pub environment: Option<String>,
    /// Keep only proxies whose name matches.
    pub name_pattern: Option<Regex>,
    /// Scan only the highest revision of each proxy.
    pub latest_revision: bool,
    /// Parent directory for the scoped bundle workspace (system temp dir if unset).
    pub work_dir: Option<PathBuf>,
    /// Scanners emit per-revision progress events.
    pub verbose: bool,
}

/// A plugin chosen on the command line, with the value bound to its option.
pub type Activation<'a> = (&'a dyn ScannerPlugin, PluginArg);

/// Build each activated plugin into a scanner, in activation order.
///
/// Plugins are built before any API traffic, so bad scanner arguments fail
/// the run up front.
pub fn build_scanners(
    api: &Arc<dyn ManagementApi>,
    activations: Vec<Activation<'_>>,
    verbose: bool,
) -> Result<Vec<Scanner>> {
    activations
        .into_iter()
        .map(|(plugin, arg)| {
            let descriptor = plugin.descriptor();
            let scanner = plugin.build(ScannerContext {
                api: Arc::clone(api),
                arg,
                verbose,
            })?;
            if scanner.kind() != descriptor.kind {
                return Err(ScanError::Plugin {
                    option: descriptor.option,
                    message: format!(
                        "declared as a {} scanner but built a {} scanner",
                        descriptor.kind,
                        scanner.kind()
                    ),
                });
            }
            Ok(scanner)
        })
        .collect()
}

/// Run a complete scan: resolve the target universe, walk proxies and
/// revisions, and collect the findings in order.
pub async fn scan(
    api: Arc<dyn ManagementApi>,
    activations: Vec<Activation<'_>>,
    options: &ScanOptions,
) -> Result<Vec<Finding>> {
    let scanners = build_scanners(&api, activations, options.verbose)?;
    Orchestrator::new(api.as_ref(), scanners, options).run().await
}

/// Render findings in the specified format.
pub fn render_report(findings: &[Finding], format: OutputFormat) -> Result<String> {
    output::render(findings, format)
}
