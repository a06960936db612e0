use async_trait::async_trait;
use tracing::info;

use crate::error::{Result, ScanError};
use crate::model::ProxyDefinition;
use crate::scanners::{
    Finding, PluginDescriptor, ProxyScanner, Scanner, ScannerContext, ScannerKind, ScannerPlugin,
};

const OPTION: &str = "revisioncount";

/// `--revisioncount N`: proxies carrying N or more revisions.
pub struct RevisionCountPlugin;

impl ScannerPlugin for RevisionCountPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "flags each proxy with a number of revisions at or above a threshold".into(),
            kind: ScannerKind::Proxy,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        let raw = ctx.arg.required(OPTION)?;
        let threshold = raw.trim().parse::<usize>().map_err(|_| {
            ScanError::Config(format!("--{OPTION} expects a whole number, got '{raw}'"))
        })?;
        Ok(Scanner::Proxy(Box::new(RevisionCountScanner {
            threshold,
            verbose: ctx.verbose,
        })))
    }
}

struct RevisionCountScanner {
    threshold: usize,
    verbose: bool,
}

#[async_trait]
impl ProxyScanner for RevisionCountScanner {
    async fn scan(&self, proxy: &ProxyDefinition) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %proxy.name, scanner = OPTION, "examining proxy");
        }
        let count = proxy.revision.len();
        if count < self.threshold {
            return Ok(None);
        }
        Ok(Some(Finding::proxy(
            &proxy.name,
            format!(
                "number of revisions at or above threshold ({count} >= {})",
                self.threshold
            ),
        )))
    }
}
