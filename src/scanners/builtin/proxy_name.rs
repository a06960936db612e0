use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use crate::error::Result;
use crate::model::ProxyDefinition;
use crate::scanners::{
    matcher, Finding, PluginDescriptor, ProxyScanner, Scanner, ScannerContext, ScannerKind,
    ScannerPlugin,
};

const OPTION: &str = "proxyname";

/// `--proxyname REGEX`: proxies whose name matches a pattern.
pub struct ProxyNamePlugin;

impl ScannerPlugin for ProxyNamePlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "proxy name matching a regex".into(),
            kind: ScannerKind::Proxy,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        let pattern = ctx.arg.required(OPTION)?;
        Ok(Scanner::Proxy(Box::new(ProxyNameScanner {
            regex: matcher::compile(OPTION, pattern)?,
            pattern: pattern.to_string(),
            verbose: ctx.verbose,
        })))
    }
}

struct ProxyNameScanner {
    regex: Regex,
    pattern: String,
    verbose: bool,
}

#[async_trait]
impl ProxyScanner for ProxyNameScanner {
    async fn scan(&self, proxy: &ProxyDefinition) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %proxy.name, scanner = OPTION, "examining proxy");
        }
        Ok(self.regex.is_match(&proxy.name).then(|| {
            Finding::proxy(&proxy.name, format!("proxyname match '{}'", self.pattern))
        }))
    }
}
