use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use crate::api::ManagementApi;
use crate::error::Result;
use crate::model::RevisionContext;
use crate::scanners::{
    matcher, Finding, PluginDescriptor, RevisionScanner, Scanner, ScannerContext, ScannerKind,
    ScannerPlugin,
};

const OPTION: &str = "proxydesc";

/// `--proxydesc REGEX`: revisions whose description matches a pattern.
pub struct ProxyDescriptionPlugin;

impl ScannerPlugin for ProxyDescriptionPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "proxy revision description matching a regex".into(),
            kind: ScannerKind::Revision,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        let pattern = ctx.arg.required(OPTION)?;
        Ok(Scanner::Revision(Box::new(ProxyDescriptionScanner {
            api: ctx.api.clone(),
            regex: matcher::compile(OPTION, pattern)?,
            pattern: pattern.to_string(),
            verbose: ctx.verbose,
        })))
    }
}

struct ProxyDescriptionScanner {
    api: Arc<dyn ManagementApi>,
    regex: Regex,
    pattern: String,
    verbose: bool,
}

#[async_trait]
impl RevisionScanner for ProxyDescriptionScanner {
    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let definition = self.api.get_revision(&ctx.name, ctx.revision).await?;
        let matched = definition
            .description
            .as_deref()
            .is_some_and(|d| self.regex.is_match(d));
        Ok(matched.then(|| {
            Finding::revision(
                &ctx.name,
                ctx.revision,
                format!("description match '{}'", self.pattern),
            )
        }))
    }
}
