use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use crate::error::Result;
use crate::model::RevisionContext;
use crate::parser::load_policies;
use crate::scanners::{
    matcher, DataSource, Finding, Matched, PluginDescriptor, RevisionScanner, Scanner,
    ScannerContext, ScannerKind, ScannerPlugin,
};

const OPTION: &str = "policyname";

/// `--policyname REGEX`: policies whose `name` attribute matches.
pub struct PolicyNamePlugin;

impl ScannerPlugin for PolicyNamePlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "policies with a name matching a regex".into(),
            kind: ScannerKind::Revision,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        let pattern = ctx.arg.required(OPTION)?;
        Ok(Scanner::Revision(Box::new(PolicyNameScanner {
            regex: matcher::compile(OPTION, pattern)?,
            pattern: pattern.to_string(),
            verbose: ctx.verbose,
        })))
    }
}

struct PolicyNameScanner {
    regex: Regex,
    pattern: String,
    verbose: bool,
}

#[async_trait]
impl RevisionScanner for PolicyNameScanner {
    fn data_source(&self) -> DataSource {
        DataSource::Bundle
    }

    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let matched: Vec<String> = load_policies(ctx.bundle_dir()?)?
            .into_iter()
            .filter(|p| self.regex.is_match(p.name.as_deref().unwrap_or_default()))
            .map(|p| p.file_name)
            .collect();
        if matched.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Finding::revision(
                &ctx.name,
                ctx.revision,
                format!("policy name regex '{}'", self.pattern),
            )
            .with_matched(Matched::Policies(matched)),
        ))
    }
}
