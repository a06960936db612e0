use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::model::RevisionContext;
use crate::parser::load_policies;
use crate::scanners::matcher::NameMatcher;
use crate::scanners::{
    DataSource, Finding, Matched, PluginDescriptor, RevisionScanner, Scanner, ScannerContext,
    ScannerKind, ScannerPlugin,
};

const OPTION: &str = "sharedflowuse";

/// `--sharedflowuse NAME|/REGEX/`: FlowCallouts into a shared flow.
pub struct SharedFlowUsePlugin;

impl ScannerPlugin for SharedFlowUsePlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "FlowCallout policies referencing a shared flow (name or /regex/)".into(),
            kind: ScannerKind::Revision,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        let arg = ctx.arg.required(OPTION)?;
        Ok(Scanner::Revision(Box::new(SharedFlowUseScanner {
            matcher: NameMatcher::parse(OPTION, arg)?,
            arg: arg.to_string(),
            verbose: ctx.verbose,
        })))
    }
}

struct SharedFlowUseScanner {
    matcher: NameMatcher,
    arg: String,
    verbose: bool,
}

#[async_trait]
impl RevisionScanner for SharedFlowUseScanner {
    fn data_source(&self) -> DataSource {
        DataSource::Bundle
    }

    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let matched: Vec<String> = load_policies(ctx.bundle_dir()?)?
            .into_iter()
            .filter(|p| {
                p.shared_flow_bundle
                    .as_deref()
                    .is_some_and(|bundle| self.matcher.is_match(bundle))
            })
            .map(|p| p.file_name)
            .collect();
        if matched.is_empty() {
            return Ok(None);
        }
        let label = if self.matcher.is_pattern() {
            format!("use of sharedflow matching pattern '{}'", self.arg)
        } else {
            format!("use of sharedflow named '{}'", self.arg)
        };
        Ok(Some(
            Finding::revision(&ctx.name, ctx.revision, label)
                .with_matched(Matched::Policies(matched)),
        ))
    }
}
