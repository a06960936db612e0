use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::model::RevisionContext;
use crate::parser::load_policies;
use crate::scanners::{
    DataSource, Finding, Matched, PluginDescriptor, RevisionScanner, Scanner, ScannerContext,
    ScannerKind, ScannerPlugin,
};

const OPTION: &str = "policytype";

/// Argument value selecting revisions that carry no policy at all.
const NO_POLICIES: &str = "none";

/// `--policytype TYPE`: policies of an element type, e.g. `JavaCallout`.
pub struct PolicyTypePlugin;

impl ScannerPlugin for PolicyTypePlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "policies of a type (root element), or 'none' for revisions without policies"
                .into(),
            kind: ScannerKind::Revision,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        Ok(Scanner::Revision(Box::new(PolicyTypeScanner {
            policy_type: ctx.arg.required(OPTION)?.to_string(),
            verbose: ctx.verbose,
        })))
    }
}

struct PolicyTypeScanner {
    policy_type: String,
    verbose: bool,
}

#[async_trait]
impl RevisionScanner for PolicyTypeScanner {
    fn data_source(&self) -> DataSource {
        DataSource::Bundle
    }

    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let policies = load_policies(ctx.bundle_dir()?)?;
        if policies.is_empty() && self.policy_type == NO_POLICIES {
            return Ok(Some(
                Finding::revision(&ctx.name, ctx.revision, "no policies")
                    .with_matched(Matched::Policies(Vec::new())),
            ));
        }

        let matched: Vec<String> = policies
            .into_iter()
            .filter(|p| p.kind == self.policy_type)
            .map(|p| p.file_name)
            .collect();
        if matched.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Finding::revision(
                &ctx.name,
                ctx.revision,
                format!("policy type name '{}'", self.policy_type),
            )
            .with_matched(Matched::Policies(matched)),
        ))
    }
}
