use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::model::RevisionContext;
use crate::parser::{load_endpoints, load_policies, EndpointKind};
use crate::scanners::{
    DataSource, Finding, Matched, PluginDescriptor, RevisionScanner, Scanner, ScannerContext,
    ScannerKind, ScannerPlugin,
};

const OPTION: &str = "policyunattached";

/// `--policyunattached`: policies no flow step refers to.
pub struct PolicyUnattachedPlugin;

impl ScannerPlugin for PolicyUnattachedPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "policies not attached to any proxy or target endpoint flow".into(),
            kind: ScannerKind::Revision,
            noarg: true,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        Ok(Scanner::Revision(Box::new(PolicyUnattachedScanner {
            verbose: ctx.verbose,
        })))
    }
}

struct PolicyUnattachedScanner {
    verbose: bool,
}

#[async_trait]
impl RevisionScanner for PolicyUnattachedScanner {
    fn data_source(&self) -> DataSource {
        DataSource::Bundle
    }

    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let bundle = ctx.bundle_dir()?;
        let mut attached = BTreeSet::new();
        for kind in [EndpointKind::Proxy, EndpointKind::Target] {
            for endpoint in load_endpoints(bundle, kind)? {
                attached.extend(endpoint.attached_steps);
            }
        }

        let unattached: Vec<String> = load_policies(bundle)?
            .into_iter()
            .filter_map(|p| p.name)
            .filter(|name| !attached.contains(name))
            .collect();
        if unattached.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Finding::revision(&ctx.name, ctx.revision, "unattached policies")
                .with_matched(Matched::Policies(unattached)),
        ))
    }
}
