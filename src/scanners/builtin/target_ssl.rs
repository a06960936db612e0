use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::api::ManagementApi;
use crate::engine::fold_in_order;
use crate::error::Result;
use crate::model::{ConnectionType, RevisionContext};
use crate::scanners::{
    Finding, Matched, PluginDescriptor, RevisionScanner, Scanner, ScannerContext, ScannerKind,
    ScannerPlugin, TargetMatch,
};

const OPTION: &str = "targetssl";

/// `--targetssl`: HTTP targets without an enabled SSLInfo.
pub struct TargetSslPlugin;

impl ScannerPlugin for TargetSslPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "http targets with missing or disabled SSLInfo".into(),
            kind: ScannerKind::Revision,
            noarg: true,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        Ok(Scanner::Revision(Box::new(TargetSslScanner {
            api: ctx.api,
            verbose: ctx.verbose,
        })))
    }
}

struct TargetSslScanner {
    api: Arc<dyn ManagementApi>,
    verbose: bool,
}

#[async_trait]
impl RevisionScanner for TargetSslScanner {
    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let targets = self.api.list_targets(&ctx.name, ctx.revision).await?;
        let flagged = fold_in_order(targets, |target| async move {
            let info = self.api.get_target(&ctx.name, ctx.revision, &target).await?;
            let insecure = info.connection.kind() == Some(ConnectionType::Http)
                && !info.connection.ssl_info.as_ref().is_some_and(|s| s.is_enabled());
            Ok(insecure.then_some(target))
        })
        .await?;

        let flagged: Vec<TargetMatch> = flagged.into_iter().flatten().map(TargetMatch::Name).collect();
        if flagged.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Finding::revision(&ctx.name, ctx.revision, "http target with incorrect SSLInfo")
                .with_matched(Matched::Targets(flagged)),
        ))
    }
}
