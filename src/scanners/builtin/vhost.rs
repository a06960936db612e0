use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::api::ManagementApi;
use crate::engine::fold_in_order;
use crate::error::Result;
use crate::model::RevisionContext;
use crate::scanners::{
    Finding, Matched, PluginDescriptor, RevisionScanner, Scanner, ScannerContext, ScannerKind,
    ScannerPlugin,
};

const OPTION: &str = "vhost";

/// `--vhost NAME`: proxy endpoints listening on a virtual host.
pub struct VhostPlugin;

impl ScannerPlugin for VhostPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "proxy endpoints that use a named virtual host".into(),
            kind: ScannerKind::Revision,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        let vhost = ctx.arg.required(OPTION)?.to_string();
        Ok(Scanner::Revision(Box::new(VhostScanner {
            api: ctx.api,
            vhost,
            verbose: ctx.verbose,
        })))
    }
}

struct VhostScanner {
    api: Arc<dyn ManagementApi>,
    vhost: String,
    verbose: bool,
}

#[async_trait]
impl RevisionScanner for VhostScanner {
    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let endpoints = self.api.list_proxy_endpoints(&ctx.name, ctx.revision).await?;
        let matched = fold_in_order(endpoints, |endpoint| async move {
            let info = self
                .api
                .get_proxy_endpoint(&ctx.name, ctx.revision, &endpoint)
                .await?;
            Ok(info
                .connection
                .virtual_host
                .iter()
                .any(|v| *v == self.vhost)
                .then_some(endpoint))
        })
        .await?;

        let matched: Vec<String> = matched.into_iter().flatten().collect();
        if matched.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Finding::revision(&ctx.name, ctx.revision, format!("vhost match '{}'", self.vhost))
                .with_matched(Matched::Endpoints(matched)),
        ))
    }
}
