use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::api::ManagementApi;
use crate::engine::fold_in_order;
use crate::error::{Result, ScanError};
use crate::model::{ConnectionType, RevisionContext};
use crate::scanners::{
    Finding, Matched, PluginDescriptor, RevisionScanner, Scanner, ScannerContext, ScannerKind,
    ScannerPlugin, TargetMatch,
};

const OPTION: &str = "targettype";

/// `--targettype hosted|http|local|node`: targets of a given connection kind.
pub struct TargetTypePlugin;

impl ScannerPlugin for TargetTypePlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "targets of a connection type (hosted, http, local, node)".into(),
            kind: ScannerKind::Revision,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        let raw = ctx.arg.required(OPTION)?;
        let wanted = ConnectionType::from_str_lenient(raw).ok_or_else(|| {
            ScanError::Config(format!(
                "--{OPTION}: unknown target type '{raw}' (expected hosted, http, local or node)"
            ))
        })?;
        Ok(Scanner::Revision(Box::new(TargetTypeScanner {
            api: ctx.api,
            wanted,
            verbose: ctx.verbose,
        })))
    }
}

struct TargetTypeScanner {
    api: Arc<dyn ManagementApi>,
    wanted: ConnectionType,
    verbose: bool,
}

fn element_name(kind: ConnectionType) -> &'static str {
    match kind {
        ConnectionType::Hosted => "HostedTarget",
        ConnectionType::Http => "HttpTargetConnection",
        ConnectionType::Local => "LocalTargetConnection",
        ConnectionType::Node => "ScriptConnection",
    }
}

#[async_trait]
impl RevisionScanner for TargetTypeScanner {
    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let targets = self.api.list_targets(&ctx.name, ctx.revision).await?;
        let matched = fold_in_order(targets, |target| async move {
            let info = self.api.get_target(&ctx.name, ctx.revision, &target).await?;
            Ok((info.connection.kind() == Some(self.wanted)).then_some(target))
        })
        .await?;

        let matched: Vec<TargetMatch> = matched.into_iter().flatten().map(TargetMatch::Name).collect();
        if matched.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Finding::revision(
                &ctx.name,
                ctx.revision,
                format!("target type {}", element_name(self.wanted)),
            )
            .with_matched(Matched::Targets(matched)),
        ))
    }
}
