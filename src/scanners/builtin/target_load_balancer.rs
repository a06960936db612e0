use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::model::RevisionContext;
use crate::parser::{load_endpoints, EndpointFile, EndpointKind};
use crate::scanners::matcher::NameMatcher;
use crate::scanners::{
    DataSource, Finding, Matched, PluginDescriptor, RevisionScanner, Scanner, ScannerContext,
    ScannerKind, ScannerPlugin, TargetMatch,
};

const OPTION: &str = "targetloadbalancer";

/// `--targetloadbalancer any|SERVER|/REGEX/`: target endpoints that balance
/// across servers.
pub struct TargetLoadBalancerPlugin;

impl ScannerPlugin for TargetLoadBalancerPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            option: OPTION.into(),
            description: "targets with a LoadBalancer ('any', a server name, or /regex/)".into(),
            kind: ScannerKind::Revision,
            noarg: false,
        }
    }

    fn build(&self, ctx: ScannerContext) -> Result<Scanner> {
        let arg = ctx.arg.required(OPTION)?;
        let server = match arg {
            "any" => None,
            other => Some(NameMatcher::parse(OPTION, other)?),
        };
        Ok(Scanner::Revision(Box::new(TargetLoadBalancerScanner {
            server,
            arg: arg.to_string(),
            verbose: ctx.verbose,
        })))
    }
}

struct TargetLoadBalancerScanner {
    /// `None` accepts any LoadBalancer.
    server: Option<NameMatcher>,
    arg: String,
    verbose: bool,
}

impl TargetLoadBalancerScanner {
    fn check(&self, endpoint: &EndpointFile) -> Option<String> {
        let balancer = match endpoint.load_balancers.as_slice() {
            [] => return None,
            [single] => single,
            _ => return Some("Too many HTTPTargetConnection elements".into()),
        };
        let Some(server) = &self.server else {
            return Some("uses LoadBalancer".into());
        };
        if balancer.servers.is_empty() {
            return Some("LoadBalancer missing Server elements".into());
        }
        if !balancer.servers.iter().any(|s| server.is_match(s)) {
            return None;
        }
        Some(if server.is_pattern() {
            format!("LoadBalancer references a Server matching {}", self.arg)
        } else {
            format!("LoadBalancer references Server {}", self.arg)
        })
    }
}

#[async_trait]
impl RevisionScanner for TargetLoadBalancerScanner {
    fn data_source(&self) -> DataSource {
        DataSource::Bundle
    }

    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        if self.verbose {
            info!(proxy = %ctx.name, revision = ctx.revision, scanner = OPTION, "examining revision");
        }
        let matched: Vec<TargetMatch> = load_endpoints(ctx.bundle_dir()?, EndpointKind::Target)?
            .iter()
            .filter_map(|endpoint| {
                self.check(endpoint).map(|message| TargetMatch::Detail {
                    name: endpoint.file_name.clone(),
                    message,
                })
            })
            .collect();
        if matched.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Finding::revision(&ctx.name, ctx.revision, "HTTPTargetConnection with LoadBalancer")
                .with_matched(Matched::Targets(matched)),
        ))
    }
}
