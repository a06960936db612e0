use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::RevisionId;
use crate::error::{Result, ScanError};

/// One deployed revision of a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub name: String,
    pub revision: u32,
}

/// Deployment listing as returned by the management API.
///
/// Three shapes are in the wild:
/// - X: `{"deployments": [{"environment", "apiProxy", "revision"}]}`
/// - Edge, one environment: `{"aPIProxy": [{"name", "revision": [{"name"}]}]}`
/// - Edge, whole org: `{"environment": [{"name", "aPIProxy": [..]}]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentsResponse {
    deployments: Option<Vec<FlatDeployment>>,
    #[serde(rename = "aPIProxy")]
    api_proxy: Option<Vec<ProxyDeployments>>,
    environment: Option<Vec<EnvironmentDeployments>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatDeployment {
    api_proxy: String,
    revision: RevisionId,
}

#[derive(Debug, Clone, Deserialize)]
struct ProxyDeployments {
    name: String,
    #[serde(default)]
    revision: Vec<DeployedRevision>,
}

#[derive(Debug, Clone, Deserialize)]
struct DeployedRevision {
    name: RevisionId,
}

#[derive(Debug, Clone, Deserialize)]
struct EnvironmentDeployments {
    #[serde(rename = "aPIProxy", default)]
    api_proxy: Vec<ProxyDeployments>,
}

impl DeploymentsResponse {
    /// Normalize into `(name, revision)` pairs, deduplicated, in listing order.
    ///
    /// The per-environment Edge shape keeps only the last listed revision of
    /// each proxy; the org-wide shape keeps all of them.
    ///
    /// An empty object matches none of the shapes and is a
    /// [`ScanError::Response`], even though Apigee X answers `{}` for an
    /// environment with nothing deployed. `ProxyCatalog` treats `{}` as an
    /// empty listing instead.
    pub fn into_refs(self) -> Result<Vec<DeploymentRef>> {
        let mut refs = Vec::new();

        if let Some(deployments) = self.deployments {
            for d in deployments {
                refs.push(DeploymentRef {
                    name: d.api_proxy,
                    revision: d.revision.number()?,
                });
            }
        } else if let Some(proxies) = self.api_proxy {
            for proxy in proxies {
                if let Some(last) = proxy.revision.last() {
                    refs.push(DeploymentRef {
                        revision: last.name.number()?,
                        name: proxy.name,
                    });
                }
            }
        } else if let Some(environments) = self.environment {
            for env in environments {
                for proxy in env.api_proxy {
                    for rev in &proxy.revision {
                        refs.push(DeploymentRef {
                            name: proxy.name.clone(),
                            revision: rev.name.number()?,
                        });
                    }
                }
            }
        } else {
            return Err(ScanError::Response(
                "deployment listing has no deployments, aPIProxy or environment field".into(),
            ));
        }

        let mut seen = HashSet::new();
        refs.retain(|r| seen.insert(r.clone()));
        Ok(refs)
    }
}
