use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::{ExportedBundle, ManagementApi};
use crate::error::{Result, ScanError};
use crate::model::{
    DeploymentsResponse, EndpointInfo, ProxyCatalog, ProxyDefinition, ProxyRef, RevisionDefinition,
};

const EDGE_URL: &str = "https://api.enterprise.apigee.com";
const X_URL: &str = "https://apigee.googleapis.com";

const JSON_ACCEPT: &str = "application/json";
const BUNDLE_ACCEPT: &str = "application/octet-stream";

/// Which management plane to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Flavor {
    #[default]
    Edge,
    X,
}

impl Flavor {
    pub fn default_url(&self) -> &'static str {
        match self {
            Self::Edge => EDGE_URL,
            Self::X => X_URL,
        }
    }
}

#[derive(Clone)]
pub enum Credentials {
    /// OAuth bearer token (required for X, accepted by Edge).
    Token(String),
    /// Edge basic authentication.
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// HTTPS client for `/v1/organizations/{org}`.
#[derive(Debug)]
pub struct ManagementClient {
    http: reqwest::Client,
    org_url: Url,
    credentials: Credentials,
}

impl ManagementClient {
    pub fn new(
        flavor: Flavor,
        base_url: Option<&str>,
        org: &str,
        credentials: Credentials,
    ) -> Result<Self> {
        let base = base_url.unwrap_or(flavor.default_url());
        let mut org_url = Url::parse(base)
            .map_err(|e| ScanError::Config(format!("invalid management url '{base}': {e}")))?;
        org_url
            .path_segments_mut()
            .map_err(|_| ScanError::Config(format!("management url '{base}' cannot be a base")))?
            .pop_if_empty()
            .extend(["v1", "organizations", org]);

        let http = reqwest::Client::builder()
            .user_agent(concat!("proxyscan/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            org_url,
            credentials,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.org_url.clone();
        // org_url was validated as a base in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    fn get(&self, url: Url, accept: &'static str) -> RequestBuilder {
        self.authorize(self.http.get(url)).header(ACCEPT, accept)
    }

    /// Bundle export: the archive is binary, so JSON is not requested.
    fn export_request(&self, name: &str, revision: u32) -> RequestBuilder {
        let rev = revision.to_string();
        let mut url = self.url(&["apis", name, "revisions", &rev]);
        url.query_pairs_mut().append_pair("format", "bundle");
        self.get(url, BUNDLE_ACCEPT)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.build()?;
        let url = request.url().clone();
        tracing::debug!(%url, "GET");
        let response = self.http.execute(request).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .filter(|body| !body.trim().is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        Err(ScanError::Api {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.get(url, JSON_ACCEPT)).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ManagementApi for ManagementClient {
    async fn list_proxies(&self) -> Result<Vec<ProxyRef>> {
        let catalog: ProxyCatalog = self.get_json(self.url(&["apis"])).await?;
        Ok(catalog.into_refs())
    }

    async fn get_proxy(&self, name: &str) -> Result<ProxyDefinition> {
        self.get_json(self.url(&["apis", name])).await
    }

    async fn get_revision(&self, name: &str, revision: u32) -> Result<RevisionDefinition> {
        let rev = revision.to_string();
        self.get_json(self.url(&["apis", name, "revisions", &rev])).await
    }

    async fn get_deployments(&self, environment: Option<&str>) -> Result<DeploymentsResponse> {
        let url = match environment {
            Some(env) => self.url(&["environments", env, "deployments"]),
            None => self.url(&["deployments"]),
        };
        self.get_json(url).await
    }

    async fn export_bundle(&self, name: &str, revision: u32) -> Result<ExportedBundle> {
        let bytes = self
            .send(self.export_request(name, revision))
            .await?
            .bytes()
            .await?;
        Ok(ExportedBundle {
            filename: format!("{name}-r{revision}.zip"),
            bytes: bytes.to_vec(),
        })
    }

    async fn list_targets(&self, name: &str, revision: u32) -> Result<Vec<String>> {
        let rev = revision.to_string();
        self.get_json(self.url(&["apis", name, "revisions", &rev, "targets"]))
            .await
    }

    async fn get_target(&self, name: &str, revision: u32, target: &str) -> Result<EndpointInfo> {
        let rev = revision.to_string();
        self.get_json(self.url(&["apis", name, "revisions", &rev, "targets", target]))
            .await
    }

    async fn list_proxy_endpoints(&self, name: &str, revision: u32) -> Result<Vec<String>> {
        let rev = revision.to_string();
        self.get_json(self.url(&["apis", name, "revisions", &rev, "proxies"]))
            .await
    }

    async fn get_proxy_endpoint(
        &self,
        name: &str,
        revision: u32,
        endpoint: &str,
    ) -> Result<EndpointInfo> {
        let rev = revision.to_string();
        self.get_json(self.url(&["apis", name, "revisions", &rev, "proxies", endpoint]))
            .await
    }
}
