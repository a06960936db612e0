//! Management API access.
//!
//! Everything the scan needs from the gateway goes through
//! [`ManagementApi`]. [`ManagementClient`] talks to Apigee Edge or Apigee X
//! over HTTPS; tests substitute an in-memory implementation.

pub mod client;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{DeploymentsResponse, EndpointInfo, ProxyDefinition, ProxyRef, RevisionDefinition};

pub use client::{Credentials, Flavor, ManagementClient};

/// A revision bundle as exported by the management API.
#[derive(Debug, Clone)]
pub struct ExportedBundle {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Read-only view of an organization's proxies.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// The full proxy catalog.
    async fn list_proxies(&self) -> Result<Vec<ProxyRef>>;

    /// Proxy-level definition, including the list of revisions.
    async fn get_proxy(&self, name: &str) -> Result<ProxyDefinition>;

    /// Metadata of one revision.
    async fn get_revision(&self, name: &str, revision: u32) -> Result<RevisionDefinition>;

    /// Deployment records, optionally for a single environment.
    async fn get_deployments(&self, environment: Option<&str>) -> Result<DeploymentsResponse>;

    /// Export the zipped bundle of one revision.
    async fn export_bundle(&self, name: &str, revision: u32) -> Result<ExportedBundle>;

    async fn list_targets(&self, name: &str, revision: u32) -> Result<Vec<String>>;

    async fn get_target(&self, name: &str, revision: u32, target: &str) -> Result<EndpointInfo>;

    async fn list_proxy_endpoints(&self, name: &str, revision: u32) -> Result<Vec<String>>;

    async fn get_proxy_endpoint(
        &self,
        name: &str,
        revision: u32,
        endpoint: &str,
    ) -> Result<EndpointInfo>;
}
