//! Data model shared by the management API client, the orchestrator and
//! the scanners.
//!
//! The API layer deserializes into these types; the orchestrator turns them
//! into `Target`s and `RevisionContext`s; scanners only ever see
//! `ProxyDefinition` (proxy kind) or `RevisionContext` (revision kind).

pub mod deployment;
pub mod endpoint;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

pub use deployment::{DeploymentRef, DeploymentsResponse};
pub use endpoint::{Connection, ConnectionType, EndpointInfo, SslInfo};

/// A revision identifier as the management API sends it. Edge returns
/// strings (`"3"`), some X endpoints return numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RevisionId {
    Number(u64),
    Text(String),
}

impl RevisionId {
    /// Coerce to a revision number.
    pub fn number(&self) -> Result<u32> {
        match self {
            Self::Number(n) => u32::try_from(*n)
                .map_err(|_| ScanError::Response(format!("revision {n} out of range"))),
            Self::Text(s) => s
                .trim()
                .parse::<u32>()
                .map_err(|_| ScanError::Response(format!("invalid revision '{s}'"))),
        }
    }
}

impl From<u32> for RevisionId {
    fn from(n: u32) -> Self {
        Self::Number(u64::from(n))
    }
}

impl From<&str> for RevisionId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One entry of the proxy catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRef {
    pub name: String,
}

/// Proxy catalog response. Edge lists bare names, X wraps them in
/// `{"proxies": [{"name": ..}]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProxyCatalog {
    Names(Vec<String>),
    Listing {
        #[serde(default)]
        proxies: Vec<ProxyRef>,
    },
}

impl ProxyCatalog {
    pub fn into_refs(self) -> Vec<ProxyRef> {
        match self {
            Self::Names(names) => names.into_iter().map(|name| ProxyRef { name }).collect(),
            Self::Listing { proxies } => proxies,
        }
    }
}

/// Proxy-level definition: name plus the revisions that exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyDefinition {
    pub name: String,
    #[serde(default)]
    pub revision: Vec<RevisionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProxyDefinition {
    /// All revision numbers listed in the definition, in API order.
    pub fn revision_numbers(&self) -> Result<Vec<u32>> {
        self.revision.iter().map(RevisionId::number).collect()
    }
}

/// Metadata of a single revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionDefinition {
    pub name: String,
    pub revision: RevisionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The unit of work handed to revision scanners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionContext {
    pub name: String,
    pub revision: u32,
    /// Unpacked bundle root; only set in bundle mode.
    pub bundle_dir: Option<PathBuf>,
}

impl RevisionContext {
    pub fn new(name: impl Into<String>, revision: u32) -> Self {
        Self {
            name: name.into(),
            revision,
            bundle_dir: None,
        }
    }

    pub fn with_bundle_dir(mut self, dir: PathBuf) -> Self {
        self.bundle_dir = Some(dir);
        self
    }

    /// The unpacked bundle, or an error for scanners that need one.
    pub fn bundle_dir(&self) -> Result<&Path> {
        self.bundle_dir.as_deref().ok_or_else(|| {
            ScanError::Internal(format!(
                "no bundle materialized for {} r{}",
                self.name, self.revision
            ))
        })
    }
}

/// One entry of the target universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    /// Revisions selected up front (deployed mode). `None` means every
    /// revision listed in the proxy definition.
    pub pinned: Option<BTreeSet<u32>>,
}

impl Target {
    pub fn all_revisions(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pinned: None,
        }
    }

    /// Group deployment records per proxy, keeping the order in which each
    /// proxy first appears.
    pub fn group_deployments(refs: Vec<DeploymentRef>) -> Vec<Target> {
        let mut targets: Vec<Target> = Vec::new();
        for DeploymentRef { name, revision } in refs {
            match targets.iter_mut().find(|t| t.name == name) {
                Some(target) => {
                    target.pinned.get_or_insert_with(BTreeSet::new).insert(revision);
                }
                None => targets.push(Target {
                    name,
                    pinned: Some(BTreeSet::from([revision])),
                }),
            }
        }
        targets
    }

    /// Resolve the revisions to examine for this target.
    pub fn revisions(&self, definition: &ProxyDefinition, latest_only: bool) -> Result<Vec<u32>> {
        let listed = match &self.pinned {
            Some(pinned) => pinned.iter().copied().collect(),
            None => definition.revision_numbers()?,
        };
        Ok(sort_revisions(listed, latest_only))
    }
}

/// Numeric ascending, deduplicated; optionally only the highest.
pub fn sort_revisions(revisions: impl IntoIterator<Item = u32>, latest_only: bool) -> Vec<u32> {
    let sorted: BTreeSet<u32> = revisions.into_iter().collect();
    if latest_only {
        sorted.last().copied().into_iter().collect()
    } else {
        sorted.into_iter().collect()
    }
}
