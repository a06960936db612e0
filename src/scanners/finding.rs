use serde::Serialize;

/// A compliance condition reported by a scanner.
///
/// Serialized flat: `{"name", "revision"?, "scan", "policies"|"endpoints"|"targets"?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// Proxy name.
    pub name: String,
    /// Revision number; absent for proxy-level findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
    /// Human-readable description of what matched.
    pub scan: String,
    /// Artifacts within the revision that matched.
    #[serde(flatten)]
    pub matched: Option<Matched>,
}

/// Matched artifacts, keyed by artifact kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Matched {
    /// Policy file names.
    Policies(Vec<String>),
    /// Proxy endpoint names.
    Endpoints(Vec<String>),
    /// Target endpoint names, optionally with a per-target detail.
    Targets(Vec<TargetMatch>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TargetMatch {
    Name(String),
    Detail { name: String, message: String },
}

impl Finding {
    /// A finding about the proxy as a whole.
    pub fn proxy(name: impl Into<String>, scan: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: None,
            scan: scan.into(),
            matched: None,
        }
    }

    /// A finding about one revision.
    pub fn revision(name: impl Into<String>, revision: u32, scan: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: Some(revision),
            scan: scan.into(),
            matched: None,
        }
    }

    pub fn with_matched(mut self, matched: Matched) -> Self {
        self.matched = Some(matched);
        self
    }
}
