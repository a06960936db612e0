//! XML descriptor parsing for unpacked proxy bundles.
//!
//! A bundle unpacks to `apiproxy/` with `policies/`, `proxies/` and
//! `targets/` subdirectories. Parsers here turn those files into plain
//! structs; scanners never touch XML directly.

pub mod endpoint;
pub mod policy;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, ScanError};

pub use endpoint::{load_endpoints, EndpointFile, EndpointKind, LoadBalancer};
pub use policy::{load_policies, PolicyFile};

/// Root directory of the proxy descriptors inside an unpacked bundle.
pub const APIPROXY_DIR: &str = "apiproxy";

/// `.xml` files directly inside `dir`, sorted by file name. A missing
/// directory yields nothing.
pub fn xml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ScanError::Io(e.into()))?;
        let is_xml = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if entry.file_type().is_file() && is_xml {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_xml<T>(path: &Path, extract: impl FnOnce(&roxmltree::Document) -> T) -> Result<T> {
    // descriptors are not always UTF-8; undecodable bytes become U+FFFD
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let doc = roxmltree::Document::parse(&text).map_err(|e| ScanError::Xml {
        file: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(extract(&doc))
}

/// Trimmed text of the first child element named `tag`.
fn child_text(node: roxmltree::Node, tag: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
