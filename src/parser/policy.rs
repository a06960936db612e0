use std::path::Path;

use super::{child_text, file_label, parse_xml, xml_files, APIPROXY_DIR};
use crate::error::Result;

/// Facts about one policy descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyFile {
    /// File name within `apiproxy/policies`.
    pub file_name: String,
    /// Root element name, i.e. the policy type (`AssignMessage`, `RaiseFault`, ...).
    pub kind: String,
    /// The `name` attribute of the root element.
    pub name: Option<String>,
    /// `SharedFlowBundle` of a `FlowCallout` policy.
    pub shared_flow_bundle: Option<String>,
}

impl PolicyFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file_name = file_label(path);
        parse_xml(path, |doc| {
            let root = doc.root_element();
            let kind = root.tag_name().name().to_string();
            let shared_flow_bundle = if kind == "FlowCallout" {
                child_text(root, "SharedFlowBundle")
            } else {
                None
            };
            PolicyFile {
                file_name,
                name: root.attribute("name").map(str::to_string),
                kind,
                shared_flow_bundle,
            }
        })
    }
}

/// Every policy in an unpacked bundle, sorted by file name.
pub fn load_policies(bundle_dir: &Path) -> Result<Vec<PolicyFile>> {
    let dir = bundle_dir.join(APIPROXY_DIR).join("policies");
    xml_files(&dir)?
        .iter()
        .map(|path| PolicyFile::load(path))
        .collect()
}
