use std::collections::BTreeSet;
use std::path::Path;

use roxmltree::Node;

use super::{child_text, file_label, parse_xml, xml_files, APIPROXY_DIR};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Proxy,
    Target,
}

impl EndpointKind {
    fn dir(&self) -> &'static str {
        match self {
            Self::Proxy => "proxies",
            Self::Target => "targets",
        }
    }

    fn root_tag(&self) -> &'static str {
        match self {
            Self::Proxy => "ProxyEndpoint",
            Self::Target => "TargetEndpoint",
        }
    }
}

/// Facts about one proxy or target endpoint descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointFile {
    pub file_name: String,
    /// Policy names referenced by a `Step` in any flow or fault rule.
    pub attached_steps: BTreeSet<String>,
    /// `HTTPTargetConnection/LoadBalancer` elements (target endpoints only).
    pub load_balancers: Vec<LoadBalancer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancer {
    /// `name` attributes of the `Server` children.
    pub servers: Vec<String>,
}

impl EndpointFile {
    pub fn load(path: &Path, kind: EndpointKind) -> Result<Self> {
        let file_name = file_label(path);
        parse_xml(path, |doc| {
            let root = doc.root_element();
            if !root.has_tag_name(kind.root_tag()) {
                return EndpointFile {
                    file_name,
                    ..Default::default()
                };
            }

            let mut attached_steps = BTreeSet::new();
            for flow in flows(root) {
                for phase in flow
                    .children()
                    .filter(|n| n.has_tag_name("Request") || n.has_tag_name("Response"))
                {
                    attached_steps.extend(step_names(phase));
                }
            }
            for rule in fault_rules(root) {
                attached_steps.extend(step_names(rule));
            }

            let load_balancers = match kind {
                EndpointKind::Target => elements(root, "HTTPTargetConnection")
                    .flat_map(|conn| elements(conn, "LoadBalancer"))
                    .map(|lb| LoadBalancer {
                        servers: elements(lb, "Server")
                            .map(|s| s.attribute("name").unwrap_or_default().to_string())
                            .collect(),
                    })
                    .collect(),
                EndpointKind::Proxy => Vec::new(),
            };

            EndpointFile {
                file_name,
                attached_steps,
                load_balancers,
            }
        })
    }
}

/// Every endpoint of the given kind in an unpacked bundle, sorted by file name.
pub fn load_endpoints(bundle_dir: &Path, kind: EndpointKind) -> Result<Vec<EndpointFile>> {
    let dir = bundle_dir.join(APIPROXY_DIR).join(kind.dir());
    xml_files(&dir)?
        .iter()
        .map(|path| EndpointFile::load(path, kind))
        .collect()
}

fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.has_tag_name(tag))
}

fn flows<'a, 'input: 'a>(root: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    let mut out: Vec<Node> = ["PreFlow", "PostFlow", "PostClientFlow"]
        .into_iter()
        .flat_map(|tag| elements(root, tag))
        .collect();
    out.extend(elements(root, "Flows").flat_map(|flows| elements(flows, "Flow")));
    out
}

fn fault_rules<'a, 'input: 'a>(root: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    let mut out: Vec<Node> = elements(root, "DefaultFaultRule").collect();
    out.extend(elements(root, "FaultRules").flat_map(|rules| elements(rules, "FaultRule")));
    out
}

fn step_names(parent: Node) -> Vec<String> {
    elements(parent, "Step")
        .filter_map(|step| child_text(step, "Name"))
        .collect()
}
