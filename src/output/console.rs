use crate::scanners::{Finding, Matched, PluginDescriptor, TargetMatch};

/// Render findings as a plain listing, one block per finding.
pub fn render(findings: &[Finding]) -> String {
    let mut output = String::new();

    if findings.is_empty() {
        output.push_str("\n  No findings.\n\n");
        return output;
    }

    output.push_str(&format!("\n  {} finding(s):\n\n", findings.len()));

    for finding in findings {
        let subject = match finding.revision {
            Some(rev) => format!("{} r{}", finding.name, rev),
            None => finding.name.clone(),
        };
        output.push_str(&format!("  {}: {}\n", subject, finding.scan));

        match &finding.matched {
            Some(Matched::Policies(items)) => push_items(&mut output, "policy", items),
            Some(Matched::Endpoints(items)) => push_items(&mut output, "endpoint", items),
            Some(Matched::Targets(targets)) => {
                for target in targets {
                    match target {
                        TargetMatch::Name(name) => {
                            output.push_str(&format!("      target {}\n", name))
                        }
                        TargetMatch::Detail { name, message } => {
                            output.push_str(&format!("      target {} ({})\n", name, message))
                        }
                    }
                }
            }
            None => {}
        }
    }
    output.push('\n');

    output
}

fn push_items(output: &mut String, label: &str, items: &[String]) {
    for item in items {
        output.push_str(&format!("      {} {}\n", label, item));
    }
}

/// Render the scanner catalog for `--list` and the no-scanner error.
pub fn render_scanner_list(descriptors: &[PluginDescriptor]) -> String {
    let mut output = String::from("Available scanners:\n");
    for d in descriptors {
        let flag = if d.noarg {
            format!("--{}", d.option)
        } else {
            format!("--{} ARG", d.option)
        };
        output.push_str(&format!("  {:<24} {} [{}]\n", flag, d.description, d.kind));
    }
    output
}
