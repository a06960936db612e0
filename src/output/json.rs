use crate::error::Result;
use crate::scanners::Finding;

/// Render findings as one pretty-printed JSON array.
pub fn render(findings: &[Finding]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(findings)?;
    json.push('\n');
    Ok(json)
}
