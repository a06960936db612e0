pub mod console;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scanners::Finding;

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Console,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "console" | "text" => Some(Self::Console),
            _ => None,
        }
    }
}

/// Render findings into the specified format.
pub fn render(findings: &[Finding], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::render(findings),
        OutputFormat::Console => Ok(console::render(findings)),
    }
}
