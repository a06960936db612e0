use regex::Regex;

use crate::error::{Result, ScanError};

/// Compile a scanner's regex argument, reporting the option on failure.
pub fn compile(option: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| ScanError::Config(format!("--{option}: invalid pattern '{pattern}': {e}")))
}

/// Name argument shared by several scanners: `/.../` is a regex, anything
/// else is compared exactly.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    Exact(String),
    Pattern(Regex),
}

impl NameMatcher {
    pub fn parse(option: &str, arg: &str) -> Result<Self> {
        if arg.len() >= 2 && arg.starts_with('/') && arg.ends_with('/') {
            Ok(Self::Pattern(compile(option, &arg[1..arg.len() - 1])?))
        } else {
            Ok(Self::Exact(arg.to_string()))
        }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(name) => name == candidate,
            Self::Pattern(re) => re.is_match(candidate),
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}
