use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{0}")]
    Usage(String),

    #[error("Invalid scanner '{option}': {message}")]
    Plugin { option: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Management API error ({status}) for {url}: {message}")]
    Api {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Unexpected management API response: {0}")]
    Response(String),

    #[error("XML error in {file}: {message}")]
    Xml { file: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("Bundle archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 1,
            _ => 2,
        }
    }
}
