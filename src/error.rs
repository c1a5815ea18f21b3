use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },

    #[error("no matching table: {0}")]
    NoMatchingTable(String),

    #[error("missing link #{index} in column {column}")]
    MissingLink { column: usize, index: usize },

    #[error("row has no cell at column {0}")]
    MissingCell(usize),

    #[error("cannot parse '{0}' as an integer")]
    NumericParse(String),

    #[error("no population found on {0}")]
    MissingPopulation(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Whether a failed fetch is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            EtlError::Http(e) => match e.status() {
                Some(status) if status == reqwest::StatusCode::TOO_MANY_REQUESTS => true,
                Some(status) => !status.is_client_error(),
                None => true,
            },
            EtlError::Fetch { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
