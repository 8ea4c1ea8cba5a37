#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Data directory not found")]
    NoDataDir,

    #[error("Connection failed: {0}")]
    Connectivity(String),

    #[error("HTTP error {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("No hoster matches {0}")]
    UnsupportedHoster(String),

    #[error("Could not resolve redirect {0}")]
    RedirectUnresolved(String),

    #[error("{hoster}: no stream found at {url}")]
    Extraction { hoster: &'static str, url: String },

    #[error("Invalid episode id: {0}")]
    InvalidEpisodeId(String),
}

impl Error {
    /// Short stable tag carried in the `error` field of degraded results.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Connectivity(_) => "connectivity",
            Error::HttpStatus { .. } => "http_status",
            Error::Parse(_) | Error::Json(_) => "parse",
            Error::UnsupportedHoster(_) => "unsupported_hoster",
            Error::RedirectUnresolved(_) => "redirect_unresolved",
            Error::Extraction { .. } => "extraction",
            Error::InvalidEpisodeId(_) => "invalid_episode_id",
            Error::Io(_)
            | Error::ConfigParse(_)
            | Error::ConfigSerialize(_)
            | Error::NoConfigDir
            | Error::NoDataDir => "internal",
        }
    }

    /// `"category: message"`, the form surfaced to callers.
    pub fn tagged(&self) -> String {
        format!("{}: {}", self.category(), self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_distinct_for_fetch_failures() {
        let conn = Error::Connectivity("refused".to_string());
        let status = Error::HttpStatus {
            status: 503,
            url: "https://example.com".to_string(),
        };
        let parse = Error::Parse("bad json".to_string());
        assert_eq!(conn.category(), "connectivity");
        assert_eq!(status.category(), "http_status");
        assert_eq!(parse.category(), "parse");
    }

    #[test]
    fn test_tagged_message() {
        let err = Error::HttpStatus {
            status: 404,
            url: "https://example.com/x".to_string(),
        };
        assert_eq!(err.tagged(), "http_status: HTTP error 404 for https://example.com/x");
    }
}
