use thiserror::Error;

/// Errors raised while talking to the extraction provider or loading configuration
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API Error: {0}")]
    ApiError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl ProviderError {
    /// Returns true if the rendered error text contains any of the given markers.
    ///
    /// Matching is a plain, case-sensitive substring test on the `Display` output,
    /// so an `HttpError` with status 503 matches the marker `"503"`.
    pub fn mentions_any<S: AsRef<str>>(&self, markers: &[S]) -> bool {
        let text = self.to_string();
        markers.iter().any(|m| text.contains(m.as_ref()))
    }
}

/// Result type for provider and configuration operations
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_mentions_status_code() {
        let err = ProviderError::HttpError {
            status_code: 503,
            message: "API request failed: model is overloaded".to_string(),
        };
        assert!(err.mentions_any(&["503"]));
        assert!(err.mentions_any(&["overloaded"]));
        assert!(!err.mentions_any(&["high demand"]));
    }

    #[test]
    fn test_marker_match_is_case_sensitive() {
        let err = ProviderError::ApiError("Service Overloaded".to_string());
        assert!(!err.mentions_any(&["overloaded"]));
        assert!(err.mentions_any(&["Overloaded"]));
    }
}
