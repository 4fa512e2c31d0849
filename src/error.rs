use thiserror::Error;

/// Errors raised while resolving, fetching or parsing a play.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid play index {index} (catalog has {len} plays)")]
    InvalidIndex { index: usize, len: usize },
}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        AnalysisError::SourceUnavailable(e.to_string())
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::SourceUnavailable(e.to_string())
    }
}

impl From<quick_xml::Error> for AnalysisError {
    fn from(e: quick_xml::Error) -> Self {
        AnalysisError::Parse(e.to_string())
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
