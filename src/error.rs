use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The document could not be read by any method in the fallback ladder.
    /// Maps to a 422-class response at the route layer, distinct from
    /// "we read it and found no financials".
    #[error("Could not extract any content from document: {0}")]
    Unprocessable(String),

    #[error("Spreadsheet contains no usable content: {0}")]
    EmptyWorkbook(String),

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("External capability '{capability}' is not configured")]
    NotConfigured { capability: &'static str },

    #[error("Datastore error: {0}")]
    Store(String),

    #[error("Deal not found: {0}")]
    DealNotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
