pub mod crawler;
pub mod detail;
pub mod fetch;
pub mod listing;
pub mod pagination;
pub mod types;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request error: '{0}'")]
    Request(#[from] reqwest::Error),
    #[error("Failed to scrape data from: '{url}', status: {status}")]
    RequestNotOk {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("Invalid url: '{0}'")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Content not found in html: '{0}'")]
    ContentNotFound(&'static str),
    #[error("Unexpected content for {what}: '{text}'")]
    UnexpectedContent { what: &'static str, text: String },
    #[error("Malformed value for {field}: '{value}'")]
    DataFormat { field: &'static str, value: String },
}

/// Coarse classification of [`Error`]; every kind aborts a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection failure, timeout or non-success status.
    Fetch,
    /// An element the page layout requires is missing or unreadable.
    Parse,
    /// An element is present but its value doesn't parse.
    DataFormat,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Request(_) | Error::RequestNotOk { .. } | Error::InvalidUrl(_) => {
                ErrorKind::Fetch
            }
            Error::ContentNotFound(_) | Error::UnexpectedContent { .. } => ErrorKind::Parse,
            Error::DataFormat { .. } => ErrorKind::DataFormat,
        }
    }
}
