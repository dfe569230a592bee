use std::path::PathBuf;

use thiserror::Error;

/// Failure to acquire the raw bytes behind a URL
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("loading {url} timed out")]
    TimedOut { url: String },
}

/// Failure to read the processed-catalog manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to turn one page into a displayable surface
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{url} is not a decodable image: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("decoding {url} was interrupted: {reason}")]
    Interrupted { url: String, reason: String },
}

/// Errors raised by the vector rendering backend
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("vector renderer unavailable: {0}")]
    Bind(String),

    #[error("document could not be opened: {0}")]
    Open(String),

    #[error("page {page}: {reason}")]
    Page { page: usize, reason: String },
}

/// Session-fatal errors. The viewer shows these instead of an empty frame.
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("The document {url} could not be loaded ({source}).")]
    DocumentUnavailable {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("The document {url} has no pages.")]
    EmptyDocument { url: String },

    #[error("The document could not be displayed: {0}")]
    Backend(#[from] RenderError),
}

impl FetchError {
    pub fn url(&self) -> String {
        match self {
            Self::Status { url, .. } | Self::Network { url, .. } | Self::TimedOut { url } => {
                url.clone()
            }
            Self::Io { path, .. } => path.display().to_string(),
        }
    }
}
