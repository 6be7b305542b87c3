use reqwest::{Response, StatusCode};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No API key configured")]
    MissingApiKey,
    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Not authorized ({status}): {message}")]
    Unauthorized { status: StatusCode, message: String },
    #[error("Not found: {url}")]
    NotFound { url: String },
    #[error("Unexpected response ({status}): {message}")]
    Status { status: StatusCode, message: String },
    #[error("Unable to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Asset '{key}' not found in item '{item_id}'")]
    MissingAsset { item_id: String, key: String },
    #[error("Downloaded {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
}

impl Error {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }
}

/// Pass 2xx responses through, turn everything else into the matching error variant. The body of
/// a failed response is kept as the message.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let message = body_message(response.text().await);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(Error::Unauthorized { status, message })
        }
        StatusCode::NOT_FOUND => Err(Error::NotFound { url }),
        _ => Err(Error::Status { status, message }),
    }
}

fn body_message<E: std::fmt::Display>(body: std::result::Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}
