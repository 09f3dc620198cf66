//! Error types for API operations

use thiserror::Error;

/// Per-attempt transport failures. These never propagate past the racing
/// client: a failed attempt just loses the race.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http transport error")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status {status}: {body}")]
    Status { status: u16, body: String },
}
