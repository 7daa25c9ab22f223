//! Client-side error taxonomy.

use crate::exit_code;
use common::credential_client::CredentialError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`BlobClient`](crate::BlobClient) operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Key not found")]
    NotFound,

    #[error("Key already exists")]
    AlreadyExists,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Server unavailable")]
    ServerUnavailable,

    #[error("Unexpected status code received: {0}")]
    UnexpectedStatus(u16),

    #[error("Invalid Blob Store URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl ClientError {
    /// Map a non-success response status to its error.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound,
            StatusCode::UNPROCESSABLE_ENTITY => ClientError::AlreadyExists,
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::INTERNAL_SERVER_ERROR => ClientError::ServerUnavailable,
            other => ClientError::UnexpectedStatus(other.as_u16()),
        }
    }

    /// Process exit code a CLI tool reports for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ClientError::Unauthorized | ClientError::Credential(_) => exit_code::AUTH_FAILED,
            _ => exit_code::REQUEST_FAILED,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
