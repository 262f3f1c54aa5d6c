//! Error types shared by the Sheets client and the entry store

use thiserror::Error;

/// Failure of a single round trip against the Sheets or OAuth endpoints
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No usable bearer token (consent denied, callback timed out, refresh failed)
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The server answered with a non-success status
    #[error("request rejected with HTTP {0}")]
    Status(u16),
    /// The request never produced a response
    #[error("network error: {0}")]
    Network(String),
    /// The response body was not the JSON we expected
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(401))
    }
}

/// Errors surfaced by [`EntryStore`](crate::store::EntryStore) operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The TempID or the named tab does not exist
    #[error("{0} not found")]
    NotFound(String),
    #[error("failed to read sheet: {0}")]
    Read(#[source] ApiError),
    #[error("failed to write sheet: {0}")]
    Write(#[source] ApiError),
    /// Required text was missing
    #[error("invalid input: {0}")]
    Validation(String),
}

impl StoreError {
    /// Classify a failed read request
    pub fn read(err: ApiError) -> Self {
        match err {
            ApiError::Auth(msg) => Self::Auth(msg),
            other => Self::Read(other),
        }
    }

    /// Classify a failed write request
    pub fn write(err: ApiError) -> Self {
        match err {
            ApiError::Auth(msg) => Self::Auth(msg),
            other => Self::Write(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
