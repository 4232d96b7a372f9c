//! # Server Error Types
//!
//! Startup, codec, upstream and request errors. Only startup errors ever
//! reach `main`; everything else is turned into a response.

use std::time::Duration;

use playfield_shared::ErrorBody;
use thiserror::Error;

/// Errors that stop the server from starting or serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file failed to parse.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An HTTP message could not be read or written.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// A JSON body could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// HTTP/1.1 codec errors.
#[derive(Error, Debug)]
pub enum HttpError {
    /// The connection closed mid-message.
    #[error("connection closed mid-message")]
    UnexpectedEof,

    /// Request line and headers exceed the limit.
    #[error("message head exceeds {0} bytes")]
    HeadTooLarge(usize),

    /// Declared body exceeds the limit.
    #[error("message body of {size} bytes exceeds {limit} bytes")]
    BodyTooLarge {
        /// Declared or received size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The message does not follow HTTP/1.1 syntax.
    #[error("malformed message: {0}")]
    Malformed(&'static str),

    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for codec operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Lyrics upstream failures. All of them end in the fallback response.
#[derive(Error, Debug)]
pub enum LyricsError {
    /// Could not reach or talk to the upstream.
    #[error("upstream transport failed: {0}")]
    Transport(#[from] HttpError),

    /// The upstream did not answer in time.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The upstream answered with an error status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// The upstream body was not the expected JSON.
    #[error("upstream body could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Request failures, each mapped to a status code and JSON body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request body is missing fields or fails validation.
    #[error("{0}")]
    BadRequest(&'static str),

    /// The request could not be parsed as HTTP.
    #[error("Malformed request")]
    Malformed,

    /// The body is larger than the configured limit.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// No route or record matches.
    #[error("Not found")]
    NotFound,

    /// The route exists but not for this method.
    #[error("Method not allowed")]
    MethodNotAllowed {
        /// Methods the route accepts.
        allow: &'static str,
    },

    /// The handler failed unexpectedly.
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::Malformed => 400,
            Self::NotFound => 404,
            Self::MethodNotAllowed { .. } => 405,
            Self::PayloadTooLarge => 413,
            Self::Internal => 500,
        }
    }

    /// JSON body.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

impl From<&HttpError> for ApiError {
    fn from(err: &HttpError) -> Self {
        match err {
            HttpError::BodyTooLarge { .. } => Self::PayloadTooLarge,
            _ => Self::Malformed,
        }
    }
}
